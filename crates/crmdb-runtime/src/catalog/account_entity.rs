use crmdb_core::migration::{Migration, Operation};
use crmdb_core::schema::{ColumnDef, ForeignKeyDef, IndexDef, ReferentialAction};

use super::entity;

pub(super) fn migration() -> Migration {
    let accounts = entity(
        "Accounts",
        vec![
            ColumnDef::string("AccountNumber", 30),
            ColumnDef::integer("CustomerId"),
            ColumnDef::integer("ProductId").nullable(),
            ColumnDef::integer("BillingCycleId").nullable(),
            ColumnDef::integer("CurrencyId").nullable(),
            ColumnDef::decimal("Balance", 18, 2).default_value(0),
            ColumnDef::timestamp("OpenedAt").default_sql("CURRENT_TIMESTAMP"),
            ColumnDef::timestamp("ClosedAt").nullable(),
        ],
    )
    .foreign_key("CustomerId", "Customers", ReferentialAction::Cascade)
    .foreign_key("ProductId", "Products", ReferentialAction::SetNull)
    .foreign_key("BillingCycleId", "LookupItems", ReferentialAction::SetNull)
    .foreign_key("CurrencyId", "LookupItems", ReferentialAction::SetNull);

    Migration::reversible(
        "20240216160000",
        "AddAccountEntity",
        vec![
            Operation::CreateTable(accounts),
            Operation::CreateIndex(IndexDef::new("Accounts", &["AccountNumber"]).unique()),
            Operation::CreateIndex(IndexDef::new("Accounts", &["CustomerId"])),
            Operation::CreateIndex(IndexDef::new("Accounts", &["ProductId"])),
            Operation::CreateIndex(IndexDef::new("Accounts", &["BillingCycleId"])),
            Operation::CreateIndex(IndexDef::new("Accounts", &["CurrencyId"])),
            Operation::AddColumn {
                table: "Opportunities".into(),
                column: ColumnDef::integer("AccountId").nullable(),
            },
            Operation::CreateIndex(IndexDef::new("Opportunities", &["AccountId"])),
            Operation::AddForeignKey {
                table: "Opportunities".into(),
                foreign_key: ForeignKeyDef::new(
                    "Opportunities",
                    "AccountId",
                    "Accounts",
                    ReferentialAction::SetNull,
                ),
            },
        ],
    )
}
