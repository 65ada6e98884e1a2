use crmdb_core::migration::{Migration, Operation};
use crmdb_core::schema::{ColumnDef, IndexDef, ReferentialAction};

use super::entity;

pub(super) fn migration() -> Migration {
    let customers = entity(
        "Customers",
        vec![
            ColumnDef::string("Name", 200),
            ColumnDef::string("Industry", 100).nullable(),
            ColumnDef::string("Website", 300).nullable(),
            ColumnDef::text("Notes").nullable(),
        ],
    );

    let products = entity(
        "Products",
        vec![
            ColumnDef::string("Name", 200),
            ColumnDef::string("Sku", 50),
            ColumnDef::text("Description").nullable(),
            ColumnDef::decimal("Price", 18, 2).default_value(0),
            ColumnDef::integer("CurrencyId").nullable(),
            ColumnDef::boolean("IsActive").default_value(true),
        ],
    )
    .foreign_key("CurrencyId", "LookupItems", ReferentialAction::SetNull);

    let opportunities = entity(
        "Opportunities",
        vec![
            ColumnDef::string("Title", 200),
            ColumnDef::integer("CustomerId"),
            ColumnDef::decimal("EstimatedValue", 18, 2).nullable(),
            ColumnDef::integer("Probability").default_value(0),
            ColumnDef::timestamp("ExpectedCloseDate").nullable(),
            ColumnDef::string("Stage", 50).default_value("Prospecting"),
        ],
    )
    .foreign_key("CustomerId", "Customers", ReferentialAction::Cascade);

    Migration::reversible(
        "20240125140000",
        "AddCustomersAndProducts",
        vec![
            Operation::CreateTable(customers),
            Operation::CreateTable(products),
            Operation::CreateTable(opportunities),
            Operation::CreateIndex(IndexDef::new("Customers", &["Name"])),
            Operation::CreateIndex(IndexDef::new("Products", &["Sku"]).unique()),
            Operation::CreateIndex(IndexDef::new("Products", &["CurrencyId"])),
            Operation::CreateIndex(IndexDef::new("Opportunities", &["CustomerId"])),
        ],
    )
}
