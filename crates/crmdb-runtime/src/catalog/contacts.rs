use crmdb_core::migration::{Migration, Operation};
use crmdb_core::schema::{ColumnDef, IndexDef, ReferentialAction};

use super::entity;

pub(super) fn migration() -> Migration {
    let contacts = entity(
        "Contacts",
        vec![
            ColumnDef::integer("CustomerId"),
            ColumnDef::string("FirstName", 100),
            ColumnDef::string("LastName", 100),
            ColumnDef::string("JobTitle", 100).nullable(),
            ColumnDef::integer("PreferredContactMethodId").nullable(),
        ],
    )
    .foreign_key("CustomerId", "Customers", ReferentialAction::Cascade)
    .foreign_key(
        "PreferredContactMethodId",
        "LookupItems",
        ReferentialAction::SetNull,
    );

    Migration::reversible(
        "20240209113000",
        "AddContacts",
        vec![
            Operation::CreateTable(contacts),
            Operation::CreateIndex(IndexDef::new("Contacts", &["CustomerId"])),
            Operation::CreateIndex(IndexDef::new("Contacts", &["PreferredContactMethodId"])),
        ],
    )
}
