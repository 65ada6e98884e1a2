use crmdb_core::migration::{Migration, Operation};
use crmdb_core::schema::{ColumnDef, IndexDef, ReferentialAction};

use super::entity;

pub(super) fn migration() -> Migration {
    let categories = entity(
        "LookupCategories",
        vec![
            ColumnDef::string("Name", 100),
            ColumnDef::string("Code", 50),
            ColumnDef::string("Description", 500).nullable(),
        ],
    );

    let items = entity(
        "LookupItems",
        vec![
            ColumnDef::integer("CategoryId"),
            ColumnDef::string("Code", 50),
            ColumnDef::string("Value", 200),
            ColumnDef::integer("SortOrder").default_value(0),
            ColumnDef::boolean("IsActive").default_value(true),
        ],
    )
    .foreign_key("CategoryId", "LookupCategories", ReferentialAction::Cascade);

    Migration::reversible(
        "20240118101500",
        "AddLookupTables",
        vec![
            Operation::CreateTable(categories),
            Operation::CreateTable(items),
            Operation::CreateIndex(IndexDef::new("LookupCategories", &["Code"]).unique()),
            Operation::CreateIndex(IndexDef::new("LookupItems", &["CategoryId", "Code"]).unique()),
        ],
    )
}
