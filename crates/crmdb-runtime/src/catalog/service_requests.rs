use crmdb_core::migration::{Migration, Operation};
use crmdb_core::schema::{ColumnDef, IndexDef, ReferentialAction};

use super::entity;

pub(super) fn migration() -> Migration {
    let requests = entity(
        "ServiceRequests",
        vec![
            ColumnDef::string("Title", 200),
            ColumnDef::text("Description").nullable(),
            ColumnDef::integer("AccountId"),
            ColumnDef::integer("ContactId").nullable(),
            ColumnDef::integer("AssignedToUserId").nullable(),
            ColumnDef::integer("StatusId"),
            ColumnDef::integer("PriorityId"),
            ColumnDef::timestamp("DueAt").nullable(),
            ColumnDef::timestamp("ResolvedAt").nullable(),
        ],
    )
    .foreign_key("AccountId", "Accounts", ReferentialAction::Cascade)
    .foreign_key("ContactId", "Contacts", ReferentialAction::SetNull)
    .foreign_key("AssignedToUserId", "Users", ReferentialAction::SetNull)
    .foreign_key("StatusId", "LookupItems", ReferentialAction::Restrict)
    .foreign_key("PriorityId", "LookupItems", ReferentialAction::Restrict);

    Migration::reversible(
        "20240308150000",
        "AddServiceRequests",
        vec![
            Operation::CreateTable(requests),
            Operation::CreateIndex(IndexDef::new("ServiceRequests", &["AccountId"])),
            Operation::CreateIndex(IndexDef::new("ServiceRequests", &["ContactId"])),
            Operation::CreateIndex(IndexDef::new("ServiceRequests", &["AssignedToUserId"])),
            Operation::CreateIndex(IndexDef::new("ServiceRequests", &["StatusId", "PriorityId"])),
        ],
    )
}
