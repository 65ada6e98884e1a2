use crmdb_core::migration::{Migration, Operation};
use crmdb_core::schema::{ColumnDef, IndexDef};

use super::entity;

/// Addresses, contact details and social accounts attach to any owner
/// entity through `ContactInfoLinks` (`OwnerType`/`OwnerId` on one side,
/// `InfoKind`/`InfoId` on the other), so the link table has no foreign keys.
pub(super) fn migration() -> Migration {
    let addresses = entity(
        "Addresses",
        vec![
            ColumnDef::string("Line1", 200),
            ColumnDef::string("Line2", 200).nullable(),
            ColumnDef::string("City", 100),
            ColumnDef::string("Region", 100).nullable(),
            ColumnDef::string("PostalCode", 20).nullable(),
            ColumnDef::string("Country", 100),
        ],
    );

    let details = entity(
        "ContactDetails",
        vec![
            ColumnDef::string("Kind", 20),
            ColumnDef::string("Value", 256),
            ColumnDef::boolean("IsPrimary").default_value(false),
        ],
    );

    let socials = entity(
        "SocialAccounts",
        vec![
            ColumnDef::string("Platform", 50),
            ColumnDef::string("Handle", 100),
            ColumnDef::string("ProfileUrl", 500).nullable(),
        ],
    );

    let links = entity(
        "ContactInfoLinks",
        vec![
            ColumnDef::string("OwnerType", 50),
            ColumnDef::integer("OwnerId"),
            ColumnDef::string("InfoKind", 20),
            ColumnDef::integer("InfoId"),
        ],
    );

    Migration::reversible(
        "20240202091000",
        "AddContactInfo",
        vec![
            Operation::CreateTable(addresses),
            Operation::CreateTable(details),
            Operation::CreateTable(socials),
            Operation::CreateTable(links),
            Operation::CreateIndex(IndexDef::new("ContactInfoLinks", &["OwnerType", "OwnerId"])),
            Operation::CreateIndex(
                IndexDef::new(
                    "ContactInfoLinks",
                    &["OwnerType", "OwnerId", "InfoKind", "InfoId"],
                )
                .unique(),
            ),
        ],
    )
}
