use crmdb_core::migration::{Migration, Operation};
use crmdb_core::schema::{ColumnDef, IndexDef, ReferentialAction};

use super::entity;

pub(super) fn migration() -> Migration {
    let departments = entity(
        "Departments",
        vec![
            ColumnDef::string("Name", 100),
            ColumnDef::string("Code", 20),
            ColumnDef::string("Description", 500).nullable(),
            ColumnDef::integer("ParentDepartmentId").nullable(),
        ],
    )
    .foreign_key("ParentDepartmentId", "Departments", ReferentialAction::SetNull);

    let users = entity(
        "Users",
        vec![
            ColumnDef::string("Username", 50),
            ColumnDef::string("Email", 256),
            ColumnDef::string("FirstName", 100),
            ColumnDef::string("LastName", 100),
            ColumnDef::boolean("IsActive").default_value(true),
        ],
    );

    let profiles = entity(
        "UserProfiles",
        vec![
            ColumnDef::integer("UserId"),
            ColumnDef::string("JobTitle", 100).nullable(),
            ColumnDef::string("PhoneNumber", 30).nullable(),
            ColumnDef::string("AvatarUrl", 500).nullable(),
            ColumnDef::string("TimeZone", 64).nullable(),
            ColumnDef::integer("DepartmentId").nullable(),
        ],
    )
    .foreign_key("UserId", "Users", ReferentialAction::Cascade)
    .foreign_key("DepartmentId", "Departments", ReferentialAction::SetNull);

    Migration::reversible(
        "20240110093000",
        "InitialIdentity",
        vec![
            Operation::CreateTable(departments),
            Operation::CreateTable(users),
            Operation::CreateTable(profiles),
            Operation::CreateIndex(IndexDef::new("Departments", &["Code"]).unique()),
            Operation::CreateIndex(IndexDef::new("Departments", &["ParentDepartmentId"])),
            Operation::CreateIndex(IndexDef::new("Users", &["Email"]).unique()),
            Operation::CreateIndex(IndexDef::new("Users", &["Username"]).unique()),
            Operation::CreateIndex(IndexDef::new("UserProfiles", &["UserId"]).unique()),
            Operation::CreateIndex(IndexDef::new("UserProfiles", &["DepartmentId"])),
        ],
    )
}
