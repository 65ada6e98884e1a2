use crmdb_core::migration::{Migration, Operation};
use crmdb_core::schema::ColumnDef;

fn add_user_column(column: ColumnDef) -> Operation {
    Operation::AddColumn {
        table: "Users".into(),
        column,
    }
}

pub(super) fn migration() -> Migration {
    Migration::reversible(
        "20240301083000",
        "AddUserAuthColumns",
        vec![
            add_user_column(ColumnDef::string("PasswordHash", 256).nullable()),
            add_user_column(ColumnDef::timestamp("LastLoginAt").nullable()),
            add_user_column(ColumnDef::integer("FailedLoginCount").default_value(0)),
            add_user_column(ColumnDef::timestamp("LockoutEnd").nullable()),
            Operation::RenameColumn {
                table: "Users".into(),
                from: "Username".into(),
                to: "UserName".into(),
            },
        ],
    )
}
