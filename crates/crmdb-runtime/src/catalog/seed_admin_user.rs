use chrono::{TimeZone, Utc};
use crmdb_core::migration::{DataRows, Migration, Operation};
use crmdb_core::schema::SqlValue;

pub const ADMIN_EMAIL: &str = "admin@crm.local";

/// The administrator account, keyed by Email. Its Id is generated by the
/// identity column.
pub(super) fn migration() -> Migration {
    let created_at = Utc
        .with_ymd_and_hms(2024, 3, 15, 9, 0, 0)
        .single()
        .map(SqlValue::Timestamp)
        .unwrap_or(SqlValue::Raw("CURRENT_TIMESTAMP".into()));

    let admin = DataRows::new(
        "Users",
        &["Email"],
        &[
            "UserName",
            "Email",
            "FirstName",
            "LastName",
            "IsActive",
            "CreatedAt",
        ],
    )
    .row(vec![
        SqlValue::from("admin"),
        SqlValue::from(ADMIN_EMAIL),
        SqlValue::from("System"),
        SqlValue::from("Administrator"),
        SqlValue::from(true),
        created_at,
    ]);

    Migration::reversible(
        "20240315090000",
        "SeedAdminUser",
        vec![Operation::InsertData(admin)],
    )
}
