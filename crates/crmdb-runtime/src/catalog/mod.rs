//! Built-in CRM schema history.
//!
//! Every entity table carries an identity `Id`, an `IsDeleted` soft-delete
//! flag and `CreatedAt`/`UpdatedAt` audit timestamps. Steps are listed in
//! version order and each one is reversible.

mod account_entity;
mod contact_info;
mod contacts;
mod customers_and_products;
mod initial_identity;
mod lookup_tables;
mod seed_admin_user;
mod service_requests;
mod user_auth_columns;

pub use seed_admin_user::ADMIN_EMAIL;

use crmdb_core::error::Result;
use crmdb_core::migration::{Migration, MigrationSet};
use crmdb_core::schema::{ColumnDef, TableDef};

/// All built-in migrations, oldest first.
pub fn crm_migration_list() -> Vec<Migration> {
    vec![
        initial_identity::migration(),
        lookup_tables::migration(),
        customers_and_products::migration(),
        contact_info::migration(),
        contacts::migration(),
        account_entity::migration(),
        user_auth_columns::migration(),
        service_requests::migration(),
        seed_admin_user::migration(),
    ]
}

/// The built-in migrations as a validated set.
pub fn crm_migrations() -> Result<MigrationSet> {
    MigrationSet::new(crm_migration_list())
}

/// Entity table: `Id`, the given columns, then the soft-delete and audit columns.
fn entity(name: &str, columns: Vec<ColumnDef>) -> TableDef {
    TableDef::new(name)
        .column(ColumnDef::id("Id"))
        .columns(columns)
        .columns([
            ColumnDef::boolean("IsDeleted").default_value(false),
            ColumnDef::timestamp("CreatedAt").default_sql("CURRENT_TIMESTAMP"),
            ColumnDef::timestamp("UpdatedAt").nullable(),
        ])
        .primary_key(&["Id"])
}
