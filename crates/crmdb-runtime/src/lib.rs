//! Runtime for crmdb: the database pool, migration stores, the migration
//! runner and the built-in CRM schema history.

pub mod catalog;
pub mod db;
pub mod migrations;

pub use catalog::{crm_migration_list, crm_migrations};
pub use db::Database;
pub use migrations::{
    load_migration_set, InMemoryStore, MigrationRunner, MigrationStatus, MigrationStore,
    PgMigrationStore, RunReport,
};
