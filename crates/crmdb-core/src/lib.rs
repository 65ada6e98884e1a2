//! Core types for crmdb: configuration, errors, the schema model, migration
//! operations and PostgreSQL rendering.

pub mod config;
pub mod error;
pub mod migration;
pub mod schema;
pub mod sql;

#[cfg(feature = "testing")]
pub mod testing;

pub use config::CrmConfig;
pub use error::{CrmError, Result};
pub use migration::{AppliedMigration, DataRows, Direction, Migration, MigrationSet, Operation};
pub use schema::{
    ColumnDef, ForeignKeyDef, IndexDef, ReferentialAction, SchemaDiff, SchemaSnapshot, SqlType,
    SqlValue, TableDef,
};
pub use sql::PostgresDialect;
