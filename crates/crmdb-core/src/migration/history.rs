use chrono::{DateTime, Utc};
use serde::Serialize;

use super::step::Migration;
use crate::schema::SqlValue;
use crate::sql::quote_ident;

/// A migration recorded in the version-history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: String,
    pub name: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
    pub execution_time_ms: i64,
}

/// DDL for the version-history table.
pub fn create_history_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
    version VARCHAR(32) PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    checksum VARCHAR(64) NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    execution_time_ms BIGINT NOT NULL DEFAULT 0
)"#,
        quote_ident(table)
    )
}

/// Literal insert of a history record, for generated scripts.
pub fn insert_history_sql(table: &str, migration: &Migration) -> String {
    format!(
        "INSERT INTO {} (version, name, checksum) VALUES ({}, {}, {})",
        quote_ident(table),
        SqlValue::from(migration.version.as_str()).to_sql_literal(),
        SqlValue::from(migration.name.as_str()).to_sql_literal(),
        SqlValue::from(migration.checksum()).to_sql_literal(),
    )
}

/// Literal delete of a history record, for generated scripts.
pub fn delete_history_sql(table: &str, version: &str) -> String {
    format!(
        "DELETE FROM {} WHERE version = {}",
        quote_ident(table),
        SqlValue::from(version).to_sql_literal()
    )
}
