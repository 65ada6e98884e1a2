use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};

/// Lock ID for the migration advisory lock ("CRMDB" in hex).
pub const DEFAULT_LOCK_ID: i64 = 0x43524D4442;

/// Migration runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// Name of the version-history table.
    #[serde(default = "default_history_table")]
    pub history_table: String,

    /// Directory holding hand-written `<version>_<name>.up.sql` / `.down.sql` pairs.
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Whether the built-in CRM migration catalog is part of the set.
    #[serde(default = "default_true")]
    pub include_catalog: bool,

    /// Advisory lock key held while migrating.
    #[serde(default = "default_lock_id")]
    pub lock_id: i64,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            history_table: default_history_table(),
            directory: default_directory(),
            include_catalog: true,
            lock_id: DEFAULT_LOCK_ID,
        }
    }
}

impl MigrationsConfig {
    /// The history table name is interpolated into SQL, so it must be a plain identifier.
    pub(crate) fn validate(&self) -> Result<()> {
        let valid = !self.history_table.is_empty()
            && self.history_table.len() <= 63
            && self
                .history_table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !self.history_table.starts_with(|c: char| c.is_ascii_digit());

        if !valid {
            return Err(CrmError::Config(format!(
                "migrations.history_table '{}' is not a valid identifier",
                self.history_table
            )));
        }
        Ok(())
    }
}

fn default_history_table() -> String {
    "crm_migrations_history".to_string()
}

fn default_directory() -> String {
    "migrations".to_string()
}

fn default_true() -> bool {
    true
}

fn default_lock_id() -> i64 {
    DEFAULT_LOCK_ID
}
