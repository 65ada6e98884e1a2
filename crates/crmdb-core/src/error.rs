use thiserror::Error;

/// Core error type for crmdb operations.
#[derive(Error, Debug)]
pub enum CrmError {
    /// The target object already exists, or does not exist yet.
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    /// A row change failed a referential, uniqueness or nullability check.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Duplicate migration version: {0}")]
    DuplicateVersion(String),

    #[error("Applied migration {0} is not part of the known migration set")]
    UnknownVersion(String),

    #[error("Migration {pending} is pending but older than the applied head {head}")]
    OutOfOrder { pending: String, head: String },

    #[error("Checksum mismatch for applied migration {version}: recorded {recorded}, current {current}")]
    ChecksumMismatch {
        version: String,
        recorded: String,
        current: String,
    },

    #[error("Migration {version} is not reversible: {detail}")]
    Irreversible { version: String, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CrmError {
    /// Prefix the message with the migration the error happened in.
    pub fn in_migration(self, id: &str) -> Self {
        match self {
            CrmError::SchemaConflict(m) => CrmError::SchemaConflict(format!("{}: {}", id, m)),
            CrmError::ConstraintViolation(m) => {
                CrmError::ConstraintViolation(format!("{}: {}", id, m))
            }
            CrmError::Validation(m) => CrmError::Validation(format!("{}: {}", id, m)),
            CrmError::Database(m) => CrmError::Database(format!("{}: {}", id, m)),
            other => other,
        }
    }
}

impl From<serde_json::Error> for CrmError {
    fn from(e: serde_json::Error) -> Self {
        CrmError::Serialization(e.to_string())
    }
}

/// Result type alias using CrmError.
pub type Result<T> = std::result::Result<T, CrmError>;
