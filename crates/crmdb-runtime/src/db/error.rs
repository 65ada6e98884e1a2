use crmdb_core::error::CrmError;

/// SQLSTATE codes raised when an object already exists or does not exist yet.
const SCHEMA_CONFLICT_CODES: &[&str] = &[
    "42P07", // duplicate_table
    "42701", // duplicate_column
    "42710", // duplicate_object
    "42P01", // undefined_table
    "42703", // undefined_column
    "42704", // undefined_object
    "2BP01", // dependent_objects_still_exist
];

/// Map a driver error onto the crmdb error kinds.
///
/// Integrity violations (class 23) become `ConstraintViolation`; connection,
/// pool and TLS failures become `StoreUnavailable`.
pub fn map_db_error(e: sqlx::Error) -> CrmError {
    if let sqlx::Error::Database(db) = &e {
        let code = db.code().map(|c| c.to_string()).unwrap_or_default();
        let message = db.message().to_string();

        return if SCHEMA_CONFLICT_CODES.contains(&code.as_str()) {
            CrmError::SchemaConflict(message)
        } else if code.starts_with("23") {
            CrmError::ConstraintViolation(message)
        } else {
            CrmError::Database(format!("{} (SQLSTATE {})", message, code))
        };
    }

    if matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    ) {
        return CrmError::StoreUnavailable(e.to_string());
    }

    CrmError::Sql(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            map_db_error(sqlx::Error::PoolTimedOut),
            CrmError::StoreUnavailable(_)
        ));
        assert!(matches!(
            map_db_error(sqlx::Error::PoolClosed),
            CrmError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn test_io_errors_are_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            map_db_error(sqlx::Error::Io(io)),
            CrmError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_pass_through() {
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            CrmError::Sql(_)
        ));
    }
}
