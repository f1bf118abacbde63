//! SQL storage error types.

use idm_store::StorageError;
use sqlx::Error as SqlxError;

/// Converts a `SQLx` error to a storage error.
#[allow(clippy::needless_pass_by_value)]
pub fn from_sqlx_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::RowNotFound => {
            // Generic internal error - callers should handle specific not-found cases
            StorageError::Internal("Row not found".to_string())
        }
        SqlxError::Database(db_err) => {
            if db_err.is_unique_violation() {
                StorageError::Internal(format!("Duplicate entry: {}", db_err.message()))
            } else if db_err.is_foreign_key_violation() {
                StorageError::Internal(format!("Reference violation: {}", db_err.message()))
            } else {
                StorageError::Query(db_err.to_string())
            }
        }
        SqlxError::PoolTimedOut => StorageError::Connection("Connection pool timeout".to_string()),
        SqlxError::PoolClosed => StorageError::Connection("Connection pool closed".to_string()),
        SqlxError::Io(e) => StorageError::Connection(e.to_string()),
        SqlxError::Migrate(e) => StorageError::Internal(format!("Migration failed: {e}")),
        _ => StorageError::Internal(err.to_string()),
    }
}

/// Converts an insert error, reporting unique violations as duplicates.
pub fn from_insert_error<'a>(
    entity_type: &'static str,
    value: &'a str,
) -> impl FnOnce(SqlxError) -> StorageError + 'a {
    move |err| match err {
        SqlxError::Database(ref db_err) if db_err.is_unique_violation() => {
            StorageError::duplicate(entity_type, "name", value)
        }
        other => from_sqlx_error(other),
    }
}

/// Converts a transaction control error.
#[allow(clippy::needless_pass_by_value)]
pub fn from_transaction_error(err: SqlxError) -> StorageError {
    StorageError::Transaction(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_connection_errors() {
        assert!(from_sqlx_error(SqlxError::PoolTimedOut).is_connection_error());
        assert!(from_sqlx_error(SqlxError::PoolClosed).is_connection_error());
    }

    #[test]
    fn row_not_found_is_internal() {
        let err = from_sqlx_error(SqlxError::RowNotFound);
        assert!(matches!(err, StorageError::Internal(_)));
    }

    #[test]
    fn insert_error_passes_through_non_database_errors() {
        let err = from_insert_error("User", "asaldhana")(SqlxError::PoolClosed);
        assert!(err.is_connection_error());
    }
}
