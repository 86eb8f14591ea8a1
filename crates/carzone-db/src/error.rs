//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                  (the scoped transaction rolls back here)       │
//! │       ▼                                                                 │
//! │  ApiError (in carzone-api) ← Mapped to an HTTP status                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Engine read/update/delete on an unknown id
    /// - Car update/delete on an unknown id
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Referential integrity violation.
    ///
    /// ## When This Occurs
    /// - Creating a car whose engine_id does not exist
    /// - A FOREIGN KEY constraint failing at the database
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The operation lost a race or would break an invariant.
    ///
    /// ## When This Occurs
    /// - Delete affected zero rows after a successful read
    /// - Deleting an engine that cars still reference
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema bootstrap failed.
    #[error("Schema setup failed: {0}")]
    SchemaFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction begin/commit/rollback failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The write lock stayed held by another connection past the busy timeout.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The caller cancelled the operation.
    #[error("Operation cancelled: {op}")]
    Cancelled { op: &'static str },

    /// The caller's deadline elapsed before the operation finished.
    #[error("Deadline exceeded: {op}")]
    DeadlineExceeded { op: &'static str },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        DbError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a ForeignKeyViolation error.
    pub fn foreign_key(message: impl Into<String>) -> Self {
        DbError::ForeignKeyViolation {
            message: message.into(),
        }
    }

    /// True for errors caused by the caller abandoning the request.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            DbError::Cancelled { .. } | DbError::DeadlineExceeded { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → SQLITE_BUSY/LOCKED → DbError::Busy,
///                               else analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(ref db_err) if is_busy_code(db_err.code().as_deref()) => {
                DbError::Busy(db_err.message().to_string())
            }

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

// Primary result codes; extended codes keep them in the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .is_some_and(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

/// True when SQLite refused the statement because another connection holds
/// the lock.
pub(crate) fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => is_busy_code(db_err.code().as_deref()),
        _ => false,
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Engine", "abc");
        assert_eq!(err.to_string(), "Engine not found: abc");
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(DbError::Cancelled { op: "car.create" }.is_cancellation());
        assert!(DbError::DeadlineExceeded { op: "car.create" }.is_cancellation());
        assert!(!DbError::conflict("race").is_cancellation());
    }

    #[test]
    fn test_busy_codes() {
        assert!(is_busy_code(Some("5")));
        // SQLITE_BUSY_SNAPSHOT
        assert!(is_busy_code(Some("517")));
        assert!(is_busy_code(Some("6")));
        // SQLITE_CONSTRAINT_UNIQUE
        assert!(!is_busy_code(Some("2067")));
        assert!(!is_busy_code(None));
    }

    #[test]
    fn test_pool_errors_map() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::ConnectionFailed(_)
        ));
    }
}
