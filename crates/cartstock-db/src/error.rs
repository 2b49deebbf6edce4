//! # Store Error Types
//!
//! Unexpected persistence failures. Expected ledger conditions (unknown
//! barcode, insufficient stock) never appear here; they are
//! [`cartstock_core::Outcome`] variants.
//!
//! ## Error Flow
//! ```text
//! SQLite error (sqlx::Error)
//!      │
//!      ▼
//! StoreError (this module) ← adds context and categorization
//!      │
//!      ▼
//! Gateway: logged at error severity, transaction already rolled back,
//! surfaced to the initiator as a generic failure + diagnostic fanout
//! ```

use thiserror::Error;

/// Unexpected database operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violation (duplicate barcode, duplicate
    /// subscriber identity).
    #[error("duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation (alias referencing a missing item).
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Database connection failed (missing file permissions, disk full).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed at runtime.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Anything else.
    #[error("internal database error: {0}")]
    Internal(String),
}

/// Convert sqlx errors to StoreError.
///
/// SQLite reports constraint failures as database errors with well-known
/// message prefixes; those are split out so callers can tell a duplicate
/// barcode from a genuine I/O failure.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    StoreError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    StoreError::ForeignKeyViolation(msg.to_string())
                } else {
                    StoreError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,

            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("pool is closed".to_string()),

            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type StoreResult<T> = Result<T, StoreError>;
