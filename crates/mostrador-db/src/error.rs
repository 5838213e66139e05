//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──┐
//!               ├──► DbError ──► ApiError (backoffice)
//! CoreError ────┘    (a business rule refused a write; the tx rolled back)
//! ```

use mostrador_core::CoreError;
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row with that id, or the row is soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// UNIQUE index hit (product code, folio).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// FOREIGN KEY, CHECK or NOT NULL constraint rejected the row.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Column named in a SQLite constraint message,
/// e.g. `UNIQUE constraint failed: products.code` → `code`.
fn constraint_column(message: &str) -> &str {
    message
        .rsplit(": ")
        .next()
        .and_then(|target| target.rsplit('.').next())
        .unwrap_or("unknown")
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    DbError::duplicate(constraint_column(db_err.message()), "unknown")
                }
                ErrorKind::ForeignKeyViolation
                | ErrorKind::CheckViolation
                | ErrorKind::NotNullViolation => DbError::Constraint(db_err.message().to_string()),
                _ => DbError::Query(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::Connection("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
