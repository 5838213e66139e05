//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ```text
//! ValidationError ─┐
//! CoreError ───────┼──► ApiError { code, message } ──► dashboard toast
//! DbError ─────────┘    (database details are logged, never shown)
//! ```
//!
//! Every failure ends in a toast and nothing proceeds; there are no retries.

use serde::Serialize;
use mostrador_core::{CoreError, ValidationError};
use mostrador_db::DbError;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for ARZ-1KG: 3 available, 5 requested"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,

    /// Shown to the user as-is
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Unique value already taken (product code)
    Duplicate,

    /// Database operation failed
    DatabaseError,

    /// Lifecycle rule violated (completing a cancelled sale, ...)
    BusinessLogic,

    /// Header and line discounts mixed
    DiscountConflict,

    /// Not enough stock
    InsufficientStock,

    /// Payment does not cover the total
    PaymentError,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Duplicate,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Constraint(message) => {
                tracing::error!(%message, "Constraint violation");
                ApiError::validation("Value rejected by the database")
            }
            DbError::Core(e) => ApiError::from(e),
            DbError::Connection(e) => {
                tracing::error!(error = %e, "Database connection failed");
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::Migration(e) => {
                tracing::error!(error = %e, "Database migration failed");
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::Query(e) => {
                tracing::error!(error = %e, "Database query failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again")
            }
            DbError::Internal(e) => {
                tracing::error!(error = %e, "Internal database error");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::InsufficientStock {
                code,
                available,
                requested,
            } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Insufficient stock for {}: {} available, {} requested",
                    code, available, requested
                ),
            ),
            e @ CoreError::InvalidStatusTransition { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, e.to_string())
            }
            CoreError::DiscountModeConflict(message) => {
                ApiError::new(ErrorCode::DiscountConflict, message)
            }
            CoreError::DraftTooLarge { max } => ApiError::validation(format!(
                "A transaction cannot have more than {} lines",
                max
            )),
            CoreError::QuantityTooLarge { requested, max } => ApiError::validation(format!(
                "Quantity {} exceeds maximum allowed ({})",
                requested, max
            )),
            CoreError::LineNotFound(id) => ApiError::not_found("Line", &id),
            CoreError::EmptyTransaction => {
                ApiError::validation("Add at least one product before saving")
            }
            CoreError::InvalidPayment { reason } => ApiError::new(
                ErrorCode::PaymentError,
                format!("Invalid payment: {}", reason),
            ),
            CoreError::InvalidLinePricing(message) => {
                tracing::error!("Invalid stored line pricing: {}", message);
                ApiError::internal("Stored line pricing is invalid")
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Duplicate { field, value } => ApiError::new(
                ErrorCode::Duplicate,
                format!("{} '{}' already exists", field, value),
            ),
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_maps_to_its_code() {
        let err = ApiError::from(CoreError::InsufficientStock {
            code: "ARZ-1KG".to_string(),
            available: 3,
            requested: 5,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("3 available"));
    }

    #[test]
    fn test_core_error_inside_db_error_keeps_its_code() {
        let err = ApiError::from(DbError::Core(CoreError::DiscountModeConflict(
            "header discount active".to_string(),
        )));
        assert_eq!(err.code, ErrorCode::DiscountConflict);
    }

    #[test]
    fn test_query_failure_hides_details() {
        let err = ApiError::from(DbError::Query("no such column: foo".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("foo"));
    }

    #[test]
    fn test_serializes_screaming_code() {
        let err = ApiError::not_found("Sale", "abc");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"code":"NOT_FOUND","message":"Sale not found: abc"}"#);
    }
}
