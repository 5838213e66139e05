//! # Error Types
//!
//! `ValidationError` covers bad input (checked before any rule runs);
//! `CoreError` covers broken business rules and wraps `ValidationError`.
//! The db layer carries `CoreError` inside `DbError::Core` when a rule
//! fails mid-transaction, and the back office turns both into `ApiError`.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are caught at the
/// command layer and translated to user-facing notifications.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to sell the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to sale (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { code: "ARZ-1KG", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Dashboard shows: "Only 3 ARZ-1KG in stock" (nothing was written)
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// A status change the lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - Completing a sale that is not pending
    /// - Cancelling an already cancelled sale or purchase
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidStatusTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Header discount and per-line discounts were mixed.
    ///
    /// The dashboard shows this as a warning and offers to switch modes.
    #[error("Discount mode conflict: {0}")]
    DiscountModeConflict(String),

    /// Draft has exceeded the maximum number of lines.
    #[error("A transaction cannot have more than {max} lines")]
    DraftTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Line not present in the draft.
    #[error("Product {0} is not in the transaction")]
    LineNotFound(String),

    /// Saving a transaction without lines.
    #[error("Transaction has no lines")]
    EmptyTransaction,

    /// Payment data does not cover the total.
    #[error("Invalid payment: {reason}")]
    InvalidPayment { reason: String },

    /// Persisted line pricing columns do not form a valid variant.
    #[error("Invalid line pricing: {0}")]
    InvalidLinePricing(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidStatusTransition error from displayable states.
    pub fn transition(
        entity: impl Into<String>,
        from: impl std::fmt::Debug,
        to: impl std::fmt::Debug,
    ) -> Self {
        CoreError::InvalidStatusTransition {
            entity: entity.into(),
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate product code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            code: "ARZ-1KG".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for ARZ-1KG: available 3, requested 5"
        );
    }

    #[test]
    fn test_transition_message() {
        #[derive(Debug)]
        enum S {
            Cancelled,
        }
        let err = CoreError::transition("sale", S::Cancelled, S::Cancelled);
        assert_eq!(err.to_string(), "Cannot move sale from Cancelled to Cancelled");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: code is required");
    }
}
