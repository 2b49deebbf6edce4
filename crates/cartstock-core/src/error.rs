//! # Validation Errors
//!
//! Errors raised by the validation layer before any store access happens.
//! Expected ledger conditions (unknown barcode, insufficient stock) are not
//! errors at all; they are [`crate::Outcome`] variants.

use thiserror::Error;

/// Input validation failures.
///
/// Raised by [`crate::validation`] for malformed or out-of-range input.
/// By the time a request reaches the ledger engine these have all been
/// ruled out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value exceeds its length limit.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is outside its allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A change of zero has no meaning in the ledger.
    #[error("delta must not be zero")]
    ZeroDelta,

    /// Invalid format (wrong length, non-digit characters, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
