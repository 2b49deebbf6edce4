//! # Validation Module
//!
//! Input validation that runs before anything touches the store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Boundary (gateway)                                        │
//! │  ├── Payload shape (JSON fields present, decrypt succeeded)         │
//! │  └── THIS MODULE: barcode / delta / name rules                      │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: Ledger engine                                             │
//! │  └── Non-negative stock check inside the transaction                │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  ├── UNIQUE / FK constraints                                        │
//! │  └── CHECK (quantity >= 0) backstop                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A validation failure means the request never reaches the ledger engine
//! and no store access occurs.

use crate::error::{ValidationError, ValidationResult};
use crate::{BARCODE_LEN, MAX_DELTA_MAGNITUDE};

/// Validates a cartridge barcode.
///
/// ## Rules
/// - Exactly [`BARCODE_LEN`] (13) characters
/// - ASCII digits only
///
/// ## Example
/// ```rust
/// use cartstock_core::validation::validate_barcode;
///
/// assert!(validate_barcode("4606224236582").is_ok());
/// assert!(validate_barcode("123").is_err());
/// assert!(validate_barcode("46062242365ab").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() != BARCODE_LEN || !barcode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: format!("must be exactly {} digits", BARCODE_LEN),
        });
    }

    Ok(())
}

/// Validates a quantity change before it is handed to the ledger.
///
/// ## Rules
/// - Nonzero: a zero change has no use case and is rejected outright
/// - Magnitude at most [`MAX_DELTA_MAGNITUDE`] (15)
///
/// ## Example
/// ```rust
/// use cartstock_core::validation::validate_delta;
///
/// assert!(validate_delta(-2).is_ok());
/// assert!(validate_delta(15).is_ok());
/// assert!(validate_delta(0).is_err());
/// assert!(validate_delta(16).is_err());
/// ```
pub fn validate_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::ZeroDelta);
    }

    if delta.abs() > MAX_DELTA_MAGNITUDE {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_DELTA_MAGNITUDE,
            max: MAX_DELTA_MAGNITUDE,
        });
    }

    Ok(())
}

/// Validates an item name.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - At most 200 characters
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates the starting quantity of a newly inserted item.
///
/// Zero is fine (a model can be catalogued before stock arrives); negative
/// starting stock would break the ledger invariant on day one.
pub fn validate_initial_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
