//! # Gateway Error Types
//!
//! ## Taxonomy
//! ```text
//! CodecError      transport authentication/format failure at the device
//!                 boundary; answered with 403/400, never an inventory
//!                 event, never reaches the ledger
//! DeliveryError   one failed notification attempt; recorded and skipped,
//!                 never retried, never affects ledger state
//! OperatorError   command-boundary failures: unauthorized identity,
//!                 validation rejection, or an unexpected store failure
//! ```

use thiserror::Error;

use cartstock_core::ValidationError;
use cartstock_db::StoreError;

/// Device transport decode failures.
///
/// Deliberately coarse: the terminal is told that authentication or
/// framing failed, not which byte was wrong.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Request body is not valid base64.
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded payload is too short for IV + one cipher block, or not
    /// block-aligned.
    #[error("payload has invalid length: {0} bytes")]
    BadLength(usize),

    /// Padding validation failed after decryption: wrong key or tampered
    /// ciphertext.
    #[error("decryption failed: bad key or corrupted ciphertext")]
    Decrypt,
}

/// A single failed notification delivery.
#[derive(Debug, Error)]
#[error("delivery to {target} failed: {reason}")]
pub struct DeliveryError {
    pub target: String,
    pub reason: String,
}

/// Operator command failures.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// The external identity is not in the subscriber registry.
    #[error("identity '{0}' is not registered")]
    NotAuthorized(String),

    /// Input rejected before any store access.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unexpected persistence failure; the transaction was rolled back.
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}
