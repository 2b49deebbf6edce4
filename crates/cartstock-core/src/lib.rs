//! # cartstock-core: Pure Domain Logic for Cartstock
//!
//! The domain vocabulary of the stock tracker, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Cartstock Architecture                         │
//! │                                                                     │
//! │  Handheld terminal ──► POST /scan ──┐                               │
//! │                                     │  cartstock-gateway            │
//! │  Operator commands ─────────────────┤  (codec, validation, fanout)  │
//! │                                     │                               │
//! │  ┌──────────────────────────────────▼──────────────────────────┐    │
//! │  │              ★ cartstock-core (THIS CRATE) ★                │    │
//! │  │                                                             │    │
//! │  │   ┌───────────┐   ┌────────────┐   ┌──────────────────┐     │    │
//! │  │   │   types   │   │ validation │   │      error       │     │    │
//! │  │   │  Item     │   │  barcode   │   │ ValidationError  │     │    │
//! │  │   │  Outcome  │   │  delta     │   │                  │     │    │
//! │  │   └───────────┘   └────────────┘   └──────────────────┘     │    │
//! │  │                                                             │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │    │
//! │  └──────────────────────────────────┬──────────────────────────┘    │
//! │                                     │                               │
//! │  ┌──────────────────────────────────▼──────────────────────────┐    │
//! │  │                 cartstock-db (Database Layer)               │    │
//! │  │       catalog store, ledger engine, audit log (SQLite)      │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, HistoryEntry, Subscriber, Outcome)
//! - [`validation`] - Input validation that runs before the ledger engine
//! - [`error`] - Typed validation errors

pub mod error;
pub mod types;
pub mod validation;

// Re-exports so callers can `use cartstock_core::Outcome` directly.
pub use error::ValidationError;
pub use types::*;
pub use validation::{
    validate_barcode, validate_delta, validate_initial_quantity, validate_item_name,
};

/// Length of a cartridge barcode (EAN-13, digits only).
pub const BARCODE_LEN: usize = 13;

/// Largest quantity change a single operator command may apply.
///
/// Deliveries arrive a handful of boxes at a time; anything beyond this is
/// almost certainly a typo, so it is rejected before reaching the ledger.
pub const MAX_DELTA_MAGNITUDE: i64 = 15;
