//! # Domain Types
//!
//! Data types shared across the workspace. Mutation rules:
//!
//! - [`Item::quantity`] is changed only by the ledger engine, inside a
//!   transaction that also appends a [`HistoryEntry`].
//! - Barcode aliases are created with their item (or added later) and are
//!   never updated; they are deleted only together with the item.
//! - [`HistoryEntry`] rows are written exactly once and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Items
// =============================================================================

/// A stocked cartridge model.
///
/// Interchangeable cartridges share one item: the item carries the stock
/// count, while each scannable code is a separate [`ItemRecord::aliases`]
/// entry pointing at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier (UUID v4, generated on insert).
    pub id: String,
    /// Human-readable model name, e.g. "TL-420".
    pub name: String,
    /// Units on the shelf. Invariant: never negative.
    pub quantity: i64,
    /// Timestamp of the last committed quantity change (or insert).
    pub last_update: DateTime<Utc>,
}

/// Item aggregate returned by catalog lookups: the item plus the ordered
/// set of barcodes that resolve to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    /// Aliases in insertion order. Non-empty for any item created through
    /// the catalog (the first alias is inserted in the same transaction).
    pub aliases: Vec<String>,
    pub last_update: DateTime<Utc>,
}

// =============================================================================
// Audit Trail
// =============================================================================

/// Direction of a committed quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    /// Stock went down (delta < 0).
    Decrease,
    /// Stock went up (delta > 0).
    Increase,
}

impl StockAction {
    /// Derives the action from the sign of a delta.
    ///
    /// A zero delta never reaches the ledger (validation rejects it), so
    /// the mapping only needs the two signs.
    pub fn from_delta(delta: i64) -> Self {
        if delta < 0 {
            StockAction::Decrease
        } else {
            StockAction::Increase
        }
    }
}

impl std::fmt::Display for StockAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockAction::Decrease => write!(f, "decrease"),
            StockAction::Increase => write!(f, "increase"),
        }
    }
}

/// One immutable audit record, appended within the same transaction as the
/// item update it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Monotonic row id assigned by the store.
    pub id: i64,
    /// The barcode the change was keyed by (as scanned or typed).
    pub barcode: String,
    pub action: StockAction,
    /// Absolute size of the change. Always >= 0.
    pub magnitude: i64,
    /// Item quantity immediately after the change committed.
    pub resulting_balance: i64,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Subscribers
// =============================================================================

/// An identity registered to receive change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: String,
    /// Identity on the external messaging surface. Unique.
    pub external_id: String,
    pub display_name: String,
    /// Whether this subscriber currently receives fanout deliveries.
    pub notify_enabled: bool,
}

// =============================================================================
// Ledger Outcome
// =============================================================================

/// Result of one ledger operation.
///
/// Exactly three cases, all ordinary values: `NotFound` and `Rejected` are
/// expected conditions, not errors, and cause no mutation. Only unexpected
/// store failures surface as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The change committed; the audit entry exists.
    Applied {
        item_id: String,
        name: String,
        new_balance: i64,
    },
    /// No item resolves to the given barcode.
    NotFound { barcode: String },
    /// The change would have driven the quantity negative.
    Rejected { name: String },
}

impl Outcome {
    /// True iff the ledger actually mutated state.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_from_delta_sign() {
        assert_eq!(StockAction::from_delta(-3), StockAction::Decrease);
        assert_eq!(StockAction::from_delta(5), StockAction::Increase);
    }

    #[test]
    fn outcome_is_applied() {
        let applied = Outcome::Applied {
            item_id: "x".into(),
            name: "TL-420".into(),
            new_balance: 3,
        };
        assert!(applied.is_applied());
        assert!(!Outcome::NotFound { barcode: "0000000000000".into() }.is_applied());
        assert!(!Outcome::Rejected { name: "TL-420".into() }.is_applied());
    }

    #[test]
    fn outcome_serializes_tagged() {
        let applied = Outcome::Applied {
            item_id: "x".into(),
            name: "TL-420".into(),
            new_balance: 3,
        };
        let json = serde_json::to_value(&applied).unwrap();
        assert_eq!(json["outcome"], "applied");
        assert_eq!(json["new_balance"], 3);
    }
}
