//! # Audit Repository
//!
//! The append-only change history. One row per committed ledger operation,
//! written inside the same transaction as the item update, so the two can
//! never diverge.
//!
//! Rows are never updated or deleted. The log is unbounded; retention is a
//! future concern and deliberately not handled here.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{StoreError, StoreResult};
use cartstock_core::{HistoryEntry, StockAction};

/// Column encoding of [`StockAction`]: decrease = 0, increase = 1.
fn action_to_column(action: StockAction) -> i64 {
    match action {
        StockAction::Decrease => 0,
        StockAction::Increase => 1,
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    barcode: String,
    action_type: i64,
    magnitude: i64,
    resulting_balance: i64,
    recorded_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_entry(self) -> StoreResult<HistoryEntry> {
        let action = match self.action_type {
            0 => StockAction::Decrease,
            1 => StockAction::Increase,
            other => {
                // The CHECK constraint makes this unreachable short of
                // external tampering with the database file.
                return Err(StoreError::Internal(format!(
                    "history row {} has invalid action_type {}",
                    self.id, other
                )));
            }
        };

        Ok(HistoryEntry {
            id: self.id,
            barcode: self.barcode,
            action,
            magnitude: self.magnitude,
            resulting_balance: self.resulting_balance,
            recorded_at: self.recorded_at,
        })
    }
}

/// Repository for the audit trail.
///
/// Reads go through the pool; the append is deliberately only reachable
/// with an open transaction, because an audit row without its item update
/// (or vice versa) would violate the ledger's completeness invariant.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one history row on the given transaction connection.
    ///
    /// Called by the ledger engine only, between its guarded item update
    /// and the commit.
    pub(crate) async fn append(
        conn: &mut SqliteConnection,
        barcode: &str,
        action: StockAction,
        magnitude: i64,
        resulting_balance: i64,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO history (barcode, action_type, magnitude, resulting_balance, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(barcode)
        .bind(action_to_column(action))
        .bind(magnitude)
        .bind(resulting_balance)
        .bind(recorded_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Returns the most recent entries, newest first.
    pub async fn recent(&self, limit: u32) -> StoreResult<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT id, barcode, action_type, magnitude, resulting_balance, recorded_at
            FROM history
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    /// Returns the most recent entries for one barcode, newest first.
    pub async fn for_barcode(&self, barcode: &str, limit: u32) -> StoreResult<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT id, barcode, action_type, magnitude, resulting_balance, recorded_at
            FROM history
            WHERE barcode = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(barcode)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    /// Total number of entries (for diagnostics).
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
