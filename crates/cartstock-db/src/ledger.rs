//! # Ledger Engine
//!
//! The transactional update engine at the center of the system.
//!
//! ## apply_change
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 One atomic transaction                              │
//! │                                                                     │
//! │  BEGIN IMMEDIATE (write lock taken up front)                        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  resolve barcode via alias join                                     │
//! │       │                                                             │
//! │       ├── no item ──────────────────────────► Outcome::NotFound     │
//! │       ▼                                       (nothing written)     │
//! │  guarded update:                                                    │
//! │    UPDATE items SET quantity = quantity + δ                         │
//! │    WHERE id = ? AND quantity + δ >= 0                               │
//! │       │                                                             │
//! │       ├── no row matched ───────────────────► Outcome::Rejected     │
//! │       ▼                                       (nothing written)     │
//! │  append history row (|δ|, sign, new balance)                        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  COMMIT ────────────────────────────────────► Outcome::Applied      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why the guard lives in the UPDATE
//! Two concurrent decrements against a quantity of 1 must not both pass a
//! read-then-check: with the non-negative condition inside the UPDATE's
//! WHERE clause, the database evaluates check and write as one step, so
//! conflicting writers can never drive the quantity negative - one gets
//! `Applied`, the other `Rejected`, under any interleaving.
//!
//! ## Why the transaction is IMMEDIATE
//! A deferred transaction starts on a read snapshot and only takes the
//! write lock at the UPDATE; if another writer commits in between, SQLite
//! refuses the snapshot upgrade with a busy error the busy timeout does
//! not cover. `BEGIN IMMEDIATE` takes the write lock before the first
//! read, so concurrent writers from a multi-connection pool serialize
//! through the busy timeout and always land on an ordinary outcome.
//!
//! No network I/O happens while the transaction is open; notification
//! fanout runs in the gateway strictly after commit.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::repository::audit::AuditRepository;
use cartstock_core::{Outcome, StockAction};

/// The transactional update engine.
///
/// Preconditions (enforced by the validation layer, not here): `delta` is
/// nonzero and within the operator bound; `barcode` is a 13-digit string.
/// The engine itself only enforces the non-negative stock invariant.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    pool: SqlitePool,
}

impl LedgerEngine {
    /// Creates a new LedgerEngine.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerEngine { pool }
    }

    /// Applies a signed quantity change to the item a barcode resolves to.
    ///
    /// Item update and audit append commit as one unit; no partial write
    /// is ever observable. `NotFound` and `Rejected` are ordinary return
    /// values and leave the store untouched. A `StoreError` means the
    /// transaction was rolled back in full.
    pub async fn apply_change(&self, barcode: &str, delta: i64) -> StoreResult<Outcome> {
        debug!(barcode = %barcode, delta = delta, "Applying ledger change");

        let mut conn = self.pool.acquire().await?;

        // Write lock up front (see module docs). Blocked writers wait in
        // the busy handler instead of failing on snapshot upgrade.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match Self::apply_locked(&mut conn, barcode, delta).await {
            Ok(outcome) => {
                if let Err(err) = sqlx::query("COMMIT").execute(&mut *conn).await {
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    return Err(err.into());
                }

                if let Outcome::Applied {
                    name, new_balance, ..
                } = &outcome
                {
                    info!(
                        barcode = %barcode,
                        name = %name,
                        delta = delta,
                        new_balance = *new_balance,
                        "Ledger change applied"
                    );
                }

                Ok(outcome)
            }
            Err(err) => {
                // The connection must not return to the pool with an open
                // transaction.
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(err)
            }
        }
    }

    /// The body of the transaction; runs with the write lock held.
    async fn apply_locked(
        conn: &mut SqliteConnection,
        barcode: &str,
        delta: i64,
    ) -> StoreResult<Outcome> {
        let item: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT i.id, i.name
            FROM items i
            INNER JOIN barcodes b ON b.item_id = i.id
            WHERE b.barcode = ?1
            "#,
        )
        .bind(barcode)
        .fetch_optional(&mut *conn)
        .await?;

        let Some((item_id, name)) = item else {
            // Nothing written; the empty transaction commits as a no-op.
            warn!(barcode = %barcode, "Ledger change for unknown barcode");
            return Ok(Outcome::NotFound {
                barcode: barcode.to_string(),
            });
        };

        let now = Utc::now();

        // Check and write in one statement (see module docs).
        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE items
            SET quantity = quantity + ?2, last_update = ?3
            WHERE id = ?1 AND quantity + ?2 >= 0
            RETURNING quantity
            "#,
        )
        .bind(&item_id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        let Some((new_balance,)) = updated else {
            warn!(barcode = %barcode, name = %name, delta = delta, "Ledger change rejected: would go negative");
            return Ok(Outcome::Rejected { name });
        };

        AuditRepository::append(
            &mut *conn,
            barcode,
            StockAction::from_delta(delta),
            delta.abs(),
            new_balance,
            now,
        )
        .await?;

        Ok(Outcome::Applied {
            item_id,
            name,
            new_balance,
        })
    }
}
