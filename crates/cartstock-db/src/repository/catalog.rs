//! # Catalog Repository
//!
//! Items and their barcode aliases: pure data access, no stock rules.
//! Quantity changes go through [`crate::ledger::LedgerEngine`]; the catalog
//! only sets the starting quantity on insert.
//!
//! ## Alias Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Interchangeable cartridges share one item                          │
//! │                                                                     │
//! │  barcodes                         items                             │
//! │  ┌───────────────┬─────────┐      ┌────────┬────────┬──────────┐    │
//! │  │ 4606224236582 │ item A  │──┐   │ item A │ TL-420 │ qty: 5   │    │
//! │  │ 4606224236599 │ item A  │──┘──►│        │        │          │    │
//! │  │ 6938639800012 │ item B  │─────►│ item B │ CF217A │ qty: 2   │    │
//! │  └───────────────┴─────────┘      └────────┴────────┴──────────┘    │
//! │                                                                     │
//! │  An item always has >= 1 alias right after creation: the first      │
//! │  alias is inserted in the same transaction as the item.             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use cartstock_core::ItemRecord;

/// Escapes LIKE metacharacters so a search string matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Row shape shared by all item queries.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    name: String,
    quantity: i64,
    last_update: DateTime<Utc>,
}

impl ItemRow {
    fn into_record(self, aliases: Vec<String>) -> ItemRecord {
        ItemRecord {
            id: self.id,
            name: self.name,
            quantity: self.quantity,
            aliases,
            last_update: self.last_update,
        }
    }
}

/// Repository for items and barcode aliases.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a new item together with its first barcode alias.
    ///
    /// Item insert and alias insert are one transaction: if the barcode is
    /// already taken, nothing is committed.
    ///
    /// ## Returns
    /// * `Ok(id)` - generated item id
    /// * `Err(StoreError::UniqueViolation)` - barcode already aliased
    pub async fn insert_item(
        &self,
        barcode: &str,
        name: &str,
        quantity: i64,
    ) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(barcode = %barcode, name = %name, "Inserting item");

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO items (id, name, quantity, last_update) VALUES (?1, ?2, ?3, ?4)")
            .bind(&id)
            .bind(name)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO barcodes (barcode, item_id) VALUES (?1, ?2)")
            .bind(barcode)
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(id)
    }

    /// Adds another barcode alias to an existing item.
    ///
    /// ## Returns
    /// * `Ok(true)` - alias added
    /// * `Ok(false)` - barcode already aliased (to any item, including this
    ///   one), or the item does not exist
    pub async fn add_alias(&self, barcode: &str, item_id: &str) -> StoreResult<bool> {
        debug!(barcode = %barcode, item_id = %item_id, "Adding alias");

        // Single statement, so there is no window for the item to vanish
        // between an existence check and the insert. A missing item
        // surfaces as a foreign key violation and maps to the same answer.
        let result = sqlx::query(
            "INSERT INTO barcodes (barcode, item_id) VALUES (?1, ?2) \
             ON CONFLICT (barcode) DO NOTHING",
        )
        .bind(barcode)
        .bind(item_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(err) => match StoreError::from(err) {
                StoreError::ForeignKeyViolation(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    /// Resolves a barcode to its item aggregate.
    pub async fn find_by_barcode(&self, barcode: &str) -> StoreResult<Option<ItemRecord>> {
        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            SELECT i.id, i.name, i.quantity, i.last_update
            FROM items i
            INNER JOIN barcodes b ON b.item_id = i.id
            WHERE b.barcode = ?1
            "#,
        )
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        self.with_aliases(row).await
    }

    /// Finds an item by name: case-insensitive substring match, first hit
    /// in storage order. `%` and `_` in the query match themselves, not as
    /// wildcards.
    pub async fn find_by_name(&self, name: &str) -> StoreResult<Option<ItemRecord>> {
        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, name, quantity, last_update
            FROM items
            WHERE name LIKE '%' || ?1 || '%' ESCAPE '\'
            ORDER BY rowid
            LIMIT 1
            "#,
        )
        .bind(escape_like(name))
        .fetch_optional(&self.pool)
        .await?;

        self.with_aliases(row).await
    }

    /// Gets an item aggregate by its id.
    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<ItemRecord>> {
        let row: Option<ItemRow> =
            sqlx::query_as("SELECT id, name, quantity, last_update FROM items WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        self.with_aliases(row).await
    }

    /// Deletes an item and all of its aliases, atomically.
    ///
    /// Aliases go first (they hold the foreign key), then the item. If the
    /// item does not exist nothing is committed.
    ///
    /// ## Returns
    /// * `Ok(true)` - item and aliases removed
    /// * `Ok(false)` - no such item (transaction rolled back)
    pub async fn delete_item(&self, id: &str) -> StoreResult<bool> {
        debug!(id = %id, "Deleting item");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM barcodes WHERE item_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the alias delete.
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Lists all items with their aliases, in storage order.
    pub async fn list_items(&self) -> StoreResult<Vec<ItemRecord>> {
        let rows: Vec<ItemRow> =
            sqlx::query_as("SELECT id, name, quantity, last_update FROM items ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        let alias_rows: Vec<(String, String)> =
            sqlx::query_as("SELECT item_id, barcode FROM barcodes ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
        for (item_id, barcode) in alias_rows {
            aliases.entry(item_id).or_default().push(barcode);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let item_aliases = aliases.remove(&row.id).unwrap_or_default();
                row.into_record(item_aliases)
            })
            .collect())
    }

    /// Attaches the ordered alias list to a fetched item row.
    async fn with_aliases(&self, row: Option<ItemRow>) -> StoreResult<Option<ItemRecord>> {
        let Some(row) = row else {
            return Ok(None);
        };

        let aliases: Vec<(String,)> =
            sqlx::query_as("SELECT barcode FROM barcodes WHERE item_id = ?1 ORDER BY rowid")
                .bind(&row.id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(
            row.into_record(aliases.into_iter().map(|(b,)| b).collect()),
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
