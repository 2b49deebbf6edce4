//! # Subscriber Repository
//!
//! The registry of identities that receive change notifications. Written
//! by operator commands, read by the notification fanout and by the
//! operator boundary's capability check.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreResult;
use cartstock_core::Subscriber;

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: String,
    external_id: String,
    display_name: String,
    notify_enabled: bool,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Subscriber {
            id: row.id,
            external_id: row.external_id,
            display_name: row.display_name,
            notify_enabled: row.notify_enabled,
        }
    }
}

/// Repository for notification subscribers.
#[derive(Debug, Clone)]
pub struct SubscriberRepository {
    pool: SqlitePool,
}

impl SubscriberRepository {
    /// Creates a new SubscriberRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SubscriberRepository { pool }
    }

    /// Registers an external identity. Idempotent: registering an already
    /// known identity is a no-op, not an error.
    ///
    /// New subscribers start with notifications off.
    pub async fn register(&self, external_id: &str, display_name: &str) -> StoreResult<()> {
        debug!(external_id = %external_id, "Registering subscriber");

        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO subscribers (id, external_id, display_name, notify_enabled)
            VALUES (?1, ?2, ?3, 0)
            ON CONFLICT (external_id) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(external_id)
        .bind(display_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes an external identity.
    ///
    /// ## Returns
    /// `true` iff a row was removed.
    pub async fn unregister(&self, external_id: &str) -> StoreResult<bool> {
        debug!(external_id = %external_id, "Unregistering subscriber");

        let result = sqlx::query("DELETE FROM subscribers WHERE external_id = ?1")
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Enables or disables notifications for an identity.
    ///
    /// No-op for an unknown identity; callers that need to report absence
    /// check [`Self::exists`] first.
    pub async fn set_notify(&self, external_id: &str, enabled: bool) -> StoreResult<()> {
        sqlx::query("UPDATE subscribers SET notify_enabled = ?2 WHERE external_id = ?1")
            .bind(external_id)
            .bind(enabled)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Whether the identity is registered.
    ///
    /// This is the capability check used at the operator boundary: only
    /// registered identities may issue commands.
    pub async fn exists(&self, external_id: &str) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM subscribers WHERE external_id = ?1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// External identities of all subscribers with notifications enabled.
    pub async fn notify_targets(&self) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT external_id FROM subscribers WHERE notify_enabled = 1 ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// All subscribers, in registration order.
    pub async fn list_all(&self) -> StoreResult<Vec<Subscriber>> {
        let rows: Vec<SubscriberRow> = sqlx::query_as(
            "SELECT id, external_id, display_name, notify_enabled FROM subscribers ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscriber::from).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let db = test_db().await;
        let subs = db.subscribers();

        subs.register("op-1", "Alice").await.unwrap();
        subs.register("op-1", "Someone Else").await.unwrap();

        let all = subs.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        // First registration wins; the duplicate was a no-op.
        assert_eq!(all[0].display_name, "Alice");
        assert!(!all[0].notify_enabled);
    }

    #[tokio::test]
    async fn unregister_reports_removal() {
        let db = test_db().await;
        let subs = db.subscribers();

        subs.register("op-1", "Alice").await.unwrap();
        assert!(subs.unregister("op-1").await.unwrap());
        assert!(!subs.unregister("op-1").await.unwrap());
        assert!(!subs.exists("op-1").await.unwrap());
    }

    #[tokio::test]
    async fn notify_targets_follow_the_flag() {
        let db = test_db().await;
        let subs = db.subscribers();

        subs.register("op-1", "Alice").await.unwrap();
        subs.register("op-2", "Bob").await.unwrap();

        assert!(subs.notify_targets().await.unwrap().is_empty());

        subs.set_notify("op-1", true).await.unwrap();
        subs.set_notify("op-2", true).await.unwrap();
        subs.set_notify("op-2", false).await.unwrap();

        assert_eq!(subs.notify_targets().await.unwrap(), vec!["op-1".to_string()]);
    }

    #[tokio::test]
    async fn set_notify_for_unknown_identity_is_a_noop() {
        let db = test_db().await;
        let subs = db.subscribers();

        // Must not error and must not create a row.
        subs.set_notify("ghost", true).await.unwrap();
        assert!(!subs.exists("ghost").await.unwrap());
        assert!(subs.notify_targets().await.unwrap().is_empty());
    }
}
