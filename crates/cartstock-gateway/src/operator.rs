//! # Operator Command Service
//!
//! The trusted command surface: catalog maintenance, manual stock
//! adjustments, and subscription management. The chat layer (or any other
//! front end) translates user input into these calls.
//!
//! ## Capability Check
//! Every command takes the caller's external identity and verifies it
//! against the subscriber registry before touching anything else. An
//! unregistered identity gets [`OperatorError::NotAuthorized`]; there are
//! no finer-grained roles.
//!
//! ## Store Failures
//! An unexpected store failure on any command is logged at error severity
//! and reported to notify-enabled subscribers as a diagnostic event before
//! the error reaches the caller, the same way the scan endpoint handles
//! them. The transaction is already rolled back by the time that happens.
//!
//! Stock adjustments route through the same ledger engine as terminal
//! scans, so the non-negative invariant and the audit trail hold no matter
//! which producer made the change.

use tracing::{debug, error, info};

use crate::error::OperatorError;
use crate::fanout::Fanout;
use cartstock_core::{
    validate_barcode, validate_delta, validate_initial_quantity, validate_item_name, HistoryEntry,
    ItemRecord, Outcome, Subscriber,
};
use cartstock_db::{Database, StoreResult};

/// Command service for registered operators.
#[derive(Clone)]
pub struct OperatorGateway {
    db: Database,
    fanout: Fanout,
}

impl OperatorGateway {
    /// Creates the gateway over a database handle and a fanout.
    pub fn new(db: Database, fanout: Fanout) -> Self {
        OperatorGateway { db, fanout }
    }

    /// Verifies that the caller is a registered identity.
    async fn authorize(&self, identity: &str) -> Result<(), OperatorError> {
        let registered = self
            .checked("capability check", self.db.subscribers().exists(identity).await)
            .await?;

        if registered {
            Ok(())
        } else {
            Err(OperatorError::NotAuthorized(identity.to_string()))
        }
    }

    /// Passes a store result through, reporting failures on the way.
    ///
    /// A failure is logged with its command context and fanned out to
    /// notify-enabled subscribers as a diagnostic event; the caller still
    /// sees the typed error.
    async fn checked<T>(
        &self,
        context: &'static str,
        result: StoreResult<T>,
    ) -> Result<T, OperatorError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                error!(context = context, error = %err, "Operator command failed in the store");

                match self.db.subscribers().notify_targets().await {
                    Ok(targets) => {
                        self.fanout
                            .notify_diagnostic(&format!("{} failed in the store", context), &targets)
                            .await;
                    }
                    Err(err) => error!(error = %err, "Failed to load notification targets"),
                }

                Err(OperatorError::Store(err))
            }
        }
    }

    // =========================================================================
    // Catalog commands
    // =========================================================================

    /// Creates a new item with its first barcode alias.
    pub async fn insert_item(
        &self,
        identity: &str,
        barcode: &str,
        name: &str,
        quantity: i64,
    ) -> Result<String, OperatorError> {
        self.authorize(identity).await?;
        validate_barcode(barcode)?;
        validate_item_name(name)?;
        validate_initial_quantity(quantity)?;

        let id = self
            .checked(
                "item insert",
                self.db.catalog().insert_item(barcode, name, quantity).await,
            )
            .await?;
        info!(identity = %identity, name = %name, barcode = %barcode, "Operator created item");
        Ok(id)
    }

    /// Adds another barcode alias to an existing item.
    ///
    /// Returns `false` when the barcode is already taken or the item does
    /// not exist.
    pub async fn add_alias(
        &self,
        identity: &str,
        barcode: &str,
        item_id: &str,
    ) -> Result<bool, OperatorError> {
        self.authorize(identity).await?;
        validate_barcode(barcode)?;

        let added = self
            .checked("alias insert", self.db.catalog().add_alias(barcode, item_id).await)
            .await?;
        if added {
            info!(identity = %identity, barcode = %barcode, item_id = %item_id, "Operator added alias");
        }
        Ok(added)
    }

    /// Deletes an item and all of its aliases.
    ///
    /// Returns `false` when no such item exists. History rows are kept:
    /// the audit trail outlives the catalog entry.
    pub async fn delete_item(&self, identity: &str, item_id: &str) -> Result<bool, OperatorError> {
        self.authorize(identity).await?;

        let removed = self
            .checked("item delete", self.db.catalog().delete_item(item_id).await)
            .await?;
        if removed {
            info!(identity = %identity, item_id = %item_id, "Operator deleted item");
        }
        Ok(removed)
    }

    /// Lists the full catalog with aliases, in storage order.
    pub async fn list_items(&self, identity: &str) -> Result<Vec<ItemRecord>, OperatorError> {
        self.authorize(identity).await?;
        self.checked("catalog listing", self.db.catalog().list_items().await)
            .await
    }

    /// Looks up one item by barcode.
    pub async fn find_item(
        &self,
        identity: &str,
        barcode: &str,
    ) -> Result<Option<ItemRecord>, OperatorError> {
        self.authorize(identity).await?;
        validate_barcode(barcode)?;
        self.checked("item lookup", self.db.catalog().find_by_barcode(barcode).await)
            .await
    }

    // =========================================================================
    // Stock commands
    // =========================================================================

    /// Applies a signed manual stock adjustment, keyed by barcode.
    ///
    /// The delta must be nonzero and within the manual-adjustment bound.
    /// `NotFound` and `Rejected` come back as ordinary outcomes; only an
    /// unexpected store failure is an error. Notify-enabled subscribers
    /// are told about the outcome after the change commits.
    pub async fn update_quantity(
        &self,
        identity: &str,
        barcode: &str,
        delta: i64,
    ) -> Result<Outcome, OperatorError> {
        self.authorize(identity).await?;
        validate_barcode(barcode)?;
        validate_delta(delta)?;

        debug!(identity = %identity, barcode = %barcode, delta = delta, "Operator stock adjustment");

        let outcome = self
            .checked(
                "stock adjustment",
                self.db.ledger().apply_change(barcode, delta).await,
            )
            .await?;

        // The change is committed; a fanout hiccup must not fail the command.
        match self.db.subscribers().notify_targets().await {
            Ok(targets) => self.fanout.notify(&outcome, &targets).await,
            Err(err) => error!(error = %err, "Failed to load notification targets"),
        }

        Ok(outcome)
    }

    // =========================================================================
    // Audit commands
    // =========================================================================

    /// The most recent audit entries across all items, newest first.
    pub async fn recent_history(
        &self,
        identity: &str,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, OperatorError> {
        self.authorize(identity).await?;
        self.checked("history read", self.db.audit().recent(limit).await)
            .await
    }

    /// The most recent audit entries for one barcode, newest first.
    pub async fn history_for_barcode(
        &self,
        identity: &str,
        barcode: &str,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, OperatorError> {
        self.authorize(identity).await?;
        validate_barcode(barcode)?;
        self.checked(
            "history read",
            self.db.audit().for_barcode(barcode, limit).await,
        )
        .await
    }

    // =========================================================================
    // Subscription commands
    // =========================================================================

    /// Registers a new external identity.
    ///
    /// This is the only command open to unregistered callers: it is how an
    /// identity enters the registry in the first place. Idempotent.
    pub async fn register_subscriber(
        &self,
        external_id: &str,
        display_name: &str,
    ) -> Result<(), OperatorError> {
        self.checked(
            "subscriber registration",
            self.db.subscribers().register(external_id, display_name).await,
        )
        .await?;
        info!(external_id = %external_id, "Subscriber registered");
        Ok(())
    }

    /// Removes an identity from the registry. Returns `false` when it was
    /// not registered.
    pub async fn unregister_subscriber(
        &self,
        identity: &str,
        external_id: &str,
    ) -> Result<bool, OperatorError> {
        self.authorize(identity).await?;

        let removed = self
            .checked(
                "subscriber removal",
                self.db.subscribers().unregister(external_id).await,
            )
            .await?;
        if removed {
            info!(identity = %identity, external_id = %external_id, "Subscriber unregistered");
        }
        Ok(removed)
    }

    /// Enables or disables change notifications for the caller.
    pub async fn set_notify(&self, identity: &str, enabled: bool) -> Result<(), OperatorError> {
        self.authorize(identity).await?;
        self.checked(
            "notification flag update",
            self.db.subscribers().set_notify(identity, enabled).await,
        )
        .await?;
        info!(identity = %identity, enabled = enabled, "Notification flag changed");
        Ok(())
    }

    /// All registered subscribers, in registration order.
    pub async fn list_subscribers(&self, identity: &str) -> Result<Vec<Subscriber>, OperatorError> {
        self.authorize(identity).await?;
        self.checked("subscriber listing", self.db.subscribers().list_all().await)
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::{LogSink, NotificationSink};
    use cartstock_core::ValidationError;
    use cartstock_db::DbConfig;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    async fn gateway() -> OperatorGateway {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        OperatorGateway::new(db, Fanout::new(Arc::new(LogSink)))
    }

    /// Gateway plus a sink that records every delivery.
    async fn gateway_with_recorder() -> (OperatorGateway, Database, Arc<RecordingSink>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sink = Arc::new(RecordingSink::default());
        let gw = OperatorGateway::new(db.clone(), Fanout::new(sink.clone()));
        (gw, db, sink)
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(
            &self,
            target: &str,
            message: &str,
        ) -> Result<(), crate::error::DeliveryError> {
            self.delivered
                .lock()
                .await
                .push((target.to_string(), message.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn unregistered_identity_is_rejected_everywhere() {
        let gw = gateway().await;

        assert!(matches!(
            gw.list_items("ghost").await,
            Err(OperatorError::NotAuthorized(_))
        ));
        assert!(matches!(
            gw.update_quantity("ghost", "1234567890123", -1).await,
            Err(OperatorError::NotAuthorized(_))
        ));
        assert!(matches!(
            gw.set_notify("ghost", true).await,
            Err(OperatorError::NotAuthorized(_))
        ));
    }

    #[tokio::test]
    async fn registration_opens_the_command_surface() {
        let gw = gateway().await;

        gw.register_subscriber("op-1", "Alice").await.unwrap();
        assert!(gw.list_items("op-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn catalog_round_trip() {
        let gw = gateway().await;
        gw.register_subscriber("op-1", "Alice").await.unwrap();

        let id = gw
            .insert_item("op-1", "1234567890123", "TL-420", 5)
            .await
            .unwrap();

        assert!(gw.add_alias("op-1", "9999999999999", &id).await.unwrap());

        let item = gw
            .find_item("op-1", "9999999999999")
            .await
            .unwrap()
            .expect("alias should resolve");
        assert_eq!(item.name, "TL-420");
        assert_eq!(item.aliases.len(), 2);

        assert!(gw.delete_item("op-1", &id).await.unwrap());
        assert!(gw.list_items("op-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn adjustment_validation_runs_before_the_store() {
        let gw = gateway().await;
        gw.register_subscriber("op-1", "Alice").await.unwrap();

        // Zero delta is never a valid adjustment.
        assert!(matches!(
            gw.update_quantity("op-1", "1234567890123", 0).await,
            Err(OperatorError::Validation(ValidationError::ZeroDelta))
        ));

        // Magnitude over the manual bound.
        assert!(matches!(
            gw.update_quantity("op-1", "1234567890123", 16).await,
            Err(OperatorError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // Malformed barcode.
        assert!(matches!(
            gw.update_quantity("op-1", "12345", -1).await,
            Err(OperatorError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }

    #[tokio::test]
    async fn adjustment_notifies_enabled_subscribers() {
        let (gw, _db, sink) = gateway_with_recorder().await;

        gw.register_subscriber("op-1", "Alice").await.unwrap();
        gw.register_subscriber("op-2", "Bob").await.unwrap();
        gw.set_notify("op-2", true).await.unwrap();

        gw.insert_item("op-1", "1234567890123", "TL-420", 5)
            .await
            .unwrap();

        let outcome = gw
            .update_quantity("op-1", "1234567890123", -2)
            .await
            .unwrap();
        assert!(outcome.is_applied());

        // Only the notify-enabled subscriber heard about it.
        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "op-2");
        assert_eq!(delivered[0].1, "TL-420: balance now 3");
    }

    #[tokio::test]
    async fn store_failures_are_reported_as_diagnostics() {
        let (gw, db, sink) = gateway_with_recorder().await;

        gw.register_subscriber("op-1", "Alice").await.unwrap();
        gw.set_notify("op-1", true).await.unwrap();
        gw.insert_item("op-1", "1234567890123", "TL-420", 5)
            .await
            .unwrap();

        // Break the audit table so the ledger transaction fails mid-flight.
        sqlx::query("DROP TABLE history")
            .execute(db.pool())
            .await
            .unwrap();

        let err = gw
            .update_quantity("op-1", "1234567890123", -1)
            .await
            .unwrap_err();
        assert!(matches!(err, OperatorError::Store(_)));

        // Rolled back in full: the quantity is untouched.
        let item = db
            .catalog()
            .find_by_barcode("1234567890123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 5);

        // Subscribers heard a diagnostic, not a fabricated outcome.
        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "op-1");
        assert_eq!(
            delivered[0].1,
            "diagnostic: stock adjustment failed in the store"
        );
    }

    #[tokio::test]
    async fn adjustment_outcomes_pass_through() {
        let gw = gateway().await;
        gw.register_subscriber("op-1", "Alice").await.unwrap();
        gw.insert_item("op-1", "1234567890123", "TL-420", 1)
            .await
            .unwrap();

        assert!(matches!(
            gw.update_quantity("op-1", "0000000000000", -1).await.unwrap(),
            Outcome::NotFound { .. }
        ));
        assert!(matches!(
            gw.update_quantity("op-1", "1234567890123", -5).await.unwrap(),
            Outcome::Rejected { .. }
        ));
    }

    #[tokio::test]
    async fn history_views_are_scoped() {
        let gw = gateway().await;
        gw.register_subscriber("op-1", "Alice").await.unwrap();
        gw.insert_item("op-1", "1234567890123", "TL-420", 5)
            .await
            .unwrap();
        gw.insert_item("op-1", "6938639800012", "CF217A", 5)
            .await
            .unwrap();

        gw.update_quantity("op-1", "1234567890123", -1).await.unwrap();
        gw.update_quantity("op-1", "6938639800012", 2).await.unwrap();

        let recent = gw.recent_history("op-1", 10).await.unwrap();
        assert_eq!(recent.len(), 2);

        let scoped = gw
            .history_for_barcode("op-1", "1234567890123", 10)
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].resulting_balance, 4);
    }

    #[tokio::test]
    async fn subscriber_lifecycle() {
        let gw = gateway().await;
        gw.register_subscriber("op-1", "Alice").await.unwrap();
        gw.register_subscriber("op-2", "Bob").await.unwrap();

        assert_eq!(gw.list_subscribers("op-1").await.unwrap().len(), 2);

        assert!(gw.unregister_subscriber("op-1", "op-2").await.unwrap());
        assert!(!gw.unregister_subscriber("op-1", "op-2").await.unwrap());

        // Removed identity loses the command surface.
        assert!(matches!(
            gw.list_items("op-2").await,
            Err(OperatorError::NotAuthorized(_))
        ));
    }

    #[tokio::test]
    async fn invalid_item_input_is_rejected() {
        let gw = gateway().await;
        gw.register_subscriber("op-1", "Alice").await.unwrap();

        assert!(matches!(
            gw.insert_item("op-1", "1234567890123", "", 5).await,
            Err(OperatorError::Validation(ValidationError::Required { .. }))
        ));
        assert!(matches!(
            gw.insert_item("op-1", "1234567890123", "TL-420", -1).await,
            Err(OperatorError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }
}
