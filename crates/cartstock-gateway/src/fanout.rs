//! # Notification Fanout
//!
//! Delivers a ledger outcome to every notify-enabled subscriber. Runs
//! strictly after the ledger transaction commits, over a resource that is
//! independent of the store.
//!
//! Delivery failures are isolated per recipient: a failed attempt is
//! logged and skipped. There are no retries, and nothing here can reverse
//! the ledger mutation that produced the outcome.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::DeliveryError;
use cartstock_core::Outcome;

/// Delivery seam for the external messaging surface.
///
/// The chat layer implements this; the fanout only knows "one attempt per
/// target".
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Attempts one delivery of `message` to `target`.
    async fn deliver(&self, target: &str, message: &str) -> Result<(), DeliveryError>;
}

/// Sink that writes deliveries to the log.
///
/// Used when no messaging surface is wired up (standalone server runs);
/// also handy for smoke-testing a deployment.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, target: &str, message: &str) -> Result<(), DeliveryError> {
        info!(target = %target, message = %message, "Notification");
        Ok(())
    }
}

/// Fanout over the subscriber targets.
#[derive(Clone)]
pub struct Fanout {
    sink: Arc<dyn NotificationSink>,
}

impl Fanout {
    /// Creates a fanout over the given sink.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Fanout { sink }
    }

    /// Delivers a rendering of `outcome` to each target, independently.
    pub async fn notify(&self, outcome: &Outcome, targets: &[String]) {
        let message = render_outcome(outcome);
        self.deliver_all(&message, targets).await;
    }

    /// Delivers a diagnostic message, distinct from any ledger outcome.
    ///
    /// Used for unexpected store failures so subscribers learn that an
    /// operation failed without a fabricated outcome.
    pub async fn notify_diagnostic(&self, detail: &str, targets: &[String]) {
        let message = format!("diagnostic: {}", detail);
        self.deliver_all(&message, targets).await;
    }

    async fn deliver_all(&self, message: &str, targets: &[String]) {
        debug!(targets = targets.len(), "Fanning out notification");

        for target in targets {
            if let Err(err) = self.sink.deliver(target, message).await {
                // Recorded and skipped; remaining targets still get their
                // delivery and the ledger state is already committed.
                warn!(target = %target, error = %err, "Notification delivery failed");
            }
        }
    }
}

/// Renders an outcome for subscribers.
pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Applied {
            name, new_balance, ..
        } => format!("{}: balance now {}", name, new_balance),
        Outcome::NotFound { barcode } => format!("no item for barcode {}", barcode),
        Outcome::Rejected { name } => format!("{}: change rejected, not enough stock", name),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
