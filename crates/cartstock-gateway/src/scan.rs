//! # Scan Endpoint
//!
//! `POST /scan`: the single HTTP surface the handheld terminals speak to.
//! The request body is an encrypted JSON payload; every response body is
//! encrypted with the same pre-shared key, so the channel stays opaque in
//! both directions.
//!
//! ## Status Codes
//! ```text
//! 200  change applied
//! 400  decrypted payload is malformed (bad JSON, bad barcode, bad action)
//! 403  body failed to decrypt: wrong key, tampering, or bad framing
//! 404  barcode resolves to no item
//! 409  change would drive the stock negative
//! 500  unexpected store failure (transaction rolled back)
//! ```
//!
//! A 403 is a transport failure and stops at the codec: the ledger never
//! sees the request and nothing is logged as an inventory event.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::codec::ScanCodec;
use crate::fanout::{render_outcome, Fanout};
use cartstock_core::{validate_barcode, Outcome};
use cartstock_db::{LedgerEngine, SubscriberRepository};

/// Quantity change of a single scan event.
const SCAN_DELTA: i64 = 1;

/// Shared state for the scan endpoint.
#[derive(Clone)]
pub struct ScanState {
    pub codec: ScanCodec,
    pub ledger: LedgerEngine,
    pub subscribers: SubscriberRepository,
    pub fanout: Fanout,
}

/// Builds the router exposing `POST /scan`.
pub fn scan_router(state: Arc<ScanState>) -> Router {
    Router::new().route("/scan", post(handle_scan)).with_state(state)
}

/// Payload carried inside the encrypted body.
#[derive(Debug, Deserialize)]
struct ScanPayload {
    barcode: String,
    action: String,
}

/// The two actions a terminal can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanAction {
    /// Cartridge added to stock.
    Add,
    /// Cartridge taken out of stock ("red" is the firmware's removal tag).
    Remove,
}

impl ScanAction {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "add" => Some(ScanAction::Add),
            "red" => Some(ScanAction::Remove),
            _ => None,
        }
    }

    fn delta(self) -> i64 {
        match self {
            ScanAction::Add => SCAN_DELTA,
            ScanAction::Remove => -SCAN_DELTA,
        }
    }
}

async fn handle_scan(State(state): State<Arc<ScanState>>, body: String) -> (StatusCode, String) {
    process_scan(&state, &body).await
}

/// Handles one scan request body and produces the encrypted response.
///
/// Split from the axum handler so tests can drive it without a socket.
pub(crate) async fn process_scan(state: &ScanState, body: &str) -> (StatusCode, String) {
    let plaintext = match state.codec.decrypt(body) {
        Ok(plaintext) => plaintext,
        Err(err) => {
            warn!(error = %err, "Scan request failed to decrypt");
            return reply(state, StatusCode::FORBIDDEN, "authentication failed");
        }
    };

    let payload: ScanPayload = match serde_json::from_slice(&plaintext) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "Scan payload is not valid JSON");
            return reply(state, StatusCode::BAD_REQUEST, "malformed payload");
        }
    };

    if let Err(err) = validate_barcode(&payload.barcode) {
        warn!(error = %err, "Scan payload carries an invalid barcode");
        return reply(state, StatusCode::BAD_REQUEST, "malformed payload");
    }

    let Some(action) = ScanAction::parse(&payload.action) else {
        warn!(action = %payload.action, "Scan payload carries an unknown action");
        return reply(state, StatusCode::BAD_REQUEST, "malformed payload");
    };

    let outcome = match state.ledger.apply_change(&payload.barcode, action.delta()).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, barcode = %payload.barcode, "Scan failed in the store");
            notify_diagnostic(state, "scan update failed in the store").await;
            return reply(
                state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal storage error",
            );
        }
    };

    // Fanout runs strictly after the ledger transaction committed.
    notify_outcome(state, &outcome).await;

    let status = match &outcome {
        Outcome::Applied { .. } => StatusCode::OK,
        Outcome::NotFound { .. } => StatusCode::NOT_FOUND,
        Outcome::Rejected { .. } => StatusCode::CONFLICT,
    };

    reply(state, status, &render_outcome(&outcome))
}

fn reply(state: &ScanState, status: StatusCode, message: &str) -> (StatusCode, String) {
    (status, state.codec.encrypt(message.as_bytes()))
}

async fn notify_outcome(state: &ScanState, outcome: &Outcome) {
    match state.subscribers.notify_targets().await {
        Ok(targets) => state.fanout.notify(outcome, &targets).await,
        Err(err) => error!(error = %err, "Failed to load notification targets"),
    }
}

async fn notify_diagnostic(state: &ScanState, detail: &str) {
    match state.subscribers.notify_targets().await {
        Ok(targets) => state.fanout.notify_diagnostic(detail, &targets).await,
        Err(err) => error!(error = %err, "Failed to load notification targets"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::fanout::NotificationSink;
    use async_trait::async_trait;
    use cartstock_db::{Database, DbConfig};
    use tokio::sync::Mutex;

    const KEY: [u8; 16] = *b"0123456789abcdef";

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, target: &str, message: &str) -> Result<(), DeliveryError> {
            self.delivered
                .lock()
                .await
                .push((target.to_string(), message.to_string()));
            Ok(())
        }
    }

    async fn scan_state() -> (ScanState, Database, Arc<RecordingSink>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sink = Arc::new(RecordingSink::default());
        let state = ScanState {
            codec: ScanCodec::new(KEY),
            ledger: db.ledger(),
            subscribers: db.subscribers(),
            fanout: Fanout::new(sink.clone()),
        };
        (state, db, sink)
    }

    fn scan_body(codec: &ScanCodec, barcode: &str, action: &str) -> String {
        let payload = format!(r#"{{"barcode": "{}", "action": "{}"}}"#, barcode, action);
        codec.encrypt(payload.as_bytes())
    }

    fn decrypt_reply(codec: &ScanCodec, body: &str) -> String {
        String::from_utf8(codec.decrypt(body).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn applied_scan_returns_200_with_the_new_balance() {
        let (state, db, _) = scan_state().await;
        db.catalog()
            .insert_item("1234567890123", "TL-420", 5)
            .await
            .unwrap();

        let body = scan_body(&state.codec, "1234567890123", "red");
        let (status, reply) = process_scan(&state, &body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(decrypt_reply(&state.codec, &reply), "TL-420: balance now 4");
    }

    #[tokio::test]
    async fn add_scan_increments() {
        let (state, db, _) = scan_state().await;
        db.catalog()
            .insert_item("1234567890123", "TL-420", 0)
            .await
            .unwrap();

        let body = scan_body(&state.codec, "1234567890123", "add");
        let (status, reply) = process_scan(&state, &body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(decrypt_reply(&state.codec, &reply), "TL-420: balance now 1");
    }

    #[tokio::test]
    async fn undecryptable_body_returns_403_and_touches_nothing() {
        let (state, db, _) = scan_state().await;
        db.catalog()
            .insert_item("1234567890123", "TL-420", 5)
            .await
            .unwrap();

        // Valid ciphertext under the wrong key.
        let other = ScanCodec::new(*b"fedcba9876543210");
        let body = scan_body(&other, "1234567890123", "red");
        let (status, reply) = process_scan(&state, &body).await;

        if status != StatusCode::FORBIDDEN {
            // A wrong key can decrypt to valid padding by chance; the
            // resulting garbage then fails JSON parsing instead.
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        assert!(state.codec.decrypt(&reply).is_ok());

        // No inventory event and no audit row either way.
        let item = db
            .catalog()
            .find_by_barcode("1234567890123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 5);
        assert_eq!(db.audit().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn garbage_body_returns_403() {
        let (state, _db, _) = scan_state().await;

        let (status, reply) = process_scan(&state, "not even base64 !!!").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(decrypt_reply(&state.codec, &reply), "authentication failed");
    }

    #[tokio::test]
    async fn malformed_payload_returns_400() {
        let (state, _db, _) = scan_state().await;

        // Well-encrypted, but not the expected JSON shape.
        let body = state.codec.encrypt(b"{\"unexpected\": true}");
        let (status, reply) = process_scan(&state, &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(decrypt_reply(&state.codec, &reply), "malformed payload");

        // Valid shape, invalid barcode.
        let body = scan_body(&state.codec, "12345", "add");
        let (status, _) = process_scan(&state, &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Valid shape, unknown action.
        let body = scan_body(&state.codec, "1234567890123", "toggle");
        let (status, _) = process_scan(&state, &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_barcode_returns_404() {
        let (state, _db, _) = scan_state().await;

        let body = scan_body(&state.codec, "0000000000000", "red");
        let (status, reply) = process_scan(&state, &body).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            decrypt_reply(&state.codec, &reply),
            "no item for barcode 0000000000000"
        );
    }

    #[tokio::test]
    async fn exhausted_stock_returns_409_and_stays_at_zero() {
        let (state, db, _) = scan_state().await;
        db.catalog()
            .insert_item("1234567890123", "TL-420", 0)
            .await
            .unwrap();

        let body = scan_body(&state.codec, "1234567890123", "red");
        let (status, reply) = process_scan(&state, &body).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            decrypt_reply(&state.codec, &reply),
            "TL-420: change rejected, not enough stock"
        );

        let item = db
            .catalog()
            .find_by_barcode("1234567890123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 0);
    }

    #[tokio::test]
    async fn scan_outcomes_fan_out_to_enabled_subscribers() {
        let (state, db, sink) = scan_state().await;
        db.catalog()
            .insert_item("1234567890123", "TL-420", 5)
            .await
            .unwrap();
        db.subscribers().register("op-1", "Alice").await.unwrap();
        db.subscribers().set_notify("op-1", true).await.unwrap();

        let body = scan_body(&state.codec, "1234567890123", "red");
        process_scan(&state, &body).await;

        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "op-1");
        assert_eq!(delivered[0].1, "TL-420: balance now 4");
    }

    #[tokio::test]
    async fn transport_failures_do_not_fan_out() {
        let (state, db, sink) = scan_state().await;
        db.subscribers().register("op-1", "Alice").await.unwrap();
        db.subscribers().set_notify("op-1", true).await.unwrap();

        process_scan(&state, "garbage").await;
        assert!(sink.delivered.lock().await.is_empty());
    }
}
