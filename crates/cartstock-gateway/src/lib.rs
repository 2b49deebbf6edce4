//! # cartstock-gateway: External Boundaries for Cartstock
//!
//! Two independent producers mutate stock, and both enter through this
//! crate:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       cartstock-gateway                             │
//! │                                                                     │
//! │  Handheld terminal                    Operator (chat layer)         │
//! │       │ encrypted POST /scan               │ typed commands         │
//! │       ▼                                    ▼                        │
//! │  ┌──────────┐   ┌──────────┐        ┌─────────────────┐             │
//! │  │ codec    │──►│ scan     │        │ operator        │             │
//! │  │ AES-CBC  │   │ endpoint │        │ command service │             │
//! │  │ base64   │   │ (axum)   │        │ + capability    │             │
//! │  └──────────┘   └────┬─────┘        │   check         │             │
//! │                      │              └────────┬────────┘             │
//! │                      ▼                       ▼                      │
//! │              cartstock-db (ledger engine, one transaction)          │
//! │                      │                                              │
//! │                      ▼  strictly after commit                       │
//! │               ┌────────────┐                                        │
//! │               │  fanout    │──► one delivery attempt per target     │
//! │               └────────────┘                                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport failures (bad key, corrupted ciphertext) stop at the codec;
//! they are never inventory events and never reach the ledger.

pub mod codec;
pub mod error;
pub mod fanout;
pub mod operator;
pub mod scan;

pub use codec::ScanCodec;
pub use error::{CodecError, DeliveryError, OperatorError};
pub use fanout::{Fanout, LogSink, NotificationSink};
pub use operator::OperatorGateway;
pub use scan::{scan_router, ScanState};
