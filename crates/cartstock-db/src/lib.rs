//! # cartstock-db: SQLite Persistence for Cartstock
//!
//! Owns the four tables of the stock tracker and every transaction that
//! touches them.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          cartstock-db                               │
//! │                                                                     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────────────┐    │
//! │  │ CatalogRepo  │  │ LedgerEngine │  │ AuditRepository         │    │
//! │  │ items +      │  │ apply_change │──│ append (same tx as the  │    │
//! │  │ barcode      │  │ one atomic   │  │ item update), reads     │    │
//! │  │ aliases      │  │ transaction  │  │                         │    │
//! │  └──────────────┘  └──────────────┘  └─────────────────────────┘    │
//! │                                                                     │
//! │  ┌──────────────────────┐  ┌─────────────────────────────────────┐  │
//! │  │ SubscriberRepository │  │ pool / migrations                   │  │
//! │  │ notify targets,      │  │ WAL, foreign keys ON, embedded SQL  │  │
//! │  │ capability check     │  │ migrations, in-memory test config   │  │
//! │  └──────────────────────┘  └─────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ledger engine performs no network I/O while its transaction is open;
//! notification fanout happens in the gateway, strictly after commit.

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use ledger::LedgerEngine;
pub use pool::{Database, DbConfig};
pub use repository::audit::AuditRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::subscriber::SubscriberRepository;
