//! Repository implementations, one per owned table group.
//!
//! - [`catalog`] - items and their barcode aliases
//! - [`audit`] - the append-only change history
//! - [`subscriber`] - notification subscribers

pub mod audit;
pub mod catalog;
pub mod subscriber;
