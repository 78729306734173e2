//! Water delivery ledger core
//!
//! Tracks bottled-water deliveries and the running count of empty buckets
//! owed back to the supplier, on top of an opaque key-value store.
//!
//! # Architecture
//!
//! - **Ledger**: turns a delivery into a new balance plus an immutable record
//! - **RecordQuery**: lists records newest first, with a limit and date range
//! - **KvStore**: pluggable storage (in-memory here, Redis in the service)
//!
//! # Invariants
//!
//! - The balance never goes negative; a delivery that would do so is rejected whole
//! - A record's `remainingEmptyBuckets` is the balance right after it was applied
//! - Records are append-only, keyed uniquely by their millisecond timestamp

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod store;
pub mod clock;
pub mod ledger;
pub mod query;
pub mod error;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LedgerError, Result};
pub use ledger::{DeliveryOutcome, Ledger};
pub use query::RecordQuery;
pub use store::{KvStore, MemoryStore};
pub use types::{DateRange, DeliveryRecord, InventoryStatus, RecordLimit};
