//! Ledger engine
//!
//! Turns delivery submissions into an updated empty-bucket balance plus an
//! immutable audit record, and owns the status, seed and reset operations.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use water_ledger::{Ledger, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> water_ledger::Result<()> {
//! let ledger = Ledger::new(Arc::new(MemoryStore::new()));
//! ledger.set_initial_buckets(10).await?;
//!
//! let outcome = ledger.record_delivery(3, 2, 4).await?;
//! assert_eq!(outcome.current_empty_buckets, 11);
//! # Ok(())
//! # }
//! ```
//!
//! # Known limitations
//!
//! Every operation loads the status from the store and writes it back; there
//! is no compare-and-set. Two concurrent deliveries can both read the same
//! prior balance and one update is lost. The record is always written before
//! the status, so a crash in between leaves an orphaned record, never a
//! balance without its record.

use crate::{
    clock::{Clock, SystemClock},
    store::{read_json, write_json, KvStore},
    types::{record_key, truncate_to_millis, DeliveryRecord, InventoryStatus, STATUS_KEY},
    LedgerError, Result,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Millisecond steps tried when the natural record key is already taken
const MAX_KEY_PROBES: u32 = 1000;

/// Result of a successful delivery submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    /// The record that was persisted
    pub record: DeliveryRecord,

    /// Balance after the delivery
    pub current_empty_buckets: i64,
}

/// Delivery bookkeeping over a key-value store
pub struct Ledger {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Ledger stamping records with the wall clock
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Ledger with an explicit time source
    pub fn with_clock(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Apply one delivery.
    ///
    /// The new balance is `status + normal_water + nongfu_water -
    /// empty_buckets_taken`. Nothing is written when validation fails.
    pub async fn record_delivery(
        &self,
        normal_water: i64,
        nongfu_water: i64,
        empty_buckets_taken: i64,
    ) -> Result<DeliveryOutcome> {
        ensure_non_negative("normalWater", normal_water)?;
        ensure_non_negative("nongfuWater", nongfu_water)?;
        ensure_non_negative("emptyBuckets", empty_buckets_taken)?;

        let status = self.get_status().await?;

        let delivered = normal_water
            .checked_add(nongfu_water)
            .ok_or(LedgerError::QuantityOverflow)?;
        let on_hand = status
            .empty_buckets
            .checked_add(delivered)
            .ok_or(LedgerError::QuantityOverflow)?;
        let new_balance = on_hand
            .checked_sub(empty_buckets_taken)
            .ok_or(LedgerError::QuantityOverflow)?;

        if new_balance < 0 {
            warn!(
                balance = status.empty_buckets,
                delivered,
                requested = empty_buckets_taken,
                "Rejected delivery: not enough empty buckets"
            );
            return Err(LedgerError::InsufficientEmptyBuckets { available: on_hand });
        }

        let timestamp = self.allocate_timestamp().await?;
        let record = DeliveryRecord {
            date: timestamp.date_naive(),
            timestamp,
            normal_water,
            nongfu_water,
            total_delivered: delivered,
            empty_buckets_taken,
            remaining_empty_buckets: new_balance,
        };

        // Record first, status second
        write_json(self.store.as_ref(), &record.storage_key(), &record).await?;
        write_json(
            self.store.as_ref(),
            STATUS_KEY,
            &InventoryStatus::new(new_balance),
        )
        .await?;

        info!(
            key = %record.storage_key(),
            normal_water,
            nongfu_water,
            taken = empty_buckets_taken,
            remaining = new_balance,
            "Delivery recorded"
        );

        Ok(DeliveryOutcome {
            record,
            current_empty_buckets: new_balance,
        })
    }

    /// Persisted status, or a zero balance if none was ever written
    pub async fn get_status(&self) -> Result<InventoryStatus> {
        let status = read_json::<InventoryStatus>(self.store.as_ref(), STATUS_KEY).await?;
        Ok(status.unwrap_or_default())
    }

    /// Overwrite the balance unconditionally. Existing records are untouched.
    pub async fn set_initial_buckets(&self, empty_buckets: i64) -> Result<InventoryStatus> {
        ensure_non_negative("emptyBuckets", empty_buckets)?;

        let status = InventoryStatus::new(empty_buckets);
        write_json(self.store.as_ref(), STATUS_KEY, &status).await?;

        info!(empty_buckets, "Initial empty bucket balance set");
        Ok(status)
    }

    /// Delete every key in the store, status and records alike.
    ///
    /// Not transactional: a failure partway leaves the store partially
    /// cleared. Returns the number of keys removed.
    pub async fn clear_all(&self) -> Result<usize> {
        let keys = self.store.list_keys("").await?;
        for key in &keys {
            self.store.delete(key).await?;
        }

        info!(removed = keys.len(), "Store cleared");
        Ok(keys.len())
    }

    /// Creation instant whose record key is not yet taken
    async fn allocate_timestamp(&self) -> Result<DateTime<Utc>> {
        let natural = truncate_to_millis(self.clock.now());
        let mut candidate = natural;

        for _ in 0..MAX_KEY_PROBES {
            let key = record_key(candidate);
            if self.store.get(&key).await?.is_none() {
                if candidate != natural {
                    debug!(%key, "Record key shifted to avoid a collision");
                }
                return Ok(candidate);
            }
            candidate = candidate + Duration::milliseconds(1);
        }

        Err(LedgerError::KeyCollision(record_key(natural)))
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}

fn ensure_non_negative(field: &'static str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(LedgerError::NegativeQuantity { field, value });
    }
    Ok(())
}
