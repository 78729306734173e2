//! Record query service
//!
//! Lists delivery records newest first. Order comes from sorting the record
//! keys in descending lexicographic order, which is chronological only because
//! the key suffix is a fixed-width UTC timestamp (see [`crate::types::record_key`]).
//!
//! Every call re-reads the store; nothing is cached, so a listing issued right
//! after a write may not include it on an eventually consistent backend.

use crate::{
    store::{read_json, KvStore},
    types::{decode_record_key, DateRange, DeliveryRecord, RecordLimit, RECORD_KEY_PREFIX},
    Result,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read side over persisted delivery records
pub struct RecordQuery {
    store: Arc<dyn KvStore>,
}

impl RecordQuery {
    /// Query service over `store`
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Up to `limit` records inside `range`, newest first.
    ///
    /// The range is checked against the timestamp encoded in each key, so
    /// only matching records are fetched and the limit counts matches.
    pub async fn list_records(
        &self,
        limit: RecordLimit,
        range: &DateRange,
    ) -> Result<Vec<DeliveryRecord>> {
        let mut keys = self.store.list_keys(RECORD_KEY_PREFIX).await?;
        keys.sort_unstable_by(|a, b| b.cmp(a));

        let mut records = Vec::with_capacity(limit.get().min(keys.len()));
        for key in keys {
            if records.len() >= limit.get() {
                break;
            }

            if !range.is_unbounded() {
                match decode_record_key(&key) {
                    Some(timestamp) if range.contains(timestamp) => {}
                    Some(_) => continue,
                    None => {
                        warn!(%key, "Skipping record with undecodable key");
                        continue;
                    }
                }
            }

            match read_json::<DeliveryRecord>(self.store.as_ref(), &key).await? {
                Some(record) => records.push(record),
                None => debug!(%key, "Record listed but not readable"),
            }
        }

        debug!(count = records.len(), %limit, "Listed delivery records");
        Ok(records)
    }
}

impl fmt::Debug for RecordQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordQuery").finish_non_exhaustive()
    }
}
