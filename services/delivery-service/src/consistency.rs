//! Read-after-write polling for record listings
//!
//! The backing store may lag behind a write. A client that has just created a
//! record passes its timestamp as `after`; the listing is re-read a bounded
//! number of times, a fixed delay apart, until that record is visible. When
//! attempts run out the last listing is returned as-is: visibility is best
//! effort, not a guarantee.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};
use water_ledger::{DateRange, DeliveryRecord, RecordLimit, RecordQuery, Result};

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(1500),
        }
    }
}

impl PollPolicy {
    pub fn new(attempts: u32, delay_ms: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            delay: Duration::from_millis(delay_ms),
        }
    }
}

/// List records, waiting for the write identified by `after` when given
pub async fn list_after_write(
    query: &RecordQuery,
    limit: RecordLimit,
    range: &DateRange,
    after: Option<DateTime<Utc>>,
    policy: PollPolicy,
) -> Result<Vec<DeliveryRecord>> {
    let token = match after {
        // A token outside the window can never show up in this listing
        Some(token) if range.contains(token) && limit.get() > 0 => token,
        _ => return query.list_records(limit, range).await,
    };

    let mut attempt = 1;
    loop {
        let records = query.list_records(limit, range).await?;

        if is_visible(&records, token) {
            if attempt > 1 {
                info!(attempt, "Record became visible after polling");
            }
            return Ok(records);
        }

        if attempt >= policy.attempts {
            warn!(
                attempts = policy.attempts,
                token = %token,
                "Record still not visible, returning stale listing"
            );
            return Ok(records);
        }

        debug!(attempt, delay = ?policy.delay, "Record not yet visible, retrying");
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}

fn is_visible(records: &[DeliveryRecord], token: DateTime<Utc>) -> bool {
    records
        .first()
        .map_or(false, |newest| newest.timestamp >= token)
}
