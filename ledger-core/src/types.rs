//! Core types for the bucket ledger
//!
//! All persisted types are JSON documents with camelCase field names, and
//! every timestamp is UTC with millisecond precision so that the storage key
//! derived from it sorts in creation order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key of the singleton inventory status
pub const STATUS_KEY: &str = "current_status";

/// Prefix shared by every delivery record key
pub const RECORD_KEY_PREFIX: &str = "delivery_";

/// Key suffix layout: the ISO-8601 timestamp with `:` and `.` replaced by `_`.
/// Fixed width, so lexicographic order == chronological order.
const RECORD_KEY_FORMAT: &str = "%Y-%m-%dT%H_%M_%S_%3fZ";

/// Current count of empty buckets owed back to the supplier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStatus {
    /// Running balance after every applied delivery
    pub empty_buckets: i64,
}

impl InventoryStatus {
    /// Status holding the given balance
    pub fn new(empty_buckets: i64) -> Self {
        Self { empty_buckets }
    }
}

/// Immutable log entry of one delivery and the balance it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    /// UTC calendar date of `timestamp`
    pub date: NaiveDate,

    /// Creation instant; also the storage key suffix
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,

    /// Units of regular water delivered
    pub normal_water: i64,

    /// Units of Nongfu water delivered
    pub nongfu_water: i64,

    /// `normal_water + nongfu_water`
    pub total_delivered: i64,

    /// Empties collected from the customer
    pub empty_buckets_taken: i64,

    /// Balance immediately after this record was applied
    pub remaining_empty_buckets: i64,
}

impl DeliveryRecord {
    /// Storage key for this record
    pub fn storage_key(&self) -> String {
        record_key(self.timestamp)
    }
}

/// Inclusive calendar-date window over record timestamps.
///
/// `start` covers from `00:00:00` and `end` up to `23:59:59` of the given
/// day; an absent bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included
    pub start: Option<NaiveDate>,

    /// Last day included
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Range with no bounds at all
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Range between two optional days
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// True when neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether `timestamp` falls inside the range
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let at = timestamp.naive_utc();

        if let Some(start) = self.start.and_then(|day| day.and_hms_opt(0, 0, 0)) {
            if at < start {
                return false;
            }
        }

        if let Some(end) = self.end.and_then(|day| day.and_hms_opt(23, 59, 59)) {
            if at > end {
                return false;
            }
        }

        true
    }
}

/// Maximum number of records returned by one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLimit(usize);

impl RecordLimit {
    /// Limit used when the caller gives none
    pub const DEFAULT: usize = 50;

    /// Explicit limit
    pub fn new(limit: usize) -> Self {
        Self(limit)
    }

    /// Parse a raw query value.
    ///
    /// Only the leading integer counts (`"10abc"` is 10, `"5.7"` is 5).
    /// Absent, unparsable or zero values fall back to `default`; negative
    /// values yield an empty listing.
    pub fn parse(raw: Option<&str>, default: usize) -> Self {
        match raw.and_then(leading_integer) {
            None | Some(0) => Self(default),
            Some(n) if n < 0 => Self(0),
            Some(n) => Self(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    /// The limit as a count
    pub fn get(&self) -> usize {
        self.0
    }
}

/// Signed integer at the start of `raw`, saturating on overflow
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let sign_len = usize::from(raw.starts_with(|c| c == '+' || c == '-'));
    let digits = raw[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }

    let number = &raw[..sign_len + digits];
    match number.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) if number.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

impl Default for RecordLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for RecordLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Drop everything below the millisecond
pub fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(3)
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Storage key of the record created at `timestamp`
pub fn record_key(timestamp: DateTime<Utc>) -> String {
    format!("{}{}", RECORD_KEY_PREFIX, timestamp.format(RECORD_KEY_FORMAT))
}

/// Recover the creation instant from a record key
pub fn decode_record_key(key: &str) -> Option<DateTime<Utc>> {
    let suffix = key.strip_prefix(RECORD_KEY_PREFIX)?;
    let naive = NaiveDateTime::parse_from_str(suffix, RECORD_KEY_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Serde adapter for fixed-width millisecond timestamps
pub mod iso_millis {
    use super::format_timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `YYYY-MM-DDTHH:MM:SS.mmmZ`
    pub fn serialize<S: Serializer>(timestamp: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(*timestamp))
    }

    /// Accept any RFC 3339 timestamp
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_record_key_layout() {
        let key = record_key(at("2024-05-01T08:30:00.123Z"));
        assert_eq!(key, "delivery_2024-05-01T08_30_00_123Z");
        assert_eq!(decode_record_key(&key), Some(at("2024-05-01T08:30:00.123Z")));
    }

    #[test]
    fn test_record_key_rejects_foreign_keys() {
        assert_eq!(decode_record_key("current_status"), None);
        assert_eq!(decode_record_key("delivery_garbage"), None);
    }

    #[test]
    fn test_record_keys_sort_chronologically() {
        let earlier = record_key(at("2024-05-01T09:59:59.999Z"));
        let later = record_key(at("2024-05-01T10:00:00.000Z"));
        let next_year = record_key(at("2025-01-01T00:00:00.000Z"));
        assert!(earlier < later);
        assert!(later < next_year);
    }

    #[test]
    fn test_timestamp_is_fixed_width() {
        assert_eq!(
            format_timestamp(at("2024-05-01T08:30:00Z")),
            "2024-05-01T08:30:00.000Z"
        );
        let truncated = truncate_to_millis(at("2024-05-01T08:30:00.123456789Z"));
        assert_eq!(format_timestamp(truncated), "2024-05-01T08:30:00.123Z");
    }

    #[test]
    fn test_record_json_shape() {
        let timestamp = at("2024-05-01T08:30:00.123Z");
        let record = DeliveryRecord {
            date: timestamp.date_naive(),
            timestamp,
            normal_water: 3,
            nongfu_water: 2,
            total_delivered: 5,
            empty_buckets_taken: 4,
            remaining_empty_buckets: 11,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2024-05-01");
        assert_eq!(json["timestamp"], "2024-05-01T08:30:00.123Z");
        assert_eq!(json["totalDelivered"], 5);
        assert_eq!(json["emptyBucketsTaken"], 4);
        assert_eq!(json["remainingEmptyBuckets"], 11);

        let back: DeliveryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let range = DateRange::new(Some(day("2024-05-01")), Some(day("2024-05-03")));
        assert!(range.contains(at("2024-05-01T00:00:00.000Z")));
        assert!(range.contains(at("2024-05-03T23:59:59.000Z")));
        assert!(!range.contains(at("2024-04-30T23:59:59.999Z")));
        assert!(!range.contains(at("2024-05-03T23:59:59.500Z")));
        assert!(!range.contains(at("2024-05-04T00:00:00.000Z")));
    }

    #[test]
    fn test_date_range_open_ends() {
        let from = DateRange::new(Some(day("2024-05-01")), None);
        assert!(from.contains(at("2099-01-01T00:00:00Z")));
        assert!(!from.contains(at("2024-04-30T12:00:00Z")));

        let until = DateRange::new(None, Some(day("2024-05-01")));
        assert!(until.contains(at("2000-01-01T00:00:00Z")));

        assert!(DateRange::unbounded().is_unbounded());
        assert!(DateRange::unbounded().contains(at("2024-05-01T12:00:00Z")));
    }

    #[test]
    fn test_record_limit_parsing() {
        assert_eq!(RecordLimit::parse(None, 50).get(), 50);
        assert_eq!(RecordLimit::parse(Some("abc"), 50).get(), 50);
        assert_eq!(RecordLimit::parse(Some("0"), 50).get(), 50);
        assert_eq!(RecordLimit::parse(Some("-3"), 50).get(), 0);
        assert_eq!(RecordLimit::parse(Some(" 20 "), 50).get(), 20);
        assert_eq!(RecordLimit::parse(Some("+7"), 50).get(), 7);
        assert_eq!(RecordLimit::parse(Some("-"), 50).get(), 50);
    }

    #[test]
    fn test_record_limit_takes_leading_digits() {
        assert_eq!(RecordLimit::parse(Some("10abc"), 50).get(), 10);
        assert_eq!(RecordLimit::parse(Some("5.7"), 50).get(), 5);
        assert_eq!(RecordLimit::parse(Some("-2px"), 50).get(), 0);
        assert_eq!(RecordLimit::parse(Some("0.9"), 50).get(), 50);
        assert_eq!(RecordLimit::parse(Some("abc10"), 50).get(), 50);
        assert_eq!(
            RecordLimit::parse(Some("99999999999999999999999"), 50).get(),
            usize::try_from(i64::MAX).unwrap_or(usize::MAX)
        );
        assert_eq!(RecordLimit::default().get(), RecordLimit::DEFAULT);
    }
}
