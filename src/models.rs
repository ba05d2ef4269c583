//! Core Data Models
//!
//! This module defines the data structures that flow through the site metrics
//! pipeline, from decoded input events to the per-site report rows.
//!
//! ## Data Flow
//!
//! 1. **Raw Data**: [`Event`] - One decoded line of the input file
//! 2. **Aggregation**: [`OperatorLogEntry`], [`OnlineInterval`] - Per-site operator timeline
//! 3. **Output**: [`MessageCounts`], [`SiteReport`] - Derived metrics for the report
//!
//! ## Timestamps
//!
//! Timestamps are opaque numeric keys. [`Timestamp`] keeps JSON integers as
//! exact integers and only falls back to `f64` for numbers written with a
//! fraction or exponent, so distinct integer keys never collapse. Integers and
//! floats compare exactly against each other. No time zone or calendar meaning
//! is attached to a timestamp.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Totally ordered event timestamp.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(try_from = "serde_json::Number")]
pub struct Timestamp(Repr);

#[derive(Debug, Clone, Copy)]
enum Repr {
    Int(i128),
    Float(f64),
}

impl Timestamp {
    /// Sentinel that sorts before every real timestamp.
    pub const BASELINE: Timestamp = Timestamp(Repr::Float(f64::NEG_INFINITY));
    /// Sentinel that sorts after every real timestamp.
    pub const END_OF_TIME: Timestamp = Timestamp(Repr::Float(f64::INFINITY));

    pub fn from_float(value: f64) -> Self {
        // -0.0 and 0.0 must compare equal under total_cmp
        if value == 0.0 {
            Self(Repr::Float(0.0))
        } else {
            Self(Repr::Float(value))
        }
    }

    pub fn from_int(value: i128) -> Self {
        Self(Repr::Int(value))
    }
}

impl TryFrom<serde_json::Number> for Timestamp {
    type Error = String;

    fn try_from(number: serde_json::Number) -> Result<Self, Self::Error> {
        if let Some(value) = number.as_i64() {
            Ok(Self::from_int(i128::from(value)))
        } else if let Some(value) = number.as_u64() {
            Ok(Self::from_int(i128::from(value)))
        } else if let Some(value) = number.as_f64() {
            Ok(Self::from_float(value))
        } else {
            Err(format!("timestamp {} is not representable", number))
        }
    }
}

impl From<f64> for Timestamp {
    fn from(value: f64) -> Self {
        Self::from_float(value)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self::from_int(i128::from(value))
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self::from_int(i128::from(value))
    }
}

impl From<i32> for Timestamp {
    fn from(value: i32) -> Self {
        Self::from_int(i128::from(value))
    }
}

/// Exact comparison of an integer against a float.
fn cmp_int_float(int: i128, float: f64) -> Ordering {
    if float.is_nan() {
        // total_cmp places positive NaN above +inf and negative NaN below -inf
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }

    let floor = float.floor();
    // 2^127; beyond it the float is outside i128 range (or infinite)
    const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    if floor >= LIMIT {
        return Ordering::Less;
    }
    if floor < -LIMIT {
        return Ordering::Greater;
    }

    // floor is an integer inside i128 range, so the cast is exact
    match int.cmp(&(floor as i128)) {
        Ordering::Equal if float > floor => Ordering::Less,
        ordering => ordering,
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (Repr::Int(a), Repr::Int(b)) => a.cmp(&b),
            (Repr::Float(a), Repr::Float(b)) => a.total_cmp(&b),
            (Repr::Int(a), Repr::Float(b)) => cmp_int_float(a, b),
            (Repr::Float(a), Repr::Int(b)) => cmp_int_float(b, a).reverse(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::Int(value) => write!(f, "{}", value),
            Repr::Float(value) => write!(f, "{}", value),
        }
    }
}

/// A decoded input record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub site_id: String,
    pub from: String,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Message { message: String },
    Status { status: StatusChange },
    /// A `type` other than `message` or `status`.
    Unrecognized { kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Online,
    Offline,
    Unrecognized(String),
}

impl From<&str> for StatusChange {
    fn from(status: &str) -> Self {
        match status {
            "online" => StatusChange::Online,
            "offline" => StatusChange::Offline,
            other => StatusChange::Unrecognized(other.to_string()),
        }
    }
}

impl Event {
    pub fn message(
        id: impl Into<String>,
        site_id: impl Into<String>,
        from: impl Into<String>,
        timestamp: impl Into<Timestamp>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            site_id: site_id.into(),
            from: from.into(),
            timestamp: timestamp.into(),
            payload: EventPayload::Message {
                message: message.into(),
            },
        }
    }

    pub fn status(
        id: impl Into<String>,
        site_id: impl Into<String>,
        from: impl Into<String>,
        timestamp: impl Into<Timestamp>,
        status: &str,
    ) -> Self {
        Self {
            id: id.into(),
            site_id: site_id.into(),
            from: from.into(),
            timestamp: timestamp.into(),
            payload: EventPayload::Status {
                status: StatusChange::from(status),
            },
        }
    }

    pub fn kind(&self) -> &str {
        match &self.payload {
            EventPayload::Message { .. } => "message",
            EventPayload::Status { .. } => "status",
            EventPayload::Unrecognized { kind } => kind,
        }
    }
}

/// One entry of a site's operator log, keyed by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorLogEntry {
    /// No change; only the baseline uses this.
    Pass,
    Online(String),
    Offline(String),
}

/// Half-open span `[start, end)` with a constant number of online operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnlineInterval {
    pub start: Timestamp,
    pub end: Timestamp,
    pub online_operators: usize,
}

impl OnlineInterval {
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn is_staffed(&self) -> bool {
        self.online_operators > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageCounts {
    /// Messages that arrived while at least one operator was online.
    pub chat: u64,
    /// Messages that arrived while no operator was online.
    pub email: u64,
}

impl MessageCounts {
    pub fn total(&self) -> u64 {
        self.chat + self.email
    }
}

/// What a single `ingest` call did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Message,
    EmptyMessage,
    Status,
    UnrecognizedStatus,
    UnrecognizedType,
}

/// Final metrics for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    #[serde(rename = "siteId")]
    pub site_id: String,
    pub messages: u64,
    pub emails: u64,
    pub operators: usize,
    pub visitors: usize,
}

impl fmt::Display for SiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},messages={},emails={},operators={},visitors={}",
            self.site_id, self.messages, self.emails, self.operators, self.visitors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ordering_is_total() {
        let mut stamps = vec![
            Timestamp::from(10.5),
            Timestamp::END_OF_TIME,
            Timestamp::from(-3i64),
            Timestamp::BASELINE,
            Timestamp::from(0i64),
        ];
        stamps.sort();
        assert_eq!(stamps.first(), Some(&Timestamp::BASELINE));
        assert_eq!(stamps.last(), Some(&Timestamp::END_OF_TIME));
        assert_eq!(stamps[1], Timestamp::from(-3.0));
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(Timestamp::from(-0.0), Timestamp::from(0.0));
    }

    #[test]
    fn test_timestamp_deserializes_integers_and_floats() {
        let ts: Timestamp = serde_json::from_str("1465997960").unwrap();
        assert_eq!(ts, Timestamp::from(1465997960i64));
        let ts: Timestamp = serde_json::from_str("12.25").unwrap();
        assert_eq!(ts, Timestamp::from(12.25));
        assert!(serde_json::from_str::<Timestamp>("\"12\"").is_err());
    }

    #[test]
    fn test_large_integers_stay_distinct() {
        let a: Timestamp = serde_json::from_str("1700000000000000000").unwrap();
        let b: Timestamp = serde_json::from_str("1700000000000000001").unwrap();
        let c: Timestamp = serde_json::from_str("18446744073709551615").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.to_string(), "1700000000000000001");
    }

    #[test]
    fn test_mixed_int_float_comparison_is_exact() {
        assert_eq!(Timestamp::from(10i64), Timestamp::from(10.0));
        assert!(Timestamp::from(10i64) < Timestamp::from(10.5));
        assert!(Timestamp::from(11i64) > Timestamp::from(10.5));
        assert!(Timestamp::from(-11i64) < Timestamp::from(-10.5));
        assert!(Timestamp::from(-10i64) > Timestamp::from(-10.5));
        // 2^53 + 1 is not representable as f64; it must still sort above 2^53
        let above = Timestamp::from(9_007_199_254_740_993i64);
        assert!(above > Timestamp::from(9_007_199_254_740_992.0));
        assert!(Timestamp::BASELINE < Timestamp::from(i64::MIN));
        assert!(Timestamp::END_OF_TIME > Timestamp::from(u64::MAX));
    }

    #[test]
    fn test_status_change_from_str() {
        assert_eq!(StatusChange::from("online"), StatusChange::Online);
        assert_eq!(StatusChange::from("offline"), StatusChange::Offline);
        assert_eq!(
            StatusChange::from("away"),
            StatusChange::Unrecognized("away".to_string())
        );
    }

    #[test]
    fn test_report_line_format() {
        let report = SiteReport {
            site_id: "123".to_string(),
            messages: 1,
            emails: 2,
            operators: 3,
            visitors: 4,
        };
        assert_eq!(
            report.to_string(),
            "123,messages=1,emails=2,operators=3,visitors=4"
        );
    }

    #[test]
    fn test_interval_is_half_open() {
        let interval = OnlineInterval {
            start: Timestamp::from(10i64),
            end: Timestamp::from(20i64),
            online_operators: 1,
        };
        assert!(interval.contains(Timestamp::from(10i64)));
        assert!(!interval.contains(Timestamp::from(20i64)));
        assert!(interval.is_staffed());
    }
}
