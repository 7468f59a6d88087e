//! Timestamp helpers for on-disk names

use chrono::{DateTime, Utc};

/// Unix timestamp with a six-digit fraction, e.g. `1719400000.123456`
pub fn fractional_timestamp(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

/// Parse a value produced by [`fractional_timestamp`]
pub fn parse_fractional_timestamp(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}
