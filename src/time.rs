//! Timestamp decoding
//!
//! Prometheus encodes sample times as fractional Unix seconds. Loki encodes
//! log times as decimal nanosecond strings, which may overflow `i64` for
//! dates far in the future, so those are split into a seconds prefix and a
//! nanosecond remainder when the fast path does not apply.

use crate::{Error, Result};
use chrono::{DateTime, Utc};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
/// Digits in the seconds part of a Loki timestamp
const LOKI_SECONDS_DIGITS: usize = 10;
/// Digits in a nanosecond timestamp for dates between 2001 and 2286
const LOKI_NANOS_DIGITS: usize = 19;

/// Convert fractional Unix seconds to a UTC instant truncated to milliseconds
pub fn time_from_float(seconds: f64) -> Result<DateTime<Utc>> {
    let millis = (seconds * 1000.0) as i64;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::TimeFormat(format!("timestamp {} is out of range", seconds)))
}

/// Convert a Loki nanosecond string to a UTC instant
pub fn time_from_loki_string(s: &str) -> Result<DateTime<Utc>> {
    // Values below i64::MAX parse directly; a 19 digit value starting
    // with '1' is any date before 2033.
    let len = s.len();
    if len < LOKI_NANOS_DIGITS || (len == LOKI_NANOS_DIGITS && s.starts_with('1')) {
        if let Ok(ns) = s.parse::<i64>() {
            return Ok(DateTime::from_timestamp_nanos(ns));
        }
    }

    if len < LOKI_SECONDS_DIGITS {
        return Err(truncated(s));
    }
    split_seconds_and_nanos(s)
}

fn split_seconds_and_nanos(s: &str) -> Result<DateTime<Utc>> {
    let (Some(secs_str), Some(nanos_str)) = (s.get(..LOKI_SECONDS_DIGITS), s.get(LOKI_SECONDS_DIGITS..))
    else {
        return Err(truncated(s));
    };

    let secs = parse_segment(secs_str)?;
    let nanos = if nanos_str.is_empty() {
        0
    } else {
        parse_segment(nanos_str)?
    };

    let total_secs = secs
        .checked_add(nanos.div_euclid(NANOS_PER_SECOND))
        .ok_or_else(|| out_of_range(s))?;
    let sub_nanos = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
    DateTime::from_timestamp(total_secs, sub_nanos).ok_or_else(|| out_of_range(s))
}

fn parse_segment(segment: &str) -> Result<i64> {
    segment.parse::<i64>().map_err(|source| Error::ParseInt {
        value: segment.to_string(),
        source,
    })
}

fn truncated(s: &str) -> Error {
    Error::TimeFormat(format!(
        "unexpected time format '{}' in response. response may have been truncated",
        s
    ))
}

fn out_of_range(s: &str) -> Error {
    Error::TimeFormat(format!("timestamp '{}' is out of range", s))
}
