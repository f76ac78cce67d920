//! Go-style duration strings (`"300ms"`, `"1h30m"`, `"1.5s"`).
//!
//! Also usable as a serde `with` module:
//!
//! ```ignore
//! #[serde(with = "flatconf::duration")]
//! pub timeout: std::time::Duration,
//! ```

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

use crate::error::CoercionError;
use crate::schema::Kind;

const NANOS_PER_SEC: u128 = 1_000_000_000;

// Fractional digits beyond this cannot change the nanosecond result.
const MAX_FRACTION_DIGITS: usize = 18;

fn unit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]*)(?:\.([0-9]*))?(ns|us|µs|μs|ms|s|m|h)")
            .expect("duration unit pattern is valid")
    })
}

fn unit_nanos(unit: &str) -> u128 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        _ => 3_600 * NANOS_PER_SEC,
    }
}

/// Parse a sequence of decimal numbers, each with an optional fraction and
/// a unit suffix. `"0"` is the only value accepted without a unit.
pub fn parse(raw: &str) -> Result<Duration, CoercionError> {
    let invalid = |reason: &str| CoercionError::invalid(Kind::Duration, raw, reason);

    let (negative, mut rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let caps = unit_pattern()
            .captures(rest)
            .ok_or_else(|| invalid("expected a number followed by a unit"))?;
        let whole = caps.get(1).map_or("", |m| m.as_str());
        let fraction = caps.get(2).map_or("", |m| m.as_str());
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("missing number before unit"));
        }
        let unit = unit_nanos(caps.get(3).map_or("", |m| m.as_str()));

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("value out of range"))?
        };
        let mut part = whole
            .checked_mul(unit)
            .ok_or_else(|| invalid("value out of range"))?;

        if !fraction.is_empty() {
            let digits = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
            let value: u128 = digits.parse().map_err(|_| invalid("invalid fraction"))?;
            let scale = 10u128.pow(digits.len() as u32);
            part += value * unit / scale;
        }

        total = total
            .checked_add(part)
            .ok_or_else(|| invalid("value out of range"))?;
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }

    if negative && total > 0 {
        return Err(invalid("negative durations are not supported"));
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid("value out of range"))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Render in the same form [`parse`] accepts, e.g. `"1h30m0s"` or `"1.5s"`.
pub fn format(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let secs = d.as_secs();
    let (hours, minutes) = (secs / 3_600, secs % 3_600 / 60);
    let seconds = nanos % (60 * NANOS_PER_SEC);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&decimal(seconds, NANOS_PER_SEC));
    out.push('s');
    out
}

fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rem = value % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let fraction = format!("{rem:0width$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration string such as \"30s\" or a number of nanoseconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        Ok(Duration::from_nanos(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_nanos)
            .map_err(|_| E::custom("negative durations are not supported"))
    }
}
