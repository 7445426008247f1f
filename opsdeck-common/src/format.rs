//! Formatting utilities for displaying sizes and times

use chrono::{DateTime, Local, TimeDelta, Utc};

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Format bytes as human-readable size using 1024-based units (KB, MB, GB, TB)
///
/// The value is scaled to the largest unit keeping the magnitude at least 1,
/// rounded to two decimals, and trailing zeros are dropped.
///
/// # Examples
/// ```
/// use opsdeck_common::format_bytes;
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1024), "1 KB");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(1048576), "1 MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{} {}", trim_decimals(size), UNITS[unit_idx])
}

/// Format an optional byte count; absent sizes render as `"0 B"`
pub fn format_optional_bytes(bytes: Option<u64>) -> String {
    bytes.map(format_bytes).unwrap_or_else(|| "0 B".to_string())
}

/// Convert a raw numeric size into a byte count
///
/// Negative, NaN and infinite values clamp to zero; fractional values round
/// to the nearest byte.
pub fn clamp_byte_count(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    if raw >= u64::MAX as f64 {
        return u64::MAX;
    }
    raw.round() as u64
}

/// Parse a size produced by [`format_bytes`] back into bytes
///
/// Returns `None` for anything that isn't `"<number> <unit>"` with a known unit.
pub fn parse_size(text: &str) -> Option<f64> {
    let (value, unit) = text.trim().split_once(' ')?;
    let value: f64 = value.parse().ok()?;
    let exponent = UNITS.iter().position(|u| *u == unit)?;
    Some(value * 1024f64.powi(exponent as i32))
}

fn trim_decimals(value: f64) -> String {
    let rounded = format!("{value:.2}");
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Format a timestamp in the local timezone
pub fn format_local_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

const AGE_UNITS: &[(&str, i64)] = &[("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];

/// Compact age of a refresh, e.g. `"42s"`, `"1m 30s"`, `"1d 1h"`
///
/// Shows the largest whole unit and, when non-zero, the unit below it.
/// Negative ages (clock skew) read as `"0s"`.
///
/// # Examples
/// ```
/// use chrono::TimeDelta;
/// use opsdeck_common::format_age;
/// assert_eq!(format_age(TimeDelta::seconds(30)), "30s");
/// assert_eq!(format_age(TimeDelta::seconds(90)), "1m 30s");
/// assert_eq!(format_age(TimeDelta::seconds(3665)), "1h 1m");
/// ```
pub fn format_age(age: TimeDelta) -> String {
    let seconds = age.num_seconds().max(0);
    let lead = AGE_UNITS
        .iter()
        .position(|&(_, size)| seconds >= size)
        .unwrap_or(AGE_UNITS.len() - 1);

    let (unit, size) = AGE_UNITS[lead];
    let mut out = format!("{}{unit}", seconds / size);
    if let Some(&(minor_unit, minor_size)) = AGE_UNITS.get(lead + 1) {
        let minor = (seconds % size) / minor_size;
        if minor > 0 {
            out.push_str(&format!(" {minor}{minor_unit}"));
        }
    }
    out
}
