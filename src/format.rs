//! Human-readable rendering of byte counts, durations and percentages.
//!
//! Everything in here is pure and never fails: unparsable input degrades to a
//! placeholder string instead of an error.
//!
//! # Examples
//!
//! ```rust
//! use trmnl_docker_monitor::format::{format_bytes, round1};
//!
//! assert_eq!(format_bytes(1536), "1.5KB");
//! assert_eq!(round1(12.345), 12.3);
//! ```

use chrono::{DateTime, FixedOffset, Utc};

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Placeholder rendered when a start instant cannot be parsed.
pub const UNKNOWN_UPTIME: &str = "unknown";

/// Formats a byte count using binary (1024) steps.
///
/// The value is divided while it is at least 1024, advancing through
/// `B`, `KB`, `MB`, `GB` and `TB`. `TB` is the last unit, so very large
/// values keep growing in front of it instead of switching to a larger unit.
/// The result always carries exactly one decimal digit and no space.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1}{}", BYTE_UNITS[unit])
}

/// Formats the time elapsed since `started_at` until now.
///
/// See [`format_uptime_at`] for the rendering rules.
pub fn format_uptime(started_at: &str) -> String {
    format_uptime_at(started_at, Utc::now().fixed_offset())
}

/// Formats the time elapsed between `started_at` and `now`.
///
/// `started_at` is an RFC 3339 timestamp as reported by the engine, e.g.
/// `2024-03-01T10:15:30.123456789Z`. The output is `"{d}d {h}h"` when at least
/// one day has passed, `"{h}h {m}m"` when at least one hour has passed and
/// `"{m}m"` otherwise. A start instant in the future counts as zero elapsed
/// time. Returns [`UNKNOWN_UPTIME`] if `started_at` cannot be parsed.
pub fn format_uptime_at(started_at: &str, now: DateTime<FixedOffset>) -> String {
    let Ok(start) = DateTime::parse_from_rfc3339(started_at.trim()) else {
        return UNKNOWN_UPTIME.to_owned();
    };

    let elapsed = now.signed_duration_since(start).num_seconds().max(0);
    let days = elapsed / 86_400;
    let hours = (elapsed % 86_400) / 3_600;
    let minutes = (elapsed % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Rounds a value to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
