//! # Duration Strings
//!
//! Durations travel as `[D ]HH:MM:SS` strings, e.g. `01:00:00` or
//! `2 03:30:00`. Parsing also accepts the shortened `MM:SS` and `SS` forms
//! and an optional fractional second part, which is truncated.

use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_HOUR};
use crate::errors::{CoreError, CoreResult};

/// Render whole seconds as `[D ]HH:MM:SS`
pub fn format_duration(total_seconds: i64) -> String {
    let sign = if total_seconds < 0 { "-" } else { "" };
    let total = total_seconds.unsigned_abs();

    let days = total / SECONDS_PER_DAY as u64;
    let rem = total % SECONDS_PER_DAY as u64;
    let hours = rem / SECONDS_PER_HOUR as u64;
    let minutes = (rem % SECONDS_PER_HOUR as u64) / 60;
    let seconds = rem % 60;

    if days > 0 {
        format!("{sign}{days} {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Parse `[D ][[HH:]MM:]SS[.ffffff]` into whole seconds
pub fn parse_duration(value: &str) -> CoreResult<i64> {
    let invalid = || CoreError::InvalidDuration(value.to_string());

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let (days, clock) = match trimmed.split_once(' ') {
        Some((days, clock)) => (parse_part(days.trim(), i64::MAX).ok_or_else(invalid)?, clock.trim()),
        None => (0, trimmed),
    };

    let clock = clock.split('.').next().unwrap_or(clock);
    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [s] => (0, 0, parse_part(s, i64::MAX).ok_or_else(invalid)?),
        [m, s] => (
            0,
            parse_part(m, i64::MAX).ok_or_else(invalid)?,
            parse_part(s, 59).ok_or_else(invalid)?,
        ),
        [h, m, s] => (
            parse_part(h, i64::MAX).ok_or_else(invalid)?,
            parse_part(m, 59).ok_or_else(invalid)?,
            parse_part(s, 59).ok_or_else(invalid)?,
        ),
        _ => return Err(invalid()),
    };

    days.checked_mul(SECONDS_PER_DAY)
        .and_then(|d| hours.checked_mul(SECONDS_PER_HOUR).and_then(|h| d.checked_add(h)))
        .and_then(|t| minutes.checked_mul(60).and_then(|m| t.checked_add(m)))
        .and_then(|t| t.checked_add(seconds))
        .ok_or_else(invalid)
}

/// Whole hours in a duration, rounded down
pub fn whole_hours(total_seconds: i64) -> i64 {
    total_seconds.div_euclid(SECONDS_PER_HOUR)
}

fn parse_part(part: &str, max: i64) -> Option<i64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse::<i64>().ok().filter(|v| *v <= max)
}

/// Serde adapter for `i64` seconds exchanged as duration strings
#[cfg(feature = "serde")]
pub mod hms {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(seconds: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_duration(*seconds))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(de::Error::custom)
    }

    /// Same adapter for optional fields
    pub mod option {
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(seconds: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match seconds {
                Some(seconds) => super::serialize(seconds, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| crate::duration::parse_duration(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}
