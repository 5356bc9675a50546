//! # Field Validators
//!
//! Pure checks shared by the request payloads. Time-dependent checks take
//! the reference instant as an argument.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{MAX_SCHEDULE_AHEAD_DAYS, SHORT_CODE_LEN};
use crate::errors::{CoreError, CoreResult};

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{1,20}$").unwrap());

static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").unwrap());

/// Alphanumerics and underscores, 1 to 20 characters
pub fn check_name(value: &str) -> CoreResult<()> {
    if NAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(CoreError::InvalidName)
    }
}

/// `value` must lie between `now` and one year after it
pub fn check_date_range(value: DateTime<Utc>, now: DateTime<Utc>) -> CoreResult<()> {
    let limit = now + Duration::days(MAX_SCHEDULE_AHEAD_DAYS);
    if value < now || value > limit {
        return Err(CoreError::DateOutOfRange);
    }
    Ok(())
}

/// `value` must not be before `today`
pub fn check_date_not_past(value: NaiveDate, today: NaiveDate) -> CoreResult<()> {
    if value < today {
        return Err(CoreError::DateInPast);
    }
    Ok(())
}

/// `#RRGGBB` or `#RGB`
pub fn check_color_code(value: &str) -> CoreResult<()> {
    if COLOR_RE.is_match(value) {
        Ok(())
    } else {
        Err(CoreError::InvalidColorCode)
    }
}

/// Exactly three ASCII letters or digits
pub fn check_short_code(value: &str) -> CoreResult<()> {
    if value.len() == SHORT_CODE_LEN && value.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(CoreError::InvalidShortCode)
    }
}
