//! # Sprint Planning
//!
//! Sprints are generated in batches. Each sprint spans `duration_days`
//! working days: the start day counts as the first day, and every further
//! day skips Saturdays and Sundays. The following sprint starts on the
//! calendar day after the previous one ends.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::constants::{MAX_SPRINTS_PER_REQUEST, MAX_SPRINT_DURATION_DAYS, SPRINT_DATE_FORMAT};
use crate::errors::{CoreError, CoreResult};

/// One generated sprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprintWindow {
    pub number: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SprintWindow {
    /// `Sprint {n} ({dd-mm-yyyy}/{dd-mm-yyyy})`
    pub fn name(&self) -> String {
        format!(
            "Sprint {} ({}/{})",
            self.number,
            self.start.format(SPRINT_DATE_FORMAT),
            self.end.format(SPRINT_DATE_FORMAT)
        )
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Last day of a sprint of `duration_days` working days starting at `start`.
///
/// The start day itself is never moved, even when it falls on a weekend.
pub fn sprint_end_date(start: NaiveDate, duration_days: u32) -> CoreResult<NaiveDate> {
    let mut end = start;
    for _ in 1..duration_days {
        let mut date = next_day(end)?;
        while is_weekend(date) {
            date = next_day(date)?;
        }
        end = date;
    }
    Ok(end)
}

/// Plan `count` consecutive sprints, numbered after `last_number`
pub fn plan_sprints(
    last_number: u32,
    start: NaiveDate,
    count: u32,
    duration_days: u32,
) -> CoreResult<Vec<SprintWindow>> {
    if count == 0 || count > MAX_SPRINTS_PER_REQUEST {
        return Err(CoreError::InvalidSprintCount(MAX_SPRINTS_PER_REQUEST));
    }
    if duration_days == 0 || duration_days > MAX_SPRINT_DURATION_DAYS {
        return Err(CoreError::InvalidSprintDuration(MAX_SPRINT_DURATION_DAYS));
    }

    let mut windows = Vec::with_capacity(count as usize);
    let mut number = last_number;
    let mut start = start;

    for _ in 0..count {
        let end = sprint_end_date(start, duration_days)?;
        number = number.checked_add(1).ok_or(CoreError::SequenceOverflow)?;
        windows.push(SprintWindow { number, start, end });
        start = next_day(end)?;
    }

    Ok(windows)
}

/// Sprint number from a generated name such as `Sprint 4 (..)`
pub fn parse_sprint_number(name: &str) -> Option<u32> {
    name.split_whitespace().nth(1)?.parse().ok()
}

/// Highest sprint number among `names`, 0 when none parse
pub fn last_sprint_number<I>(names: I) -> u32
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| parse_sprint_number(name.as_ref()))
        .max()
        .unwrap_or(0)
}

fn next_day(date: NaiveDate) -> CoreResult<NaiveDate> {
    date.checked_add_days(Days::new(1)).ok_or(CoreError::DateOverflow)
}
