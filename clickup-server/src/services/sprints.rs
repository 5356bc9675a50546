//! Sprint batch creation

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use clickup_core::validators::check_date_not_past;
use serde::Deserialize;
use validator::Validate;

use crate::database::PostgresManager;
use crate::error::{TrackerError, TrackerResult};
use crate::models::Sprint;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SprintPlanRequest {
    #[validate(length(min = 1))]
    pub project: String,
    #[validate(range(min = 1, max = 52))]
    pub number_of_sprints: u32,
    #[validate(range(min = 1, max = 90))]
    pub sprint_duration: u32,
    pub start_date: String,
}

/// Accept a plain date or a timestamp and keep the calendar day
pub fn parse_start_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

impl SprintPlanRequest {
    /// First day of the batch, which may not lie in the past
    pub fn start(&self, today: NaiveDate) -> TrackerResult<NaiveDate> {
        let start = parse_start_date(&self.start_date).ok_or_else(|| {
            TrackerError::field(
                "startDate",
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
            )
        })?;
        check_date_not_past(start, today).map_err(|e| TrackerError::from_core("startDate", e))?;
        Ok(start)
    }

    pub async fn execute(&self, db: &PostgresManager, today: NaiveDate) -> TrackerResult<Vec<Sprint>> {
        self.validate()?;
        let start = self.start(today)?;
        db.create_sprints(&self.project, start, self.number_of_sprints, self.sprint_duration)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(count: u32, duration: u32, start: &str) -> SprintPlanRequest {
        SprintPlanRequest {
            project: "p1".to_string(),
            number_of_sprints: count,
            sprint_duration: duration,
            start_date: start.to_string(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_dates_and_timestamps() {
        assert_eq!(parse_start_date("2024-03-04"), Some(day(2024, 3, 4)));
        assert_eq!(parse_start_date("2024-03-04T09:30:00Z"), Some(day(2024, 3, 4)));
        assert_eq!(parse_start_date("2024-03-04T09:30:00.000"), Some(day(2024, 3, 4)));
        assert_eq!(parse_start_date("04/03/2024"), None);
    }

    #[test]
    fn start_may_not_be_in_the_past() {
        let today = day(2024, 3, 4);
        assert_eq!(request(1, 5, "2024-03-04").start(today).unwrap(), today);

        match request(1, 5, "2024-03-01").start(today).unwrap_err() {
            TrackerError::Validation(fields) => {
                assert_eq!(fields["startDate"], vec!["Date should be today or greater"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn counts_and_durations_are_bounded() {
        assert!(request(1, 1, "2024-03-04").validate().is_ok());
        assert!(request(0, 5, "2024-03-04").validate().is_err());
        assert!(request(53, 5, "2024-03-04").validate().is_err());
        assert!(request(2, 91, "2024-03-04").validate().is_err());
    }
}
