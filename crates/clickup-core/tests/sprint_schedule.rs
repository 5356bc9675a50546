//! # Sprint Schedule Properties
//!
//! Property checks for the sprint planner and the ticket sequence.

use chrono::{Days, NaiveDate};
use clickup_core::ids::{next_ticket_custom_id, TicketCustomId};
use clickup_core::sprint::{is_weekend, plan_sprints, sprint_end_date};
use proptest::prelude::*;

fn any_date() -> impl Strategy<Value = NaiveDate> {
    // 2000-01-01 .. roughly 2060
    (0u64..22_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    })
}

/// Start day plus every weekday after it, up to and including `end`
fn counted_days(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut count = 1;
    let mut day = start;
    while day < end {
        day = day.succ_opt().unwrap();
        if !is_weekend(day) {
            count += 1;
        }
    }
    count
}

proptest! {
    #[test]
    fn sprint_covers_requested_working_days(start in any_date(), duration in 1u32..=90) {
        let end = sprint_end_date(start, duration).unwrap();

        prop_assert!(end >= start);
        prop_assert_eq!(counted_days(start, end), duration);
        if duration > 1 {
            prop_assert!(!is_weekend(end));
        }
    }

    #[test]
    fn planned_sprints_are_contiguous(
        start in any_date(),
        count in 1u32..=12,
        duration in 1u32..=20,
        last in 0u32..500,
    ) {
        let plan = plan_sprints(last, start, count, duration).unwrap();

        prop_assert_eq!(plan.len(), count as usize);
        prop_assert_eq!(plan[0].start, start);
        for (idx, window) in plan.iter().enumerate() {
            prop_assert_eq!(window.number, last + 1 + idx as u32);
            prop_assert_eq!(window.end, sprint_end_date(window.start, duration).unwrap());
        }
        for pair in plan.windows(2) {
            prop_assert_eq!(pair[1].start, pair[0].end.succ_opt().unwrap());
        }
    }

    #[test]
    fn ticket_ids_parse_back_to_their_sequence(code in "[A-Z0-9]{3}", last in proptest::option::of(0u32..2_000_000)) {
        let id = next_ticket_custom_id(&code, last).unwrap();
        let parsed: TicketCustomId = id.to_string().parse().unwrap();

        prop_assert_eq!(parsed.short_code(), code.as_str());
        prop_assert_eq!(parsed.sequence(), last.map_or(1, |l| l + 1));
    }
}
