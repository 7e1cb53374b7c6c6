use chrono::{Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::api::{AgendaEntryId, PhotographerId};
use crate::models::{AgendaEntryDraft, AgendaEntrySource, AgendaEntryType};
use crate::services::availability::*;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn blocking_entry(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> crate::models::AgendaEntry {
    AgendaEntryDraft::new(
        PhotographerId(7),
        AgendaEntryType::TimeOff,
        AgendaEntrySource::Manual,
        start,
        end,
        "UTC",
    )
    .into_entry(AgendaEntryId(1))
}

const HOURS: BusinessHours = BusinessHours {
    start_hour: 8,
    end_hour: 19,
};

#[test]
fn working_ranges_cover_weekdays_only() {
    // 2025-03-10 is a Monday.
    let tz: Tz = "UTC".parse().unwrap();
    let ranges = build_working_ranges(utc(2025, 3, 10, 0, 0), utc(2025, 3, 17, 0, 0), tz, HOURS);
    assert_eq!(ranges.len(), 5);
    assert_eq!(ranges[0].start, utc(2025, 3, 10, 8, 0));
    assert_eq!(ranges[0].end, utc(2025, 3, 10, 19, 0));
    assert_eq!(ranges[4].start, utc(2025, 3, 14, 8, 0));
}

#[test]
fn working_ranges_clip_to_window() {
    let tz: Tz = "UTC".parse().unwrap();
    let ranges = build_working_ranges(utc(2025, 3, 10, 10, 0), utc(2025, 3, 10, 15, 0), tz, HOURS);
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].start, utc(2025, 3, 10, 10, 0));
    assert_eq!(ranges[0].end, utc(2025, 3, 10, 15, 0));
}

#[test]
fn working_ranges_respect_local_offset() {
    // São Paulo runs at UTC-3 year-round.
    let tz: Tz = "America/Sao_Paulo".parse().unwrap();
    let ranges = build_working_ranges(utc(2025, 3, 10, 0, 0), utc(2025, 3, 11, 12, 0), tz, HOURS);
    assert_eq!(ranges[0].start, utc(2025, 3, 10, 11, 0));
    assert_eq!(ranges[0].end, utc(2025, 3, 10, 22, 0));
}

#[test]
fn subtract_range_splits_in_the_middle() {
    let range = TimeRange::new(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 19, 0));
    let result = subtract_range(
        vec![range],
        TimeRange::new(utc(2025, 3, 10, 12, 0), utc(2025, 3, 10, 14, 0)),
    );
    assert_eq!(
        result,
        vec![
            TimeRange::new(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 12, 0)),
            TimeRange::new(utc(2025, 3, 10, 14, 0), utc(2025, 3, 10, 19, 0)),
        ]
    );
}

#[test]
fn subtract_range_ignores_non_overlapping() {
    let range = TimeRange::new(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 12, 0));
    let untouched = subtract_range(
        vec![range],
        TimeRange::new(utc(2025, 3, 10, 12, 0), utc(2025, 3, 10, 14, 0)),
    );
    assert_eq!(untouched, vec![range]);
}

#[test]
fn blocking_entries_are_subtracted() {
    let ranges = vec![TimeRange::new(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 19, 0))];
    let entries = vec![blocking_entry(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 13, 0))];
    let result = subtract_blocking_entries(ranges, &entries);
    assert_eq!(
        result,
        vec![TimeRange::new(utc(2025, 3, 10, 13, 0), utc(2025, 3, 10, 19, 0))]
    );
}

#[test]
fn prune_drops_past_and_clips_straddling() {
    let now = utc(2025, 3, 10, 12, 0);
    let ranges = vec![
        TimeRange::new(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 11, 0)),
        TimeRange::new(utc(2025, 3, 10, 10, 0), utc(2025, 3, 10, 15, 0)),
        TimeRange::new(utc(2025, 3, 10, 16, 0), utc(2025, 3, 10, 19, 0)),
    ];
    let result = prune_past_ranges(ranges, now);
    assert_eq!(
        result,
        vec![
            TimeRange::new(now, utc(2025, 3, 10, 15, 0)),
            TimeRange::new(utc(2025, 3, 10, 16, 0), utc(2025, 3, 10, 19, 0)),
        ]
    );
}

#[test]
fn range_ending_exactly_now_is_gone() {
    let now = utc(2025, 3, 10, 12, 0);
    let result = prune_past_ranges(
        vec![TimeRange::new(utc(2025, 3, 10, 8, 0), now)],
        now,
    );
    assert!(result.is_empty());
}

#[test]
fn slots_split_and_remainder_is_dropped() {
    // 8:00-19:00 holds two 4-hour slots; the trailing 3 hours are not a slot.
    let range = TimeRange::new(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 19, 0));
    let slots = split_into_slots(range, Duration::minutes(240));
    assert_eq!(
        slots,
        vec![
            TimeRange::new(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 12, 0)),
            TimeRange::new(utc(2025, 3, 10, 12, 0), utc(2025, 3, 10, 16, 0)),
        ]
    );
}

#[test]
fn exact_fit_produces_one_slot() {
    let range = TimeRange::new(utc(2025, 3, 10, 8, 0), utc(2025, 3, 10, 12, 0));
    let slots = split_into_slots(range, Duration::minutes(240));
    assert_eq!(slots.len(), 1);
}

#[test]
fn holiday_blocks_the_entire_local_day() {
    let tz: Tz = "America/Sao_Paulo".parse().unwrap();
    let holiday = NaiveDate::from_ymd_opt(2025, 4, 21).unwrap();
    // Window covering Mon 2025-04-21 and Tue 2025-04-22 local.
    let free = compute_free_ranges(
        utc(2025, 4, 21, 0, 0),
        utc(2025, 4, 23, 3, 0),
        tz,
        HOURS,
        &[],
        &[holiday],
        utc(2025, 4, 20, 0, 0),
    );
    // Nothing on the holiday; the whole Tuesday window survives.
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].start, utc(2025, 4, 22, 11, 0));
    assert_eq!(free[0].end, utc(2025, 4, 22, 22, 0));
}

#[test]
fn full_pipeline_weekday_with_booking() {
    let tz: Tz = "UTC".parse().unwrap();
    let entries = vec![blocking_entry(utc(2025, 3, 11, 13, 0), utc(2025, 3, 11, 17, 0))];
    let free = compute_free_ranges(
        utc(2025, 3, 11, 0, 0),
        utc(2025, 3, 12, 0, 0),
        tz,
        HOURS,
        &entries,
        &[],
        utc(2025, 3, 10, 9, 0),
    );
    assert_eq!(
        free,
        vec![
            TimeRange::new(utc(2025, 3, 11, 8, 0), utc(2025, 3, 11, 13, 0)),
            TimeRange::new(utc(2025, 3, 11, 17, 0), utc(2025, 3, 11, 19, 0)),
        ]
    );
}
