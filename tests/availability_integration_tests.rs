//! Availability listing through the service layer.

mod support;

use chrono::{TimeZone, Utc};

use fotoagenda::api::HolidayCalendarId;
use fotoagenda::error::CoreError;
use fotoagenda::models::{
    CalendarScope, HolidayCalendar, HolidayDate, SlotPeriod,
};
use fotoagenda::services::{
    AvailabilitySort, CancelSessionInput, ListAvailabilityInput, ReserveSessionInput,
};

use support::{Harness, LISTING_IDENTITY, OWNER, PHOTOGRAPHER};

fn window_input() -> ListAvailabilityInput {
    ListAvailabilityInput {
        listing_identity_id: LISTING_IDENTITY,
        from: Some(Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap()),
        to: Some(Utc.with_ymd_and_hms(2025, 3, 12, 0, 0, 0).unwrap()),
        page: 0,
        size: 0,
        sort: AvailabilitySort::StartAsc,
        period: None,
        timezone: Some("America/Sao_Paulo".to_string()),
    }
}

#[tokio::test]
async fn one_weekday_yields_two_slots() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let output = harness
        .service
        .list_availability(window_input())
        .await
        .expect("availability computes");

    // Business hours 08:00-19:00 local (UTC-3) fit two 4-hour slots.
    assert_eq!(output.total, 2);
    assert_eq!(
        output.slots[0].start,
        Utc.with_ymd_and_hms(2025, 3, 11, 11, 0, 0).unwrap()
    );
    assert_eq!(output.slots[0].period, SlotPeriod::Morning);
    assert_eq!(
        output.slots[1].start,
        Utc.with_ymd_and_hms(2025, 3, 11, 15, 0, 0).unwrap()
    );
    assert_eq!(output.slots[1].period, SlotPeriod::Afternoon);
    assert_eq!(output.timezone, "America/Sao_Paulo");

    // Slot ids decode back to the photographer and the start instant.
    let (photographer, start) = output.slots[0].slot_id.decode();
    assert_eq!(photographer, PHOTOGRAPHER);
    assert_eq!(start, output.slots[0].start);
}

#[tokio::test]
async fn reserve_then_cancel_restores_availability() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let before = harness.service.list_availability(window_input()).await.unwrap();
    assert_eq!(before.total, 2);

    let reserved = harness
        .service
        .reserve_photo_session(ReserveSessionInput {
            user_id: OWNER,
            listing_identity_id: LISTING_IDENTITY,
            slot_id: before.slots[0].slot_id,
        })
        .await
        .expect("reserve the morning slot");

    let during = harness.service.list_availability(window_input()).await.unwrap();
    // The taken window is gone; 15:00-19:00 local remains as one slot.
    assert_eq!(during.total, 1);
    assert_eq!(during.slots[0].start, before.slots[1].start);

    harness
        .service
        .cancel_photo_session(CancelSessionInput {
            user_id: OWNER,
            photo_session_id: reserved.photo_session_id,
        })
        .await
        .expect("cancel frees the slot");

    let after = harness.service.list_availability(window_input()).await.unwrap();
    assert_eq!(after.total, 2);
    assert_eq!(after.slots[0].slot_id, before.slots[0].slot_id);
}

#[tokio::test]
async fn holiday_suppresses_the_whole_day() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;
    harness
        .repo
        .seed_calendar(
            HolidayCalendar {
                id: HolidayCalendarId(1),
                name: "Feriados Nacionais".to_string(),
                scope: CalendarScope::National,
                state: None,
                city: None,
                active: true,
            },
            vec![HolidayDate {
                calendar_id: HolidayCalendarId(1),
                date: chrono::NaiveDate::from_ymd_opt(2025, 4, 21).unwrap(),
                label: "Tiradentes".to_string(),
            }],
        )
        .await;

    let output = harness
        .service
        .list_availability(ListAvailabilityInput {
            from: Some(Utc.with_ymd_and_hms(2025, 4, 21, 3, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2025, 4, 22, 3, 0, 0).unwrap()),
            ..window_input()
        })
        .await
        .expect("availability computes");

    assert_eq!(output.total, 0);
}

#[tokio::test]
async fn inverted_range_is_a_validation_error() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let err = harness
        .service
        .list_availability(ListAvailabilityInput {
            from: Some(Utc.with_ymd_and_hms(2025, 3, 12, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap()),
            ..window_input()
        })
        .await
        .expect_err("to before from");
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn page_size_is_clamped_to_one_hundred() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let output = harness
        .service
        .list_availability(ListAvailabilityInput {
            size: 500,
            ..window_input()
        })
        .await
        .unwrap();
    assert_eq!(output.size, 100);
}

#[tokio::test]
async fn period_filter_keeps_only_matching_slots() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let output = harness
        .service
        .list_availability(ListAvailabilityInput {
            period: Some(SlotPeriod::Afternoon),
            ..window_input()
        })
        .await
        .unwrap();
    assert_eq!(output.total, 1);
    assert_eq!(output.slots[0].period, SlotPeriod::Afternoon);
}

#[tokio::test]
async fn slots_sort_across_photographers() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;
    harness
        .seed_photographer(fotoagenda::api::PhotographerId(9))
        .await;

    let asc = harness
        .service
        .list_availability(ListAvailabilityInput {
            sort: AvailabilitySort::PhotographerAsc,
            ..window_input()
        })
        .await
        .unwrap();
    assert_eq!(asc.total, 4);
    assert_eq!(asc.slots[0].photographer_id, PHOTOGRAPHER);
    assert_eq!(asc.slots[2].photographer_id.value(), 9);

    let desc = harness
        .service
        .list_availability(ListAvailabilityInput {
            sort: AvailabilitySort::StartDesc,
            ..window_input()
        })
        .await
        .unwrap();
    assert!(desc.slots[0].start >= desc.slots[desc.slots.len() - 1].start);
}

#[tokio::test]
async fn ineligible_listing_is_rejected() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;
    harness
        .repo
        .seed_listing(fotoagenda::models::Listing {
            id: fotoagenda::api::ListingId(450),
            identity_id: fotoagenda::api::ListingIdentityId(45),
            user_id: OWNER,
            status: fotoagenda::models::ListingStatus::Published,
            deleted: false,
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            code: 1003,
        })
        .await;

    let err = harness
        .service
        .list_availability(ListAvailabilityInput {
            listing_identity_id: fotoagenda::api::ListingIdentityId(45),
            ..window_input()
        })
        .await
        .expect_err("published listing has no photo pipeline");
    assert!(matches!(
        err,
        CoreError::Conflict(fotoagenda::error::ConflictError::ListingNotEligible)
    ));
}
