//! Agenda listing enrichment and holiday projection.

mod support;

use chrono::{NaiveDate, TimeZone, Utc};

use fotoagenda::api::HolidayCalendarId;
use fotoagenda::db::{AgendaRepository, TransactionManager};
use fotoagenda::models::{
    AgendaEntryType, CalendarScope, HolidayCalendar, HolidayDate,
};
use fotoagenda::services::{EnsureAgendaInput, ListAgendaInput, SlotStatus};

use support::{Harness, PHOTOGRAPHER};

fn agenda_input(from_h: (u32, u32, u32), days: i64) -> ListAgendaInput {
    let from = Utc
        .with_ymd_and_hms(2025, 4, from_h.0, from_h.1, from_h.2, 0)
        .unwrap();
    ListAgendaInput {
        photographer_id: PHOTOGRAPHER,
        from,
        to: from + chrono::Duration::days(days),
        page: 0,
        size: 0,
        timezone: Some("America/Sao_Paulo".to_string()),
        entry_type: None,
    }
}

async fn seed_national_and_city_holiday(harness: &Harness) {
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
                date: NaiveDate::from_ymd_opt(2025, 4, 21).unwrap(),
                label: "Tiradentes".to_string(),
            }],
        )
        .await;
    harness
        .repo
        .seed_calendar(
            HolidayCalendar {
                id: HolidayCalendarId(2),
                name: "Feriados Municipais".to_string(),
                scope: CalendarScope::City,
                state: Some("SP".to_string()),
                city: Some("São Paulo".to_string()),
                active: true,
            },
            vec![HolidayDate {
                calendar_id: HolidayCalendarId(2),
                date: NaiveDate::from_ymd_opt(2025, 4, 21).unwrap(),
                label: "Aniversário da Cidade".to_string(),
            }],
        )
        .await;
}

#[tokio::test]
async fn holiday_synthetics_merge_same_day_calendars() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;
    seed_national_and_city_holiday(&harness).await;

    // Monday 2025-04-21 local, full day.
    let output = harness
        .service
        .list_agenda(agenda_input((21, 3, 0), 1))
        .await
        .expect("agenda lists");

    let holidays: Vec<_> = output.slots.iter().filter(|slot| slot.is_holiday).collect();
    assert_eq!(holidays.len(), 1, "same-day calendars collapse to one slot");

    let holiday = holidays[0];
    assert_ne!(holiday.entry_id & (1 << 63), 0, "synthetic id has high bit");
    assert_eq!(holiday.status, SlotStatus::Blocked);
    assert_eq!(holiday.group_id, "holiday-2025-04-21");
    assert_eq!(
        holiday.holiday_labels,
        vec!["Tiradentes", "Aniversário da Cidade"]
    );
    assert_eq!(
        holiday.holiday_calendar_ids,
        vec![HolidayCalendarId(1), HolidayCalendarId(2)]
    );
}

#[tokio::test]
async fn weekend_and_outside_hours_blocks_are_synthesized() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    // Saturday 2025-04-26 local, full day.
    let output = harness
        .service
        .list_agenda(agenda_input((26, 3, 0), 1))
        .await
        .unwrap();

    let weekend: Vec<_> = output
        .slots
        .iter()
        .filter(|slot| slot.reason.as_deref() == Some("Weekend"))
        .collect();
    assert_eq!(weekend.len(), 1);
    assert_eq!(weekend[0].entry_type, AgendaEntryType::Block);
    assert!(weekend[0].group_id.starts_with("synthetic-weekend-"));

    // Wednesday 2025-04-23 local: early and late outside-hours blocks.
    let output = harness
        .service
        .list_agenda(agenda_input((23, 3, 0), 1))
        .await
        .unwrap();
    let outside: Vec<_> = output
        .slots
        .iter()
        .filter(|slot| slot.reason.as_deref() == Some("Outside business hours"))
        .collect();
    assert_eq!(outside.len(), 2);
}

#[tokio::test]
async fn real_entries_are_listed_with_group_ids() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    harness
        .service
        .create_time_off(fotoagenda::services::CreateTimeOffInput {
            photographer_id: PHOTOGRAPHER,
            starts_at: Utc.with_ymd_and_hms(2025, 4, 23, 12, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 4, 23, 16, 0, 0).unwrap(),
            reason: Some("Equipment maintenance".to_string()),
            timezone: Some("America/Sao_Paulo".to_string()),
        })
        .await
        .expect("time off created");

    let output = harness
        .service
        .list_agenda(agenda_input((23, 3, 0), 1))
        .await
        .unwrap();

    let time_off: Vec<_> = output.slots.iter().filter(|slot| slot.is_time_off).collect();
    assert_eq!(time_off.len(), 1);
    assert_eq!(time_off[0].status, SlotStatus::Blocked);
    assert_eq!(time_off[0].group_id, "manual-2025-04-23");
    assert_eq!(
        time_off[0].reason.as_deref(),
        Some("Equipment maintenance")
    );
    assert_eq!(time_off[0].entry_id & (1 << 63), 0, "real entries keep raw ids");
}

#[tokio::test]
async fn bootstrap_materializes_merged_holiday_entries() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;
    seed_national_and_city_holiday(&harness).await;

    harness
        .service
        .ensure_photographer_agenda(EnsureAgendaInput {
            photographer_id: PHOTOGRAPHER,
            timezone: Some("America/Sao_Paulo".to_string()),
            horizon_months: Some(3),
            calendar_ids: Some(vec![HolidayCalendarId(1), HolidayCalendarId(2)]),
        })
        .await
        .expect("bootstrap succeeds");

    let mut tx = harness.repo.begin_read_only().await.unwrap();
    let entries = harness
        .repo
        .list_entries_by_range(
            &mut tx,
            PHOTOGRAPHER,
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
            Some(AgendaEntryType::Holiday),
        )
        .await
        .unwrap();
    harness.repo.rollback(tx).await.unwrap();

    // Two calendars marking the same day materialize as one blocking entry.
    assert_eq!(entries.len(), 1);
    assert!(entries[0].blocking);
    assert_eq!(
        entries[0].reason.as_deref(),
        Some("Tiradentes, Aniversário da Cidade")
    );

    // Re-running the bootstrap is idempotent.
    harness
        .service
        .ensure_photographer_agenda(EnsureAgendaInput {
            photographer_id: PHOTOGRAPHER,
            timezone: Some("America/Sao_Paulo".to_string()),
            horizon_months: Some(3),
            calendar_ids: None,
        })
        .await
        .expect("second bootstrap succeeds");

    let mut tx = harness.repo.begin_read_only().await.unwrap();
    let again = harness
        .repo
        .list_entries_by_range(
            &mut tx,
            PHOTOGRAPHER,
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
            Some(AgendaEntryType::Holiday),
        )
        .await
        .unwrap();
    harness.repo.rollback(tx).await.unwrap();
    assert_eq!(again.len(), 1);
}
