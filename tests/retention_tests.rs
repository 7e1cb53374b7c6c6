//! Retention sweeper behavior: bounded batches, idempotence, and
//! protection of live rows.

mod support;

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use fotoagenda::api::ListingIdentityId;
use fotoagenda::config::SchedulingConfig;
use fotoagenda::db::{AgendaRepository, BookingRepository, TransactionManager};
use fotoagenda::models::{
    AgendaEntryDraft, AgendaEntrySource, AgendaEntryType, BookingDraft, BookingStatus,
};
use fotoagenda::services::RetentionSweeper;

use support::{Harness, PHOTOGRAPHER};

fn old_window(index: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap() + Duration::days(index);
    (start, start + Duration::hours(4))
}

/// Insert `count` terminal bookings (each with its agenda entry) ending in
/// the distant past, plus one live booking.
async fn seed_history(harness: &Harness, count: i64) {
    let mut tx = harness.repo.begin().await.unwrap();

    for index in 0..count {
        let (start, end) = old_window(index);
        let entry_ids = harness
            .repo
            .create_entries(
                &mut tx,
                &[AgendaEntryDraft::new(
                    PHOTOGRAPHER,
                    AgendaEntryType::PhotoSession,
                    AgendaEntrySource::Booking,
                    start,
                    end,
                    "America/Sao_Paulo",
                )],
            )
            .await
            .unwrap();
        harness
            .repo
            .create_booking(
                &mut tx,
                &BookingDraft::new(
                    entry_ids[0],
                    PHOTOGRAPHER,
                    ListingIdentityId(1000 + index),
                    start,
                    end,
                    BookingStatus::Cancelled,
                ),
            )
            .await
            .unwrap();
    }

    // One live booking that must survive every sweep.
    let (start, end) = old_window(count);
    let entry_ids = harness
        .repo
        .create_entries(
            &mut tx,
            &[AgendaEntryDraft::new(
                PHOTOGRAPHER,
                AgendaEntryType::PhotoSession,
                AgendaEntrySource::Booking,
                start,
                end,
                "America/Sao_Paulo",
            )],
        )
        .await
        .unwrap();
    harness
        .repo
        .create_booking(
            &mut tx,
            &BookingDraft::new(
                entry_ids[0],
                PHOTOGRAPHER,
                ListingIdentityId(999),
                start,
                end,
                BookingStatus::Active,
            ),
        )
        .await
        .unwrap();

    harness.repo.commit(tx).await.unwrap();
}

#[tokio::test]
async fn zero_limit_selects_default_and_drains_in_batches() {
    let cfg = SchedulingConfig {
        retention_default: 5,
        ..SchedulingConfig::default()
    };
    let harness = Harness::new(cfg.clone());
    harness.seed_default().await;
    seed_history(&harness, 12).await;

    let repo: Arc<dyn fotoagenda::db::FullRepository> = harness.repo.clone();
    let sweeper = RetentionSweeper::new(repo, cfg);
    let cutoff = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    // Limit 0 clamps to the configured default of 5.
    assert_eq!(sweeper.clean_old_bookings(cutoff, 0).await.unwrap(), 5);
    assert_eq!(sweeper.clean_old_bookings(cutoff, 0).await.unwrap(), 5);
    assert_eq!(sweeper.clean_old_bookings(cutoff, 0).await.unwrap(), 2);
    // Drained: repeating the sweep is a no-op.
    assert_eq!(sweeper.clean_old_bookings(cutoff, 0).await.unwrap(), 0);

    // The live booking is untouched.
    let mut tx = harness.repo.begin_read_only().await.unwrap();
    let survivor = harness
        .repo
        .get_active_booking_by_listing_identity(&mut tx, ListingIdentityId(999))
        .await
        .unwrap();
    harness.repo.rollback(tx).await.unwrap();
    assert_eq!(survivor.status, BookingStatus::Active);
}

#[tokio::test]
async fn agenda_cleaner_skips_entries_still_referenced() {
    let cfg = SchedulingConfig::default();
    let harness = Harness::new(cfg.clone());
    harness.seed_default().await;
    seed_history(&harness, 3).await;

    let repo: Arc<dyn fotoagenda::db::FullRepository> = harness.repo.clone();
    let sweeper = RetentionSweeper::new(repo, cfg);
    let cutoff = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    // While the bookings still exist, every old entry is referenced.
    assert_eq!(sweeper.clean_old_agenda_entries(cutoff, 0).await.unwrap(), 0);

    // After the bookings are swept, their entries become eligible; the
    // entry of the live booking stays referenced.
    assert_eq!(sweeper.clean_old_bookings(cutoff, 0).await.unwrap(), 3);
    assert_eq!(sweeper.clean_old_agenda_entries(cutoff, 0).await.unwrap(), 3);
    assert_eq!(sweeper.clean_old_agenda_entries(cutoff, 0).await.unwrap(), 0);
    assert!(harness.repo.agenda_snapshot(4).await.is_some());
}

#[tokio::test]
async fn oversized_limits_clamp_to_the_hard_bound() {
    let cfg = SchedulingConfig::default();
    let harness = Harness::new(cfg.clone());
    harness.seed_default().await;
    seed_history(&harness, 2).await;

    let repo: Arc<dyn fotoagenda::db::FullRepository> = harness.repo.clone();
    let sweeper = RetentionSweeper::new(repo, cfg);
    let cutoff = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    // A wild limit is accepted but clamped; with two eligible rows the
    // result is simply both of them.
    assert_eq!(
        sweeper.clean_old_bookings(cutoff, 1_000_000).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn future_rows_are_never_swept() {
    let cfg = SchedulingConfig::default();
    let harness = Harness::new(cfg.clone());
    harness.seed_default().await;
    seed_history(&harness, 2).await;

    let repo: Arc<dyn fotoagenda::db::FullRepository> = harness.repo.clone();
    let sweeper = RetentionSweeper::new(repo, cfg);
    // Cutoff before every row: nothing qualifies.
    let cutoff = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(sweeper.run_once(cutoff).await.unwrap(), (0, 0));
}
