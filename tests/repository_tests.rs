//! Store-level contracts exercised against the in-memory backend.

mod support;

use chrono::{TimeZone, Utc};

use fotoagenda::api::{AgendaEntryId, ListingIdentityId};
use fotoagenda::db::{
    AgendaRepository, BookingRepository, EngagementRepository, TransactionManager,
};
use fotoagenda::models::{
    AgendaEntryDraft, AgendaEntrySource, AgendaEntryType, BookingDraft, BookingStatus,
};

use support::{Harness, PHOTOGRAPHER};

fn utc(d: u32, h: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
}

fn draft(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> AgendaEntryDraft {
    AgendaEntryDraft::new(
        PHOTOGRAPHER,
        AgendaEntryType::TimeOff,
        AgendaEntrySource::Manual,
        start,
        end,
        "UTC",
    )
}

#[tokio::test]
async fn blocking_entries_never_overlap() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 10), utc(11, 14))])
        .await
        .unwrap();

    let err = harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 12), utc(11, 16))])
        .await
        .expect_err("overlap must conflict");
    assert!(err.is_conflict());

    // Touching intervals are fine.
    harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 14), utc(11, 16))])
        .await
        .expect("adjacent interval");

    // Non-blocking entries may overlap anything.
    harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 10), utc(11, 18)).non_blocking()])
        .await
        .expect("non-blocking overlay");

    harness.repo.commit(tx).await.unwrap();
}

#[tokio::test]
async fn batch_conflicts_roll_back_with_the_transaction() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    let err = harness
        .repo
        .create_entries(
            &mut tx,
            &[
                draft(utc(11, 8), utc(11, 12)),
                draft(utc(11, 10), utc(11, 14)),
            ],
        )
        .await
        .expect_err("second draft overlaps the first");
    assert!(err.is_conflict());
    harness.repo.rollback(tx).await.unwrap();

    // Nothing from the failed batch is visible.
    assert!(harness.repo.agenda_snapshot(1).await.is_none());
}

#[tokio::test]
async fn range_listing_is_stable_ordered() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    let ids = harness
        .repo
        .create_entries(
            &mut tx,
            &[
                draft(utc(12, 8), utc(12, 10)),
                draft(utc(11, 8), utc(11, 10)),
                draft(utc(11, 12), utc(11, 14)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(ids, vec![AgendaEntryId(1), AgendaEntryId(2), AgendaEntryId(3)]);

    let listed = harness
        .repo
        .list_entries_by_range(&mut tx, PHOTOGRAPHER, utc(10, 0), utc(13, 0), None)
        .await
        .unwrap();
    let listed_ids: Vec<i64> = listed.iter().map(|entry| entry.id.value()).collect();
    assert_eq!(listed_ids, vec![2, 3, 1]);

    // Half-open window semantics: an entry ending exactly at `from` is out.
    let empty = harness
        .repo
        .list_entries_by_range(&mut tx, PHOTOGRAPHER, utc(11, 10), utc(11, 12), None)
        .await
        .unwrap();
    assert!(empty.is_empty());

    harness.repo.rollback(tx).await.unwrap();
}

#[tokio::test]
async fn read_only_transactions_refuse_writes_and_locks() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin_read_only().await.unwrap();
    let err = harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 8), utc(11, 12))])
        .await
        .expect_err("read-only transaction");
    assert!(matches!(
        err,
        fotoagenda::db::RepositoryError::TransactionError { .. }
    ));

    let err = harness
        .repo
        .get_entry_by_id_for_update(&mut tx, AgendaEntryId(1))
        .await
        .expect_err("row lock needs a writer");
    assert!(matches!(
        err,
        fotoagenda::db::RepositoryError::TransactionError { .. }
    ));
    harness.repo.rollback(tx).await.unwrap();
}

#[tokio::test]
async fn uncommitted_writes_are_invisible() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 8), utc(11, 12))])
        .await
        .unwrap();
    harness.repo.rollback(tx).await.unwrap();

    assert!(harness.repo.agenda_snapshot(1).await.is_none());
}

#[tokio::test]
async fn booking_status_transitions_are_store_enforced() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    let entry_ids = harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 8), utc(11, 12))])
        .await
        .unwrap();
    let booking_id = harness
        .repo
        .create_booking(
            &mut tx,
            &BookingDraft::new(
                entry_ids[0],
                PHOTOGRAPHER,
                ListingIdentityId(42),
                utc(11, 8),
                utc(11, 12),
                BookingStatus::PendingApproval,
            ),
        )
        .await
        .unwrap();

    // PENDING_APPROVAL -> ACTIVE skips a state: conflict.
    let err = harness
        .repo
        .update_booking_status(&mut tx, booking_id, BookingStatus::Active)
        .await
        .expect_err("must go through ACCEPTED");
    assert!(err.is_conflict());

    harness
        .repo
        .update_booking_status(&mut tx, booking_id, BookingStatus::Accepted)
        .await
        .unwrap();
    harness
        .repo
        .update_booking_status(&mut tx, booking_id, BookingStatus::Active)
        .await
        .unwrap();
    harness
        .repo
        .update_booking_status(&mut tx, booking_id, BookingStatus::Done)
        .await
        .unwrap();

    // DONE is terminal.
    let err = harness
        .repo
        .update_booking_status(&mut tx, booking_id, BookingStatus::Cancelled)
        .await
        .expect_err("terminal state");
    assert!(err.is_conflict());

    harness.repo.commit(tx).await.unwrap();
}

#[tokio::test]
async fn active_booking_lookup_prefers_latest_open() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    let entry_ids = harness
        .repo
        .create_entries(
            &mut tx,
            &[
                draft(utc(11, 8), utc(11, 12)),
                draft(utc(12, 8), utc(12, 12)),
            ],
        )
        .await
        .unwrap();

    // First booking ends terminal, second stays open.
    harness
        .repo
        .create_booking(
            &mut tx,
            &BookingDraft::new(
                entry_ids[0],
                PHOTOGRAPHER,
                ListingIdentityId(42),
                utc(11, 8),
                utc(11, 12),
                BookingStatus::Cancelled,
            ),
        )
        .await
        .unwrap();
    let open_id = harness
        .repo
        .create_booking(
            &mut tx,
            &BookingDraft::new(
                entry_ids[1],
                PHOTOGRAPHER,
                ListingIdentityId(42),
                utc(12, 8),
                utc(12, 12),
                BookingStatus::Accepted,
            ),
        )
        .await
        .unwrap();

    let found = harness
        .repo
        .get_active_booking_by_listing_identity(&mut tx, ListingIdentityId(42))
        .await
        .unwrap();
    assert_eq!(found.id, open_id);

    // A second open booking for the same identity is refused.
    let err = harness
        .repo
        .create_booking(
            &mut tx,
            &BookingDraft::new(
                entry_ids[0],
                PHOTOGRAPHER,
                ListingIdentityId(42),
                utc(11, 8),
                utc(11, 12),
                BookingStatus::PendingApproval,
            ),
        )
        .await
        .expect_err("single-flight per listing identity");
    assert!(err.is_conflict());

    let missing = harness
        .repo
        .get_active_booking_by_listing_identity(&mut tx, ListingIdentityId(777))
        .await
        .expect_err("no booking for identity");
    assert!(missing.is_not_found());

    harness.repo.commit(tx).await.unwrap();
}

#[tokio::test]
async fn find_booking_by_agenda_entry_round_trips() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    let entry_ids = harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 8), utc(11, 12))])
        .await
        .unwrap();
    let booking_id = harness
        .repo
        .create_booking(
            &mut tx,
            &BookingDraft::new(
                entry_ids[0],
                PHOTOGRAPHER,
                ListingIdentityId(42),
                utc(11, 8),
                utc(11, 12),
                BookingStatus::Accepted,
            ),
        )
        .await
        .unwrap();

    let found = harness
        .repo
        .find_booking_by_agenda_entry(&mut tx, entry_ids[0])
        .await
        .unwrap();
    assert_eq!(found.id, booking_id);

    let missing = harness
        .repo
        .find_booking_by_agenda_entry(&mut tx, AgendaEntryId(555))
        .await
        .expect_err("no booking for entry");
    assert!(missing.is_not_found());

    harness.repo.commit(tx).await.unwrap();
}

#[tokio::test]
async fn delete_entries_by_source_filters_on_source_id() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    harness
        .repo
        .create_entries(
            &mut tx,
            &[
                draft(utc(11, 8), utc(11, 10)).with_source_id(1),
                draft(utc(11, 10), utc(11, 12)).with_source_id(2),
                draft(utc(11, 12), utc(11, 14)).with_source_id(1),
            ],
        )
        .await
        .unwrap();

    let deleted = harness
        .repo
        .delete_entries_by_source(
            &mut tx,
            PHOTOGRAPHER,
            AgendaEntryType::TimeOff,
            AgendaEntrySource::Manual,
            Some(1),
        )
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    let remaining = harness
        .repo
        .delete_entries_by_source(
            &mut tx,
            PHOTOGRAPHER,
            AgendaEntryType::TimeOff,
            AgendaEntrySource::Manual,
            None,
        )
        .await
        .unwrap();
    assert_eq!(remaining, 1);

    // Deleting again removes nothing and is not an error.
    let none = harness
        .repo
        .delete_entries_by_source(
            &mut tx,
            PHOTOGRAPHER,
            AgendaEntryType::TimeOff,
            AgendaEntrySource::Manual,
            None,
        )
        .await
        .unwrap();
    assert_eq!(none, 0);

    harness.repo.commit(tx).await.unwrap();
}

#[tokio::test]
async fn view_counter_is_strictly_increasing() {
    let harness = Harness::auto_approval();

    let mut previous = 0;
    for _ in 0..5 {
        let mut tx = harness.repo.begin().await.unwrap();
        let views = harness
            .repo
            .increment_and_get_views(&mut tx, ListingIdentityId(42), utc(11, 9))
            .await
            .unwrap();
        harness.repo.commit(tx).await.unwrap();
        assert!(views > previous);
        previous = views;
    }
    assert_eq!(previous, 5);
}

#[tokio::test]
async fn update_entry_source_id_is_a_narrow_setter() {
    let harness = Harness::auto_approval();

    let mut tx = harness.repo.begin().await.unwrap();
    let ids = harness
        .repo
        .create_entries(&mut tx, &[draft(utc(11, 8), utc(11, 10))])
        .await
        .unwrap();
    harness
        .repo
        .update_entry_source_id(&mut tx, ids[0], 42)
        .await
        .unwrap();
    let entry = harness.repo.get_entry_by_id(&mut tx, ids[0]).await.unwrap();
    assert_eq!(entry.source_id, Some(42));

    let missing = harness
        .repo
        .update_entry_source_id(&mut tx, AgendaEntryId(99), 42)
        .await
        .expect_err("unknown entry");
    assert!(missing.is_not_found());

    harness.repo.commit(tx).await.unwrap();
}
