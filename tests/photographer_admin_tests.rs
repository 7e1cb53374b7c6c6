//! Time-off management, service areas and engagement aggregates.

mod support;

use chrono::{TimeZone, Utc};

use fotoagenda::api::{PhotographerId, UserId};
use fotoagenda::error::{ConflictError, CoreError};
use fotoagenda::models::ResponseKind;
use fotoagenda::services::{
    CreateServiceAreaInput, CreateTimeOffInput, DeleteTimeOffInput, ListTimeOffInput,
    RecordOwnerResponseInput, UpdateServiceAreaInput, UpdateTimeOffInput,
};

use support::{Harness, OWNER, PHOTOGRAPHER};

fn utc(d: u32, h: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
}

fn time_off(start_d: u32, start_h: u32, end_d: u32, end_h: u32) -> CreateTimeOffInput {
    CreateTimeOffInput {
        photographer_id: PHOTOGRAPHER,
        starts_at: utc(start_d, start_h),
        ends_at: utc(end_d, end_h),
        reason: None,
        timezone: Some("America/Sao_Paulo".to_string()),
    }
}

#[tokio::test]
async fn time_off_crud_round_trip() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let id = harness
        .service
        .create_time_off(CreateTimeOffInput {
            reason: Some("  vacation  ".to_string()),
            ..time_off(17, 8, 21, 18)
        })
        .await
        .expect("create succeeds");

    let detail = harness
        .service
        .get_time_off_detail(
            DeleteTimeOffInput {
                time_off_id: id,
                photographer_id: PHOTOGRAPHER,
            },
            None,
        )
        .await
        .expect("detail found");
    assert_eq!(detail.time_off.reason.as_deref(), Some("vacation"));

    let updated = harness
        .service
        .update_time_off(UpdateTimeOffInput {
            time_off_id: id,
            photographer_id: PHOTOGRAPHER,
            starts_at: utc(18, 8),
            ends_at: utc(22, 18),
            reason: None,
            timezone: Some("America/Sao_Paulo".to_string()),
        })
        .await
        .expect("update succeeds");
    assert_eq!(updated.time_off.starts_at, utc(18, 8));
    assert!(updated.time_off.reason.is_none());

    let listed = harness
        .service
        .list_time_off(ListTimeOffInput {
            photographer_id: PHOTOGRAPHER,
            from: utc(1, 0),
            to: utc(31, 0),
            page: 0,
            size: 0,
            timezone: None,
        })
        .await
        .expect("list succeeds");
    assert_eq!(listed.total, 1);

    harness
        .service
        .delete_time_off(DeleteTimeOffInput {
            time_off_id: id,
            photographer_id: PHOTOGRAPHER,
        })
        .await
        .expect("delete succeeds");

    let err = harness
        .service
        .get_time_off_detail(
            DeleteTimeOffInput {
                time_off_id: id,
                photographer_id: PHOTOGRAPHER,
            },
            None,
        )
        .await
        .expect_err("gone");
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn time_off_is_fenced_to_its_owner() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let id = harness
        .service
        .create_time_off(time_off(17, 8, 18, 18))
        .await
        .unwrap();

    let err = harness
        .service
        .delete_time_off(DeleteTimeOffInput {
            time_off_id: id,
            photographer_id: PhotographerId(8),
        })
        .await
        .expect_err("someone else's entry");
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn overlapping_time_off_conflicts() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    harness
        .service
        .create_time_off(time_off(17, 8, 18, 18))
        .await
        .unwrap();

    let err = harness
        .service
        .create_time_off(time_off(18, 8, 19, 18))
        .await
        .expect_err("overlaps the first window");
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictError::SlotUnavailable)
    ));

    // Moving a second, disjoint window onto the first also conflicts.
    let second = harness
        .service
        .create_time_off(time_off(20, 8, 21, 18))
        .await
        .unwrap();
    let err = harness
        .service
        .update_time_off(UpdateTimeOffInput {
            time_off_id: second,
            photographer_id: PHOTOGRAPHER,
            starts_at: utc(17, 12),
            ends_at: utc(19, 12),
            reason: None,
            timezone: None,
        })
        .await
        .expect_err("would land on the first window");
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictError::SlotUnavailable)
    ));
}

#[tokio::test]
async fn inverted_time_off_window_is_rejected() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let err = harness
        .service
        .create_time_off(time_off(18, 8, 17, 8))
        .await
        .expect_err("inverted window");
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn service_area_uniqueness_is_case_insensitive() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    // seed_default already registered São Paulo/SP for the photographer.
    let err = harness
        .service
        .create_service_area(CreateServiceAreaInput {
            photographer_id: PHOTOGRAPHER,
            city: "  são paulo ".to_string(),
            state: "sp".to_string(),
        })
        .await
        .expect_err("duplicate area");
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictError::AlreadyExists)
    ));

    let id = harness
        .service
        .create_service_area(CreateServiceAreaInput {
            photographer_id: PHOTOGRAPHER,
            city: "Campinas".to_string(),
            state: "sp".to_string(),
        })
        .await
        .expect("new city is fine");

    let listed = harness
        .service
        .list_service_areas(PHOTOGRAPHER, 0, 0)
        .await
        .unwrap();
    assert_eq!(listed.total, 2);
    // States normalize to uppercase on the way in.
    assert!(listed.areas.iter().all(|area| area.state == "SP"));

    // Updating onto an existing pair conflicts as well.
    let err = harness
        .service
        .update_service_area(UpdateServiceAreaInput {
            photographer_id: PHOTOGRAPHER,
            service_area_id: id,
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
        })
        .await
        .expect_err("collides with the seeded area");
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictError::AlreadyExists)
    ));

    harness
        .service
        .delete_service_area(PHOTOGRAPHER, id)
        .await
        .expect("delete succeeds");
}

#[tokio::test]
async fn owner_response_metrics_aggregate_monotonically() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let first = harness
        .service
        .record_owner_response(RecordOwnerResponseInput {
            owner_id: OWNER,
            kind: ResponseKind::Visit,
            elapsed_seconds: 60.0,
        })
        .await
        .unwrap();
    assert_eq!(first.visit_count, 1);
    assert!((first.visit_avg_seconds - 60.0).abs() < 1e-9);

    let second = harness
        .service
        .record_owner_response(RecordOwnerResponseInput {
            owner_id: OWNER,
            kind: ResponseKind::Visit,
            elapsed_seconds: 180.0,
        })
        .await
        .unwrap();
    assert_eq!(second.visit_count, 2);
    assert!((second.visit_avg_seconds - 120.0).abs() < 1e-9);
    assert_eq!(second.proposal_count, 0);

    let err = harness
        .service
        .record_owner_response(RecordOwnerResponseInput {
            owner_id: UserId(0),
            kind: ResponseKind::Proposal,
            elapsed_seconds: 1.0,
        })
        .await
        .expect_err("invalid owner");
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn listing_views_count_up() {
    let harness = Harness::auto_approval();
    harness.seed_default().await;

    let mut last = 0;
    for _ in 0..3 {
        let views = harness
            .service
            .register_listing_view(support::LISTING_IDENTITY)
            .await
            .unwrap();
        assert!(views > last);
        last = views;
    }
    assert_eq!(last, 3);
}
