//! Shared harness for integration tests: an in-memory repository, a pinned
//! clock, and a scheduler service wired with a real notification queue.

// Each integration binary uses a different slice of the harness.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;

use fotoagenda::api::{ListingId, ListingIdentityId, PhotographerId, UserId};
use fotoagenda::config::SchedulingConfig;
use fotoagenda::db::repositories::LocalRepository;
use fotoagenda::db::TransactionManager;
use fotoagenda::models::{Listing, ListingStatus, User};
use fotoagenda::services::{
    FixedClock, NotificationIntent, NotificationQueue, SchedulerService,
};

pub const PHOTOGRAPHER: PhotographerId = PhotographerId(7);
pub const OWNER: UserId = UserId(100);
pub const LISTING_IDENTITY: ListingIdentityId = ListingIdentityId(42);
pub const LISTING_VERSION: ListingId = ListingId(420);

/// 2025-03-10T09:00:00Z, a Monday morning.
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub repo: Arc<LocalRepository>,
    pub clock: Arc<FixedClock>,
    pub service: SchedulerService,
    pub intents: mpsc::Receiver<NotificationIntent>,
}

impl Harness {
    /// Build a harness with the given config and the reference clock.
    pub fn new(cfg: SchedulingConfig) -> Self {
        let repo = Arc::new(LocalRepository::new());
        let clock = Arc::new(FixedClock::at(reference_now()));
        let (queue, intents) = NotificationQueue::bounded(16);
        let service = SchedulerService::new(repo.clone(), clock.clone(), queue, cfg)
            .expect("valid test config");
        Self {
            repo,
            clock,
            service,
            intents,
        }
    }

    pub fn auto_approval() -> Self {
        Self::new(SchedulingConfig {
            require_photographer_approval: false,
            ..SchedulingConfig::default()
        })
    }

    pub fn manual_approval() -> Self {
        Self::new(SchedulingConfig::default())
    }

    /// Seed the standard scenario: photographer 7 serving São Paulo/SP,
    /// owner 100 with listing identity 42 awaiting photo scheduling.
    pub async fn seed_default(&self) {
        self.seed_photographer(PHOTOGRAPHER).await;
        self.repo
            .seed_user(User {
                id: OWNER,
                full_name: "Listing Owner".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                timezone: None,
                photographer: false,
            })
            .await;
        self.seed_listing(LISTING_VERSION, LISTING_IDENTITY, OWNER).await;
    }

    pub async fn seed_photographer(&self, id: PhotographerId) {
        self.repo
            .seed_user(User {
                id: UserId(id.value()),
                full_name: format!("Photographer {id}"),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                timezone: Some("America/Sao_Paulo".to_string()),
                photographer: true,
            })
            .await;

        let mut tx = self.repo.begin().await.expect("begin");
        use fotoagenda::db::ServiceAreaRepository;
        self.repo
            .create_service_area(
                &mut tx,
                &fotoagenda::models::ServiceArea {
                    id: fotoagenda::api::ServiceAreaId(0),
                    photographer_id: id,
                    city: "São Paulo".to_string(),
                    state: "SP".to_string(),
                },
            )
            .await
            .expect("service area");
        self.repo.commit(tx).await.expect("commit");
    }

    pub async fn seed_listing(
        &self,
        version: ListingId,
        identity: ListingIdentityId,
        owner: UserId,
    ) {
        self.repo
            .seed_listing(Listing {
                id: version,
                identity_id: identity,
                user_id: owner,
                status: ListingStatus::PendingPhotoScheduling,
                deleted: false,
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                code: 1001,
            })
            .await;
    }

    pub async fn listing_status(&self, version: ListingId) -> ListingStatus {
        self.repo
            .listing_snapshot(version.value())
            .await
            .expect("listing seeded")
            .status
    }
}
