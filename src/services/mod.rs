//! Scheduling business logic.
//!
//! The [`SchedulerService`] is the orchestration surface over the
//! repository: availability computation, the reservation lifecycle, agenda
//! and time-off management, holiday projection and service areas. The
//! retention sweeper and the notification dispatcher run independently of
//! the request paths.
//!
//! Every operation opens exactly one transaction, validates its inputs
//! before acquiring it, and rolls back on any error. Post-commit effects
//! (notification intents) are emitted only after a successful commit.

pub mod agenda_view;
pub mod availability;
pub mod clock;
pub mod engagement;
pub mod holidays;
pub mod notification;
pub mod reservation;
pub mod retention;
pub mod service_areas;
pub mod time_off;
pub mod types;

#[cfg(test)]
#[path = "availability_tests.rs"]
mod availability_tests;

use std::sync::Arc;

use chrono_tz::Tz;

use crate::config::SchedulingConfig;
use crate::db::{FullRepository, TransactionManager, Tx};
use crate::error::{CoreError, CoreResult};

pub use clock::{Clock, FixedClock, SystemClock};
pub use notification::{
    NotificationDispatcher, NotificationGateway, NotificationIntent, NotificationQueue,
};
pub use retention::RetentionSweeper;
pub use types::*;

/// Orchestrator of the photo session scheduling core.
///
/// Dependencies are injected once at construction and immutable afterwards.
pub struct SchedulerService {
    repo: Arc<dyn FullRepository>,
    clock: Arc<dyn Clock>,
    notifications: NotificationQueue,
    cfg: SchedulingConfig,
}

impl SchedulerService {
    pub fn new(
        repo: Arc<dyn FullRepository>,
        clock: Arc<dyn Clock>,
        notifications: NotificationQueue,
        cfg: SchedulingConfig,
    ) -> CoreResult<Self> {
        cfg.validate()?;
        Ok(Self {
            repo,
            clock,
            notifications,
            cfg,
        })
    }

    pub(crate) fn repo(&self) -> &dyn FullRepository {
        self.repo.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn config(&self) -> &SchedulingConfig {
        &self.cfg
    }

    pub(crate) fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Resolve the IANA timezone for a request, falling back to the
    /// configured default.
    pub(crate) fn resolve_timezone(&self, requested: Option<&str>) -> CoreResult<Tz> {
        resolve_timezone_or(&self.cfg.default_timezone, requested)
    }

    /// Roll a transaction back, logging instead of masking the original
    /// error when the rollback itself fails.
    pub(crate) async fn rollback_quietly(&self, tx: Tx, operation: &'static str) {
        if let Err(err) = self.repo.rollback(tx).await {
            tracing::error!(error = %err, operation, "photo_session.tx_rollback_error");
        }
    }
}

/// Parse an IANA timezone name, using the fallback when absent or blank.
pub(crate) fn resolve_timezone_or(fallback: &str, requested: Option<&str>) -> CoreResult<Tz> {
    let name = match requested {
        Some(tz) if !tz.trim().is_empty() => tz.trim(),
        _ => fallback,
    };
    name.parse::<Tz>()
        .map_err(|_| CoreError::validation("timezone", format!("invalid timezone: {name}")))
}
