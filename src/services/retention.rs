//! Retention sweeper: bounded-batch deletion of old agenda entries and
//! terminal bookings.
//!
//! Each sweep is its own transaction and has no coupling to the online
//! scheduling paths. Limits clamp into the configured bounds; a counter
//! metric is emitted on success and a log line only when rows were
//! actually removed.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::SchedulingConfig;
use crate::db::{AgendaRepository, BookingRepository, FullRepository, TransactionManager};
use crate::error::{map_repo_err, CoreError, CoreResult};

const BOOKINGS_DELETED_COUNTER: &str = "photo_session_bookings_cleaner_deleted_total";
const AGENDA_DELETED_COUNTER: &str = "photo_session_agenda_cleaner_deleted_total";

/// Background cleaner for expired scheduling rows.
pub struct RetentionSweeper {
    repo: Arc<dyn FullRepository>,
    cfg: SchedulingConfig,
}

impl RetentionSweeper {
    pub fn new(repo: Arc<dyn FullRepository>, cfg: SchedulingConfig) -> Self {
        Self { repo, cfg }
    }

    /// Delete up to `limit` terminal bookings that ended before the cutoff.
    /// A zero limit selects the configured default. Returns the number of
    /// rows removed.
    pub async fn clean_old_bookings(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<u64> {
        let limit = self.cfg.clamp_retention_limit(limit);

        let mut tx = self
            .repo
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .repo
            .delete_old_bookings(&mut tx, cutoff, limit)
            .await
            .map_err(|e| map_repo_err("Booking", e));

        match result {
            Ok(deleted) => {
                self.repo
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit booking sweep", e))?;
                metrics::counter!(BOOKINGS_DELETED_COUNTER).increment(deleted);
                if deleted > 0 {
                    tracing::info!(deleted, cutoff = %cutoff, "photo_session.bookings_cleaner.swept");
                }
                Ok(deleted)
            }
            Err(err) => {
                if let Err(rb_err) = self.repo.rollback(tx).await {
                    tracing::error!(error = %rb_err, "photo_session.bookings_cleaner.rollback_error");
                }
                Err(err)
            }
        }
    }

    /// Delete up to `limit` agenda entries that ended before the cutoff and
    /// are not referenced by any booking. Returns the number of rows
    /// removed.
    pub async fn clean_old_agenda_entries(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<u64> {
        let limit = self.cfg.clamp_retention_limit(limit);

        let mut tx = self
            .repo
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .repo
            .delete_old_agenda_entries(&mut tx, cutoff, limit)
            .await
            .map_err(|e| map_repo_err("Agenda entry", e));

        match result {
            Ok(deleted) => {
                self.repo
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit agenda sweep", e))?;
                metrics::counter!(AGENDA_DELETED_COUNTER).increment(deleted);
                if deleted > 0 {
                    tracing::info!(deleted, cutoff = %cutoff, "photo_session.agenda_cleaner.swept");
                }
                Ok(deleted)
            }
            Err(err) => {
                if let Err(rb_err) = self.repo.rollback(tx).await {
                    tracing::error!(error = %rb_err, "photo_session.agenda_cleaner.rollback_error");
                }
                Err(err)
            }
        }
    }

    /// Run both sweeps once with the configured default batch size,
    /// draining nothing more than one batch each.
    pub async fn run_once(&self, cutoff: DateTime<Utc>) -> CoreResult<(u64, u64)> {
        let bookings = self.clean_old_bookings(cutoff, 0).await?;
        let agenda = self.clean_old_agenda_entries(cutoff, 0).await?;
        Ok((bookings, agenda))
    }
}
