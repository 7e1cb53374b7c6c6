//! Time-off management.
//!
//! Time-off windows are blocking agenda entries of type `TimeOff`, authored
//! by the photographer. Edits go through a row lock and re-check the
//! no-overlap invariant against the rest of the agenda.

use crate::api::PageRequest;
use crate::db::{AgendaRepository, TransactionManager, Tx};
use crate::error::{map_repo_err, map_repo_err_conflict, ConflictError, CoreError, CoreResult};
use crate::models::{AgendaEntry, AgendaEntryDraft, AgendaEntrySource, AgendaEntryType};
use crate::services::types::{
    CreateTimeOffInput, DeleteTimeOffInput, ListTimeOffInput, ListTimeOffOutput, TimeOffDetail,
    UpdateTimeOffInput,
};
use crate::services::SchedulerService;

const MAX_REASON_LENGTH: usize = 255;

fn validate_reason(reason: Option<&str>) -> CoreResult<()> {
    if let Some(reason) = reason {
        if reason.trim().len() > MAX_REASON_LENGTH {
            return Err(CoreError::validation(
                "reason",
                format!("reason must be at most {MAX_REASON_LENGTH} characters"),
            ));
        }
    }
    Ok(())
}

impl SchedulerService {
    /// Register a new time-off window.
    pub async fn create_time_off(
        &self,
        input: CreateTimeOffInput,
    ) -> CoreResult<crate::api::AgendaEntryId> {
        if !input.photographer_id.is_valid() {
            return Err(CoreError::validation(
                "photographerId",
                "photographerId must be greater than zero",
            ));
        }
        if input.ends_at <= input.starts_at {
            return Err(CoreError::validation(
                "endDate",
                "endDate must be after startDate",
            ));
        }
        validate_reason(input.reason.as_deref())?;
        let tz = self.resolve_timezone(input.timezone.as_deref())?;

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let mut draft = AgendaEntryDraft::new(
            input.photographer_id,
            AgendaEntryType::TimeOff,
            AgendaEntrySource::Manual,
            input.starts_at,
            input.ends_at,
            tz.name(),
        );
        if let Some(ref reason) = input.reason {
            draft = draft.with_reason(reason.clone());
        }

        let result = self
            .repo()
            .create_entries(&mut tx, &[draft])
            .await
            .map_err(|e| map_repo_err_conflict("Time off", e, ConflictError::SlotUnavailable));

        match result {
            Ok(ids) => {
                let id = *ids
                    .first()
                    .ok_or_else(|| CoreError::infra("no agenda entry id returned"))?;
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit time off", e))?;
                tracing::info!(
                    photographer_id = input.photographer_id.value(),
                    time_off_id = id.value(),
                    "photo_session.time_off.created"
                );
                Ok(id)
            }
            Err(err) => {
                self.rollback_quietly(tx, "create_time_off").await;
                Err(err)
            }
        }
    }

    /// Update an existing time-off window under a row lock.
    pub async fn update_time_off(&self, input: UpdateTimeOffInput) -> CoreResult<TimeOffDetail> {
        if !input.time_off_id.is_valid() {
            return Err(CoreError::validation(
                "timeOffId",
                "timeOffId must be greater than zero",
            ));
        }
        if !input.photographer_id.is_valid() {
            return Err(CoreError::validation(
                "photographerId",
                "photographerId must be greater than zero",
            ));
        }
        if input.ends_at <= input.starts_at {
            return Err(CoreError::validation(
                "endDate",
                "endDate must be after startDate",
            ));
        }
        validate_reason(input.reason.as_deref())?;
        let tz = self.resolve_timezone(input.timezone.as_deref())?;

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self.update_time_off_in_tx(&mut tx, &input, tz.name()).await;

        match result {
            Ok(entry) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit time off update", e))?;
                Ok(TimeOffDetail {
                    time_off: entry,
                    timezone: tz.name().to_string(),
                })
            }
            Err(err) => {
                self.rollback_quietly(tx, "update_time_off").await;
                Err(err)
            }
        }
    }

    async fn update_time_off_in_tx(
        &self,
        tx: &mut Tx,
        input: &UpdateTimeOffInput,
        tz_name: &str,
    ) -> CoreResult<AgendaEntry> {
        let entry = self
            .repo()
            .get_entry_by_id_for_update(tx, input.time_off_id)
            .await
            .map_err(|e| map_repo_err("Time off", e))?;

        if entry.entry_type != AgendaEntryType::TimeOff
            || entry.photographer_id != input.photographer_id
        {
            return Err(CoreError::NotFound("Time off"));
        }

        // Moving the window must not land on another blocking entry.
        let conflicts = self
            .repo()
            .find_blocking_entries(tx, input.photographer_id, input.starts_at, input.ends_at)
            .await
            .map_err(|e| map_repo_err("Agenda entry", e))?;
        if conflicts.iter().any(|other| other.id != entry.id) {
            return Err(ConflictError::SlotUnavailable.into());
        }

        let reason = input
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string);

        let updated = AgendaEntry {
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            source: AgendaEntrySource::Manual,
            blocking: true,
            reason,
            timezone: tz_name.to_string(),
            ..entry
        };

        self.repo()
            .update_entry(tx, &updated)
            .await
            .map_err(|e| map_repo_err("Time off", e))?;

        Ok(updated)
    }

    /// Remove a time-off window.
    pub async fn delete_time_off(&self, input: DeleteTimeOffInput) -> CoreResult<()> {
        if !input.time_off_id.is_valid() {
            return Err(CoreError::validation(
                "timeOffId",
                "timeOffId must be greater than zero",
            ));
        }

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = async {
            let entry = self
                .repo()
                .get_entry_by_id_for_update(&mut tx, input.time_off_id)
                .await
                .map_err(|e| map_repo_err("Time off", e))?;

            if entry.entry_type != AgendaEntryType::TimeOff
                || entry.photographer_id != input.photographer_id
            {
                return Err(CoreError::NotFound("Time off"));
            }

            self.repo()
                .delete_entry_by_id(&mut tx, input.time_off_id)
                .await
                .map_err(|e| map_repo_err("Time off", e))
        }
        .await;

        match result {
            Ok(()) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit time off removal", e))?;
                Ok(())
            }
            Err(err) => {
                self.rollback_quietly(tx, "delete_time_off").await;
                Err(err)
            }
        }
    }

    /// Paginated time-off entries over a window.
    pub async fn list_time_off(&self, input: ListTimeOffInput) -> CoreResult<ListTimeOffOutput> {
        if !input.photographer_id.is_valid() {
            return Err(CoreError::validation(
                "photographerId",
                "photographerId must be greater than zero",
            ));
        }
        if input.to < input.from {
            return Err(CoreError::validation(
                "rangeTo",
                "rangeTo must be greater than or equal to rangeFrom",
            ));
        }
        let tz = self.resolve_timezone(input.timezone.as_deref())?;
        let page = PageRequest::normalized(input.page, input.size);

        let mut tx = self
            .repo()
            .begin_read_only()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .repo()
            .list_entries_by_range(
                &mut tx,
                input.photographer_id,
                input.from,
                input.to,
                Some(AgendaEntryType::TimeOff),
            )
            .await
            .map_err(|e| map_repo_err("Time off", e));

        self.rollback_quietly(tx, "list_time_off").await;

        let entries = result?;
        let total = entries.len() as u64;
        let time_offs = page.slice(&entries);

        Ok(ListTimeOffOutput {
            time_offs,
            total,
            page: page.page,
            size: page.size,
            timezone: tz.name().to_string(),
        })
    }

    /// Fetch a single time-off entry, checking ownership.
    pub async fn get_time_off_detail(
        &self,
        input: DeleteTimeOffInput,
        timezone: Option<&str>,
    ) -> CoreResult<TimeOffDetail> {
        if !input.time_off_id.is_valid() {
            return Err(CoreError::validation(
                "timeOffId",
                "timeOffId must be greater than zero",
            ));
        }
        let tz = self.resolve_timezone(timezone)?;

        let mut tx = self
            .repo()
            .begin_read_only()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .repo()
            .get_entry_by_id(&mut tx, input.time_off_id)
            .await
            .map_err(|e| map_repo_err("Time off", e));

        self.rollback_quietly(tx, "get_time_off_detail").await;

        let entry = result?;
        if entry.entry_type != AgendaEntryType::TimeOff
            || entry.photographer_id != input.photographer_id
        {
            return Err(CoreError::NotFound("Time off"));
        }

        Ok(TimeOffDetail {
            time_off: entry,
            timezone: tz.name().to_string(),
        })
    }
}
