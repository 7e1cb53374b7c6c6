//! Agenda store implementation over the in-memory state.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{local_tx_mut, LocalRepository};
use crate::api::{AgendaEntryId, PhotographerId};
use crate::db::repository::{
    clamp_retention_limit, AgendaRepository, ErrorContext, RepositoryError, RepositoryResult,
};
use crate::db::Tx;
use crate::models::{AgendaEntry, AgendaEntryDraft, AgendaEntrySource, AgendaEntryType};

fn sort_by_start_then_id(entries: &mut [AgendaEntry]) {
    entries.sort_by(|a, b| {
        a.starts_at
            .cmp(&b.starts_at)
            .then_with(|| a.id.value().cmp(&b.id.value()))
    });
}

#[async_trait]
impl AgendaRepository for LocalRepository {
    async fn create_entries(
        &self,
        tx: &mut Tx,
        entries: &[AgendaEntryDraft],
    ) -> RepositoryResult<Vec<AgendaEntryId>> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;

        let mut ids = Vec::with_capacity(entries.len());
        for draft in entries {
            if !draft.is_well_formed() {
                return Err(RepositoryError::validation(
                    "agenda entry interval is empty or inverted",
                ));
            }

            if draft.blocking {
                let clash = state.agenda.values().find(|existing| {
                    existing.blocking
                        && existing.photographer_id == draft.photographer_id
                        && existing.overlaps(draft.starts_at, draft.ends_at)
                });
                if let Some(existing) = clash {
                    return Err(RepositoryError::conflict_with_context(
                        "blocking agenda entries overlap",
                        ErrorContext::new("create_entries")
                            .with_entity("agenda_entry")
                            .with_entity_id(existing.id.value()),
                    ));
                }
            }

            state.next_agenda_id += 1;
            let id = AgendaEntryId(state.next_agenda_id);
            state.agenda.insert(id.value(), draft.clone().into_entry(id));
            ids.push(id);
        }

        Ok(ids)
    }

    async fn list_entries_by_range(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        entry_type: Option<AgendaEntryType>,
    ) -> RepositoryResult<Vec<AgendaEntry>> {
        let local = local_tx_mut(tx)?;
        let mut entries: Vec<AgendaEntry> = local
            .state()
            .agenda
            .values()
            .filter(|entry| entry.photographer_id == photographer_id)
            .filter(|entry| entry.overlaps(from, to))
            .filter(|entry| entry_type.map_or(true, |ty| entry.entry_type == ty))
            .cloned()
            .collect();
        sort_by_start_then_id(&mut entries);
        Ok(entries)
    }

    async fn find_blocking_entries(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<AgendaEntry>> {
        let local = local_tx_mut(tx)?;
        let mut entries: Vec<AgendaEntry> = local
            .state()
            .agenda
            .values()
            .filter(|entry| {
                entry.blocking
                    && entry.photographer_id == photographer_id
                    && entry.overlaps(from, to)
            })
            .cloned()
            .collect();
        sort_by_start_then_id(&mut entries);
        Ok(entries)
    }

    async fn get_entry_by_id(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
    ) -> RepositoryResult<AgendaEntry> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .agenda
            .get(&entry_id.value())
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    "agenda entry not found",
                    ErrorContext::new("get_entry_by_id").with_entity_id(entry_id.value()),
                )
            })
    }

    async fn get_entry_by_id_for_update(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
    ) -> RepositoryResult<AgendaEntry> {
        let local = local_tx_mut(tx)?;
        if local.is_read_only() {
            return Err(RepositoryError::transaction(
                "row lock requested inside a read-only transaction",
            ));
        }
        // The transaction already owns the store-wide lock.
        local
            .state()
            .agenda
            .get(&entry_id.value())
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    "agenda entry not found",
                    ErrorContext::new("get_entry_by_id_for_update")
                        .with_entity_id(entry_id.value()),
                )
            })
    }

    async fn update_entry(&self, tx: &mut Tx, entry: &AgendaEntry) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        if !state.agenda.contains_key(&entry.id.value()) {
            return Err(RepositoryError::not_found("agenda entry not found"));
        }
        state.agenda.insert(entry.id.value(), entry.clone());
        Ok(())
    }

    async fn update_entry_source_id(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
        source_id: i64,
    ) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        match state.agenda.get_mut(&entry_id.value()) {
            Some(entry) => {
                entry.source_id = Some(source_id);
                Ok(())
            }
            None => Err(RepositoryError::not_found("agenda entry not found")),
        }
    }

    async fn delete_entry_by_id(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
    ) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        if state.agenda.remove(&entry_id.value()).is_none() {
            return Err(RepositoryError::not_found("agenda entry not found"));
        }
        Ok(())
    }

    async fn delete_entries_by_source(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        entry_type: AgendaEntryType,
        source: AgendaEntrySource,
        source_id: Option<i64>,
    ) -> RepositoryResult<u64> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        let doomed: Vec<i64> = state
            .agenda
            .values()
            .filter(|entry| {
                entry.photographer_id == photographer_id
                    && entry.entry_type == entry_type
                    && entry.source == source
                    && source_id.map_or(true, |sid| entry.source_id == Some(sid))
            })
            .map(|entry| entry.id.value())
            .collect();
        for id in &doomed {
            state.agenda.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn delete_old_agenda_entries(
        &self,
        tx: &mut Tx,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<u64> {
        let limit = clamp_retention_limit(limit);
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;

        let referenced: HashSet<i64> = state
            .bookings
            .values()
            .map(|booking| booking.agenda_entry_id.value())
            .collect();

        let doomed: Vec<i64> = state
            .agenda
            .values()
            .filter(|entry| entry.ends_at < cutoff && !referenced.contains(&entry.id.value()))
            .map(|entry| entry.id.value())
            .take(limit)
            .collect();
        for id in &doomed {
            state.agenda.remove(id);
        }
        Ok(doomed.len() as u64)
    }
}
