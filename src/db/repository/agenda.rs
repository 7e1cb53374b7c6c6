//! Agenda store trait: photographer occupied intervals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryResult;
use crate::api::{AgendaEntryId, PhotographerId};
use crate::db::Tx;
use crate::models::{AgendaEntry, AgendaEntryDraft, AgendaEntrySource, AgendaEntryType};

/// Persistence of photographer occupied intervals.
///
/// Range queries use half-open interval intersection
/// (`ends_at > from AND starts_at < to`) and are stable-ordered by
/// `(starts_at ASC, id ASC)`. Blocking entries of one photographer never
/// overlap: [`AgendaRepository::create_entries`] fails with a conflict when
/// an insert would violate that.
#[async_trait]
pub trait AgendaRepository: Send + Sync {
    /// Insert a batch of entries, returning the new ids in input order.
    ///
    /// Fails with a conflict when a blocking entry would overlap an existing
    /// blocking entry of the same photographer (including an earlier entry
    /// of the same batch).
    async fn create_entries(
        &self,
        tx: &mut Tx,
        entries: &[AgendaEntryDraft],
    ) -> RepositoryResult<Vec<AgendaEntryId>>;

    /// All entries intersecting the window, optionally filtered by type.
    async fn list_entries_by_range(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        entry_type: Option<AgendaEntryType>,
    ) -> RepositoryResult<Vec<AgendaEntry>>;

    /// Only blocking entries intersecting the window. Used by the
    /// reservation coordinator under the writing transaction.
    async fn find_blocking_entries(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<AgendaEntry>>;

    /// Fetch one entry; not-found when absent.
    async fn get_entry_by_id(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
    ) -> RepositoryResult<AgendaEntry>;

    /// Fetch one entry acquiring a row lock. Requires a read-write
    /// transaction.
    async fn get_entry_by_id_for_update(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
    ) -> RepositoryResult<AgendaEntry>;

    /// Full-field update keyed by id; used for time-off edits.
    async fn update_entry(&self, tx: &mut Tx, entry: &AgendaEntry) -> RepositoryResult<()>;

    /// Narrow setter for a source id assigned after insert.
    async fn update_entry_source_id(
        &self,
        tx: &mut Tx,
        entry_id: AgendaEntryId,
        source_id: i64,
    ) -> RepositoryResult<()>;

    /// Delete one entry by id; not-found when absent.
    async fn delete_entry_by_id(&self, tx: &mut Tx, entry_id: AgendaEntryId)
        -> RepositoryResult<()>;

    /// Delete entries by (photographer, type, source[, source id]); returns
    /// the number of rows removed (zero is not an error).
    async fn delete_entries_by_source(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        entry_type: AgendaEntryType,
        source: AgendaEntrySource,
        source_id: Option<i64>,
    ) -> RepositoryResult<u64>;

    /// Bounded deletion of entries ending before the cutoff and not
    /// referenced by any booking. The limit is clamped into the hard
    /// retention bounds; returns the number of rows removed.
    async fn delete_old_agenda_entries(
        &self,
        tx: &mut Tx,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<u64>;
}
