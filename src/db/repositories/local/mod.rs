//! In-memory repository implementation.
//!
//! Used by unit and integration tests and for local development without a
//! database. Transactions are honest but coarse: a transaction owns the
//! whole store for its lifetime (one asynchronous lock), stages its writes
//! on a private copy, and publishes them on commit. Row locks degenerate to
//! that single lock, which trivially satisfies the per-photographer
//! serialization the coordinator needs.

mod agenda;
mod booking;
mod collaborators;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api::UserId;
use crate::db::repository::{RepositoryError, RepositoryResult, TransactionManager};
use crate::db::{Tx, TxInner};
use crate::models::{
    AgendaEntry, Booking, DeviceToken, HolidayCalendar, HolidayCalendarAssociation, HolidayDate,
    Listing, ListingViewCounter, OwnerResponseMetrics, ServiceArea, User,
};

/// Mutable store contents. Cloned wholesale into each transaction's staging
/// area; the maps are small enough in tests and local runs for that to be a
/// non-issue.
#[derive(Debug, Clone, Default)]
pub(crate) struct LocalState {
    pub next_agenda_id: i64,
    pub next_booking_id: i64,
    pub next_area_id: i64,
    pub agenda: BTreeMap<i64, AgendaEntry>,
    pub bookings: BTreeMap<i64, Booking>,
    pub listings: BTreeMap<i64, Listing>,
    pub users: BTreeMap<i64, User>,
    pub device_tokens: Vec<DeviceToken>,
    pub service_areas: BTreeMap<i64, ServiceArea>,
    pub calendars: BTreeMap<i64, HolidayCalendar>,
    pub calendar_dates: Vec<HolidayDate>,
    pub associations: Vec<HolidayCalendarAssociation>,
    pub owner_metrics: BTreeMap<i64, OwnerResponseMetrics>,
    pub view_counters: BTreeMap<i64, ListingViewCounter>,
}

/// Transaction handle of the in-memory backend: the store-wide guard plus a
/// staged copy the transaction reads from and writes to.
pub struct LocalTx {
    guard: OwnedMutexGuard<LocalState>,
    staged: LocalState,
    read_only: bool,
}

impl LocalTx {
    pub(crate) fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn state(&self) -> &LocalState {
        &self.staged
    }

    /// Staged state for writing; fails on a read-only transaction.
    pub(crate) fn state_mut(&mut self) -> RepositoryResult<&mut LocalState> {
        if self.read_only {
            return Err(RepositoryError::transaction(
                "write attempted on a read-only transaction",
            ));
        }
        Ok(&mut self.staged)
    }

    fn publish(mut self) {
        let staged = std::mem::take(&mut self.staged);
        *self.guard = staged;
    }
}

/// Borrow the in-memory transaction out of the erased handle.
pub(crate) fn local_tx_mut(tx: &mut Tx) -> RepositoryResult<&mut LocalTx> {
    match &mut tx.inner {
        TxInner::Local(inner) => Ok(inner),
        #[allow(unreachable_patterns)]
        _ => Err(RepositoryError::transaction(
            "transaction handle does not belong to the in-memory backend",
        )),
    }
}

/// In-memory repository.
#[derive(Clone, Default)]
pub struct LocalRepository {
    state: Arc<Mutex<LocalState>>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the backend is reachable. Trivially true for memory; kept so
    /// the factory can expose a uniform health probe.
    pub async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    // ==================== Seeding (collaborator-owned data) ====================
    // Listings, users, device tokens and holiday catalogs belong to other
    // subsystems; tests and local runs place them directly.

    pub async fn seed_listing(&self, listing: Listing) {
        let mut state = self.state.lock().await;
        state.listings.insert(listing.id.value(), listing);
    }

    pub async fn seed_user(&self, user: User) {
        let mut state = self.state.lock().await;
        state.users.insert(user.id.value(), user);
    }

    pub async fn seed_device_token(&self, user_id: UserId, token: impl Into<String>, opted_in: bool) {
        let mut state = self.state.lock().await;
        state.device_tokens.push(DeviceToken {
            user_id,
            token: token.into(),
            opted_in,
        });
    }

    pub async fn seed_calendar(&self, calendar: HolidayCalendar, dates: Vec<HolidayDate>) {
        let mut state = self.state.lock().await;
        state.calendars.insert(calendar.id.value(), calendar);
        state.calendar_dates.extend(dates);
    }

    /// Read a listing outside any transaction (test assertions).
    pub async fn listing_snapshot(&self, listing_id: i64) -> Option<Listing> {
        self.state.lock().await.listings.get(&listing_id).cloned()
    }

    /// Read an agenda entry outside any transaction (test assertions).
    pub async fn agenda_snapshot(&self, entry_id: i64) -> Option<AgendaEntry> {
        self.state.lock().await.agenda.get(&entry_id).cloned()
    }

    /// Read a booking outside any transaction (test assertions).
    pub async fn booking_snapshot(&self, booking_id: i64) -> Option<Booking> {
        self.state.lock().await.bookings.get(&booking_id).cloned()
    }
}

#[async_trait]
impl TransactionManager for LocalRepository {
    async fn begin(&self) -> RepositoryResult<Tx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Tx {
            inner: TxInner::Local(Box::new(LocalTx {
                guard,
                staged,
                read_only: false,
            })),
        })
    }

    async fn begin_read_only(&self) -> RepositoryResult<Tx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Tx {
            inner: TxInner::Local(Box::new(LocalTx {
                guard,
                staged,
                read_only: true,
            })),
        })
    }

    async fn commit(&self, tx: Tx) -> RepositoryResult<()> {
        match tx.inner {
            TxInner::Local(inner) => {
                if !inner.read_only {
                    inner.publish();
                }
                Ok(())
            }
            #[allow(unreachable_patterns)]
            _ => Err(RepositoryError::transaction(
                "transaction handle does not belong to the in-memory backend",
            )),
        }
    }

    async fn rollback(&self, tx: Tx) -> RepositoryResult<()> {
        match tx.inner {
            // Dropping the staged copy releases the lock and discards writes.
            TxInner::Local(_) => Ok(()),
            #[allow(unreachable_patterns)]
            _ => Err(RepositoryError::transaction(
                "transaction handle does not belong to the in-memory backend",
            )),
        }
    }
}
