//! Booking store trait: photo session lifecycle records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryResult;
use crate::api::{AgendaEntryId, BookingId, ListingIdentityId};
use crate::db::Tx;
use crate::models::{Booking, BookingDraft, BookingStatus};

/// Persistence and pessimistic lookup of bookings.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking pointing at an agenda entry; returns the new id.
    ///
    /// Fails with a conflict when the listing identity already holds a
    /// non-terminal booking (listing single-flight).
    async fn create_booking(&self, tx: &mut Tx, booking: &BookingDraft)
        -> RepositoryResult<BookingId>;

    /// Full-field update keyed by id.
    async fn update_booking(&self, tx: &mut Tx, booking: &Booking) -> RepositoryResult<()>;

    /// Narrow status setter. Fails with a conflict when the current status
    /// does not allow the transition.
    async fn update_booking_status(
        &self,
        tx: &mut Tx,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<()>;

    /// Fetch one booking; not-found when absent.
    async fn get_booking_by_id(&self, tx: &mut Tx, booking_id: BookingId)
        -> RepositoryResult<Booking>;

    /// Fetch one booking acquiring a row lock. Requires a read-write
    /// transaction.
    async fn get_booking_by_id_for_update(
        &self,
        tx: &mut Tx,
        booking_id: BookingId,
    ) -> RepositoryResult<Booking>;

    /// Fetch the booking referencing an agenda entry; not-found when absent.
    async fn find_booking_by_agenda_entry(
        &self,
        tx: &mut Tx,
        agenda_entry_id: AgendaEntryId,
    ) -> RepositoryResult<Booking>;

    /// The unique non-terminal booking for a listing identity, preferring
    /// the most recent id; not-found when none.
    async fn get_active_booking_by_listing_identity(
        &self,
        tx: &mut Tx,
        listing_identity_id: ListingIdentityId,
    ) -> RepositoryResult<Booking>;

    /// Bounded deletion of terminal bookings ending before the cutoff. The
    /// limit is clamped into the hard retention bounds; returns the number
    /// of rows removed.
    async fn delete_old_bookings(
        &self,
        tx: &mut Tx,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<u64>;
}
