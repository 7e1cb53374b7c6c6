//! Booking store implementation over the in-memory state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{local_tx_mut, LocalRepository};
use crate::api::{AgendaEntryId, BookingId, ListingIdentityId};
use crate::db::repository::{
    clamp_retention_limit, BookingRepository, ErrorContext, RepositoryError, RepositoryResult,
};
use crate::db::Tx;
use crate::models::{Booking, BookingDraft, BookingStatus};

#[async_trait]
impl BookingRepository for LocalRepository {
    async fn create_booking(
        &self,
        tx: &mut Tx,
        booking: &BookingDraft,
    ) -> RepositoryResult<BookingId> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;

        if booking.status.is_open() {
            let open = state.bookings.values().find(|existing| {
                existing.listing_identity_id == booking.listing_identity_id
                    && existing.status.is_open()
            });
            if let Some(existing) = open {
                return Err(RepositoryError::conflict_with_context(
                    "listing identity already has a non-terminal booking",
                    ErrorContext::new("create_booking")
                        .with_entity("booking")
                        .with_entity_id(existing.id.value()),
                ));
            }
        }

        state.next_booking_id += 1;
        let id = BookingId(state.next_booking_id);
        state
            .bookings
            .insert(id.value(), booking.clone().into_booking(id));
        Ok(id)
    }

    async fn update_booking(&self, tx: &mut Tx, booking: &Booking) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        if !state.bookings.contains_key(&booking.id.value()) {
            return Err(RepositoryError::not_found("booking not found"));
        }
        state.bookings.insert(booking.id.value(), booking.clone());
        Ok(())
    }

    async fn update_booking_status(
        &self,
        tx: &mut Tx,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        let booking = state
            .bookings
            .get_mut(&booking_id.value())
            .ok_or_else(|| RepositoryError::not_found("booking not found"))?;

        if !booking.status.can_transition_to(status) {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "session not in transitionable state ({} -> {})",
                    booking.status, status
                ),
                ErrorContext::new("update_booking_status").with_entity_id(booking_id.value()),
            ));
        }

        booking.status = status;
        Ok(())
    }

    async fn get_booking_by_id(
        &self,
        tx: &mut Tx,
        booking_id: BookingId,
    ) -> RepositoryResult<Booking> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .bookings
            .get(&booking_id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("booking not found"))
    }

    async fn get_booking_by_id_for_update(
        &self,
        tx: &mut Tx,
        booking_id: BookingId,
    ) -> RepositoryResult<Booking> {
        let local = local_tx_mut(tx)?;
        if local.is_read_only() {
            return Err(RepositoryError::transaction(
                "row lock requested inside a read-only transaction",
            ));
        }
        local
            .state()
            .bookings
            .get(&booking_id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("booking not found"))
    }

    async fn find_booking_by_agenda_entry(
        &self,
        tx: &mut Tx,
        agenda_entry_id: AgendaEntryId,
    ) -> RepositoryResult<Booking> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .bookings
            .values()
            .find(|booking| booking.agenda_entry_id == agenda_entry_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("booking not found"))
    }

    async fn get_active_booking_by_listing_identity(
        &self,
        tx: &mut Tx,
        listing_identity_id: ListingIdentityId,
    ) -> RepositoryResult<Booking> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .bookings
            .values()
            .filter(|booking| {
                booking.listing_identity_id == listing_identity_id && booking.status.is_open()
            })
            .max_by_key(|booking| booking.id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("booking not found"))
    }

    async fn delete_old_bookings(
        &self,
        tx: &mut Tx,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<u64> {
        let limit = clamp_retention_limit(limit);
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;

        let doomed: Vec<i64> = state
            .bookings
            .values()
            .filter(|booking| booking.status.is_terminal() && booking.ends_at < cutoff)
            .map(|booking| booking.id.value())
            .take(limit)
            .collect();
        for id in &doomed {
            state.bookings.remove(id);
        }
        Ok(doomed.len() as u64)
    }
}
