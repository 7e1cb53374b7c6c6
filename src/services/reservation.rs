//! Reservation coordinator: the one write path that can allocate or
//! release a photographer's time.
//!
//! Validation is fail-fast and happens before the transaction is opened.
//! Inside the transaction the coordinator re-verifies the slot under lock,
//! inserts the agenda entry and booking, and performs a guarded listing
//! transition; racing reservations surface as a guard miss. The
//! confirmation notification is emitted only after a successful commit and
//! only in auto-approval mode.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::db::{
    AgendaRepository, BookingRepository, ListingRepository, RepositoryError,
    TransactionManager, Tx,
};
use crate::error::{map_repo_err, map_repo_err_conflict, ConflictError, CoreError, CoreResult};
use crate::models::{
    AgendaEntry, AgendaEntryDraft, AgendaEntrySource, AgendaEntryType, Booking, BookingDraft,
    BookingStatus, Listing, ListingStatus,
};
use crate::services::notification::NotificationIntent;
use crate::services::types::{
    CancelSessionInput, CancelSessionOutput, ConfirmSessionInput, ConfirmSessionOutput,
    ReserveSessionInput, ReserveSessionOutput, UpdateSessionStatusInput,
};
use crate::services::SchedulerService;

/// How long a pending reservation hold is surfaced to clients.
const RESERVATION_HOLD_MINUTES: i64 = 30;

fn guard_miss_to_not_eligible(entity: &'static str, err: RepositoryError) -> CoreError {
    if err.is_not_found() {
        ConflictError::ListingNotEligible.into()
    } else {
        map_repo_err(entity, err)
    }
}

impl SchedulerService {
    /// Reserve a slot window for a listing owner.
    pub async fn reserve_photo_session(
        &self,
        input: ReserveSessionInput,
    ) -> CoreResult<ReserveSessionOutput> {
        if !input.user_id.is_valid() {
            return Err(CoreError::Auth("unauthorized".to_string()));
        }
        if !input.listing_identity_id.is_valid() {
            return Err(CoreError::validation(
                "listingId",
                "listingId must be greater than zero",
            ));
        }
        if input.slot_id.value() == 0 {
            return Err(CoreError::validation(
                "slotId",
                "slotId must be greater than zero",
            ));
        }

        let (photographer_id, slot_start) = input.slot_id.decode();
        if !photographer_id.is_valid() {
            return Err(CoreError::validation("slotId", "slotId is invalid"));
        }

        let tz = self.resolve_timezone(None)?;
        let slot_end = slot_start + self.config().slot_duration();
        if slot_end <= slot_start {
            return Err(CoreError::validation("slot", "slot duration must be positive"));
        }

        let now = self.clock().now();
        if slot_end <= now {
            return Err(ConflictError::SlotUnavailable.into());
        }

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .reserve_in_tx(&mut tx, &input, photographer_id, slot_start, slot_end, tz, now)
            .await;

        match result {
            Ok((booking_id, listing, status)) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit reservation", e))?;

                tracing::info!(
                    listing_identity_id = listing.identity_id.value(),
                    booking_id = booking_id.value(),
                    photographer_id = photographer_id.value(),
                    slot_start = %slot_start,
                    "photo_session.reserve.success"
                );

                if status == BookingStatus::Accepted {
                    let local_start = slot_start.with_timezone(&tz);
                    self.notifications().emit(NotificationIntent {
                        user_id: listing.user_id,
                        booking_id,
                        title: "Photo Session Confirmed".to_string(),
                        body: format!(
                            "Your photo session is confirmed for {}",
                            local_start.format("%Y-%m-%d %H:%M")
                        ),
                    });
                }

                Ok(ReserveSessionOutput {
                    photo_session_id: booking_id,
                    slot_id: input.slot_id,
                    slot_start,
                    slot_end,
                    photographer_id,
                    listing_identity_id: listing.identity_id,
                    status,
                })
            }
            Err(err) => {
                self.rollback_quietly(tx, "reserve").await;
                if !err.is_expected() {
                    tracing::error!(
                        listing_identity_id = input.listing_identity_id.value(),
                        error = %err,
                        "photo_session.reserve.error"
                    );
                }
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn reserve_in_tx(
        &self,
        tx: &mut Tx,
        input: &ReserveSessionInput,
        photographer_id: crate::api::PhotographerId,
        slot_start: DateTime<Utc>,
        slot_end: DateTime<Utc>,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> CoreResult<(crate::api::BookingId, Listing, BookingStatus)> {
        let listing = self
            .repo()
            .get_active_listing_version(tx, input.listing_identity_id)
            .await
            .map_err(|e| map_repo_err("Listing", e))?;

        if listing.deleted {
            return Err(CoreError::validation("listing", "listing is not available"));
        }
        if listing.user_id != input.user_id {
            return Err(CoreError::Auth("listing does not belong to user".to_string()));
        }
        if !listing.status.allows_photo_session() {
            return Err(ConflictError::ListingNotEligible.into());
        }

        let conflicts = self
            .repo()
            .find_blocking_entries(tx, photographer_id, slot_start, slot_end)
            .await
            .map_err(|e| map_repo_err("Agenda entry", e))?;
        if !conflicts.is_empty() {
            return Err(ConflictError::SlotUnavailable.into());
        }

        let entry = AgendaEntryDraft::new(
            photographer_id,
            AgendaEntryType::PhotoSession,
            AgendaEntrySource::Booking,
            slot_start,
            slot_end,
            tz.name(),
        )
        .with_source_id(input.listing_identity_id.value());

        let entry_ids = self
            .repo()
            .create_entries(tx, &[entry])
            .await
            .map_err(|e| map_repo_err_conflict("Agenda entry", e, ConflictError::SlotUnavailable))?;
        let entry_id = *entry_ids
            .first()
            .ok_or_else(|| CoreError::infra("no agenda entry id returned"))?;

        let status = if self.config().require_photographer_approval {
            BookingStatus::PendingApproval
        } else {
            BookingStatus::Accepted
        };

        let mut draft = BookingDraft::new(
            entry_id,
            photographer_id,
            input.listing_identity_id,
            slot_start,
            slot_end,
            status,
        );
        if status == BookingStatus::PendingApproval {
            draft = draft.with_reservation_hold(
                uuid::Uuid::new_v4().to_string(),
                now + chrono::Duration::minutes(RESERVATION_HOLD_MINUTES),
            );
        }

        let booking_id = self
            .repo()
            .create_booking(tx, &draft)
            .await
            .map_err(|e| {
                map_repo_err_conflict("Booking", e, ConflictError::ListingNotEligible)
            })?;

        let target = if status == BookingStatus::Accepted {
            ListingStatus::PhotosScheduled
        } else {
            ListingStatus::PendingPhotoConfirmation
        };
        self.repo()
            .update_listing_status(tx, listing.id, target, listing.status)
            .await
            .map_err(|e| guard_miss_to_not_eligible("Listing", e))?;

        Ok((booking_id, listing, status))
    }

    /// Finalize an accepted reservation after the owner's confirmation.
    pub async fn confirm_photo_session(
        &self,
        input: ConfirmSessionInput,
    ) -> CoreResult<ConfirmSessionOutput> {
        if !input.user_id.is_valid() {
            return Err(CoreError::Auth("unauthorized".to_string()));
        }
        if !input.listing_id.is_valid() {
            return Err(CoreError::validation(
                "listingId",
                "listingId must be greater than zero",
            ));
        }
        if !input.photo_session_id.is_valid() {
            return Err(CoreError::validation(
                "photoSessionId",
                "photoSessionId must be greater than zero",
            ));
        }

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self.confirm_in_tx(&mut tx, &input).await;

        match result {
            Ok((booking, listing, entry)) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit confirmation", e))?;

                tracing::info!(
                    booking_id = booking.id.value(),
                    listing_id = listing.id.value(),
                    "photo_session.confirm.success"
                );

                Ok(ConfirmSessionOutput {
                    photo_session_id: booking.id,
                    slot_start: booking.starts_at,
                    slot_end: booking.ends_at,
                    photographer_id: booking.photographer_id,
                    listing_id: listing.id,
                    status: BookingStatus::Active,
                    timezone: entry.timezone,
                })
            }
            Err(err) => {
                self.rollback_quietly(tx, "confirm").await;
                Err(err)
            }
        }
    }

    async fn confirm_in_tx(
        &self,
        tx: &mut Tx,
        input: &ConfirmSessionInput,
    ) -> CoreResult<(Booking, Listing, AgendaEntry)> {
        let listing = self
            .repo()
            .get_listing_by_id(tx, input.listing_id)
            .await
            .map_err(|e| map_repo_err("Listing", e))?;

        if listing.deleted {
            return Err(CoreError::validation("listing", "listing is not available"));
        }
        if listing.user_id != input.user_id {
            return Err(CoreError::Auth("listing does not belong to user".to_string()));
        }
        if !listing.status.allows_photo_session() {
            return Err(ConflictError::ListingNotEligible.into());
        }

        let booking = self
            .repo()
            .get_booking_by_id_for_update(tx, input.photo_session_id)
            .await
            .map_err(|e| map_repo_err("Photo session", e))?;

        if booking.listing_identity_id != listing.identity_id {
            return Err(CoreError::Auth(
                "photo session does not belong to listing".to_string(),
            ));
        }

        match booking.status {
            BookingStatus::Accepted => {}
            BookingStatus::PendingApproval => {
                return Err(ConflictError::PhotoSessionPending.into());
            }
            _ => return Err(ConflictError::PhotoSessionAlreadyFinal.into()),
        }

        let entry = self
            .repo()
            .get_entry_by_id_for_update(tx, booking.agenda_entry_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    CoreError::infra("agenda entry missing for booking")
                } else {
                    map_repo_err("Agenda entry", e)
                }
            })?;

        self.repo()
            .update_booking_status(tx, booking.id, BookingStatus::Active)
            .await
            .map_err(|e| {
                map_repo_err_conflict("Photo session", e, ConflictError::TransitionNotAllowed)
            })?;

        // Guard on the status loaded in this transaction: pending listings
        // move to PhotosScheduled, auto-approved ones stay there (self
        // transition). A racing writer shows up as a guard miss either way.
        self.repo()
            .update_listing_status(tx, listing.id, ListingStatus::PhotosScheduled, listing.status)
            .await
            .map_err(|e| guard_miss_to_not_eligible("Listing", e))?;

        Ok((booking, listing, entry))
    }

    /// Release a previously reserved or confirmed session, freeing the
    /// photographer's window.
    pub async fn cancel_photo_session(
        &self,
        input: CancelSessionInput,
    ) -> CoreResult<CancelSessionOutput> {
        if !input.user_id.is_valid() {
            return Err(CoreError::Auth("unauthorized".to_string()));
        }
        if !input.photo_session_id.is_valid() {
            return Err(CoreError::validation(
                "photoSessionId",
                "photoSessionId must be greater than zero",
            ));
        }

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self.cancel_in_tx(&mut tx, &input).await;

        match result {
            Ok((booking, listing, entry)) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit cancellation", e))?;

                tracing::info!(
                    booking_id = booking.id.value(),
                    listing_id = listing.id.value(),
                    "photo_session.cancel.success"
                );

                Ok(CancelSessionOutput {
                    photo_session_id: booking.id,
                    slot_start: booking.starts_at,
                    slot_end: booking.ends_at,
                    photographer_id: booking.photographer_id,
                    listing_id: listing.id,
                    listing_code: listing.code,
                    status: BookingStatus::Cancelled,
                    timezone: entry.timezone,
                })
            }
            Err(err) => {
                self.rollback_quietly(tx, "cancel").await;
                Err(err)
            }
        }
    }

    async fn cancel_in_tx(
        &self,
        tx: &mut Tx,
        input: &CancelSessionInput,
    ) -> CoreResult<(Booking, Listing, AgendaEntry)> {
        let booking = self
            .repo()
            .get_booking_by_id_for_update(tx, input.photo_session_id)
            .await
            .map_err(|e| map_repo_err("Photo session", e))?;

        let listing = self
            .repo()
            .get_active_listing_version(tx, booking.listing_identity_id)
            .await
            .map_err(|e| map_repo_err("Listing", e))?;

        if listing.deleted {
            return Err(CoreError::validation("listing", "listing is not available"));
        }
        if listing.user_id != input.user_id {
            return Err(CoreError::Auth("listing does not belong to user".to_string()));
        }

        let entry = self
            .repo()
            .get_entry_by_id_for_update(tx, booking.agenda_entry_id)
            .await
            .map_err(|e| map_repo_err("Photographer agenda entry", e))?;

        // The listing status to reverse depends on how far the booking got.
        // Under auto-approval an accepted booking already moved the listing
        // to PhotosScheduled at reserve time.
        let expected = match booking.status {
            BookingStatus::Active => ListingStatus::PhotosScheduled,
            BookingStatus::Accepted if !self.config().require_photographer_approval => {
                ListingStatus::PhotosScheduled
            }
            BookingStatus::PendingApproval | BookingStatus::Accepted => {
                ListingStatus::PendingPhotoConfirmation
            }
            _ => return Err(ConflictError::PhotoSessionNotCancelable.into()),
        };

        self.repo()
            .update_booking_status(tx, booking.id, BookingStatus::Cancelled)
            .await
            .map_err(|e| {
                map_repo_err_conflict(
                    "Photo session",
                    e,
                    ConflictError::PhotoSessionNotCancelable,
                )
            })?;

        self.repo()
            .delete_entry_by_id(tx, booking.agenda_entry_id)
            .await
            .map_err(|e| map_repo_err("Photographer agenda entry", e))?;

        self.repo()
            .update_listing_status(tx, listing.id, ListingStatus::PendingPhotoScheduling, expected)
            .await
            .map_err(|e| guard_miss_to_not_eligible("Listing", e))?;

        Ok((booking, listing, entry))
    }

    /// Photographer decision on a pending booking: accept or reject.
    ///
    /// Rejection keeps the agenda entry in place; the blocked window stays
    /// interpreted by business rules until cancelled or cleaned up.
    pub async fn update_session_status(&self, input: UpdateSessionStatusInput) -> CoreResult<()> {
        if !input.session_id.is_valid() {
            return Err(CoreError::validation(
                "sessionId",
                "sessionId must be greater than zero",
            ));
        }
        if !input.photographer_id.is_valid() {
            return Err(CoreError::Auth("unauthorized".to_string()));
        }
        if !matches!(
            input.status,
            BookingStatus::Accepted | BookingStatus::Rejected
        ) {
            return Err(CoreError::validation(
                "status",
                "status must be ACCEPTED or REJECTED",
            ));
        }

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self.update_status_in_tx(&mut tx, &input).await;

        match result {
            Ok(booking_id) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit status update", e))?;
                tracing::info!(
                    session_id = booking_id.value(),
                    photographer_id = input.photographer_id.value(),
                    status = %input.status,
                    "photo_session.status.updated"
                );
                Ok(())
            }
            Err(err) => {
                self.rollback_quietly(tx, "update_session_status").await;
                Err(err)
            }
        }
    }

    async fn update_status_in_tx(
        &self,
        tx: &mut Tx,
        input: &UpdateSessionStatusInput,
    ) -> CoreResult<crate::api::BookingId> {
        let booking = self
            .repo()
            .get_booking_by_id_for_update(tx, input.session_id)
            .await
            .map_err(|e| map_repo_err("Photo session", e))?;

        if booking.photographer_id != input.photographer_id {
            return Err(CoreError::Forbidden(
                "session does not belong to photographer".to_string(),
            ));
        }
        if booking.status != BookingStatus::PendingApproval {
            return Err(ConflictError::TransitionNotAllowed.into());
        }

        self.repo()
            .get_entry_by_id_for_update(tx, booking.agenda_entry_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    CoreError::infra("agenda entry missing for booking")
                } else {
                    map_repo_err("Agenda entry", e)
                }
            })?;

        self.repo()
            .update_booking_status(tx, booking.id, input.status)
            .await
            .map_err(|e| {
                map_repo_err_conflict("Photo session", e, ConflictError::TransitionNotAllowed)
            })?;

        Ok(booking.id)
    }
}
