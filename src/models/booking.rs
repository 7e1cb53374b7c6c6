//! Photo session bookings.
//!
//! A booking ties an agenda entry to a listing identity and carries the
//! approval state. The allowed lifecycle is:
//!
//! ```text
//!                  reserve (auto)         confirm
//!    PendingApproval ─────────► Accepted ─────────► Active ─────► Done
//!          │                        │                   │
//!          │ photographer rejects   │ owner cancels     │ owner cancels
//!          ▼                        ▼                   ▼
//!       Rejected                Cancelled           Cancelled
//! ```
//!
//! Owners may also cancel while still pending approval. Every other
//! transition is a conflict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AgendaEntryId, BookingId, ListingIdentityId, PhotographerId};

/// Approval/lifecycle state of a booking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingApproval,
    Accepted,
    Rejected,
    Active,
    Cancelled,
    Done,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingApproval => "PENDING_APPROVAL",
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Active => "ACTIVE",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Done => "DONE",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Done
        )
    }

    /// Whether the booking still holds the photographer's slot.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// The authoritative transition table.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (PendingApproval, Accepted)
                | (PendingApproval, Rejected)
                | (PendingApproval, Cancelled)
                | (Accepted, Active)
                | (Accepted, Cancelled)
                | (Active, Done)
                | (Active, Cancelled)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING_APPROVAL" => Ok(BookingStatus::PendingApproval),
            "ACCEPTED" => Ok(BookingStatus::Accepted),
            "REJECTED" => Ok(BookingStatus::Rejected),
            "ACTIVE" => Ok(BookingStatus::Active),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "DONE" => Ok(BookingStatus::Done),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

/// A persisted booking. Its timestamps always equal those of the agenda
/// entry it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub agenda_entry_id: AgendaEntryId,
    pub photographer_id: PhotographerId,
    pub listing_identity_id: ListingIdentityId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub reason: Option<String>,
    pub reservation_token: Option<String>,
    pub reserved_until: Option<DateTime<Utc>>,
}

/// Booking awaiting insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub agenda_entry_id: AgendaEntryId,
    pub photographer_id: PhotographerId,
    pub listing_identity_id: ListingIdentityId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub reservation_token: Option<String>,
    pub reserved_until: Option<DateTime<Utc>>,
}

impl BookingDraft {
    pub fn new(
        agenda_entry_id: AgendaEntryId,
        photographer_id: PhotographerId,
        listing_identity_id: ListingIdentityId,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        status: BookingStatus,
    ) -> Self {
        Self {
            agenda_entry_id,
            photographer_id,
            listing_identity_id,
            starts_at,
            ends_at,
            status,
            reservation_token: None,
            reserved_until: None,
        }
    }

    pub fn with_reservation_hold(
        mut self,
        token: impl Into<String>,
        reserved_until: DateTime<Utc>,
    ) -> Self {
        self.reservation_token = Some(token.into());
        self.reserved_until = Some(reserved_until);
        self
    }

    pub fn into_booking(self, id: BookingId) -> Booking {
        Booking {
            id,
            agenda_entry_id: self.agenda_entry_id,
            photographer_id: self.photographer_id,
            listing_identity_id: self.listing_identity_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: self.status,
            reason: None,
            reservation_token: self.reservation_token,
            reserved_until: self.reserved_until,
        }
    }
}
