//! Input and output types of the scheduling services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{
    AgendaEntryId, BookingId, HolidayCalendarId, ListingId, ListingIdentityId, PhotographerId,
    ServiceAreaId, UserId,
};
use crate::models::{
    AgendaEntry, AgendaEntrySource, AgendaEntryType, BookingStatus, ResponseKind, ServiceArea,
    SlotId, SlotPeriod,
};

/// Sort keys accepted by availability listing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AvailabilitySort {
    #[default]
    StartAsc,
    StartDesc,
    PhotographerAsc,
    PhotographerDesc,
}

impl std::str::FromStr for AvailabilitySort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "start_asc" | "date_asc" => Ok(Self::StartAsc),
            "start_desc" | "date_desc" => Ok(Self::StartDesc),
            "photographer_asc" => Ok(Self::PhotographerAsc),
            "photographer_desc" => Ok(Self::PhotographerDesc),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Display status of an agenda slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Available,
    Blocked,
    Booked,
}

// ==================== Availability ====================

/// Range and pagination data for availability listing.
#[derive(Debug, Clone)]
pub struct ListAvailabilityInput {
    pub listing_identity_id: ListingIdentityId,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: usize,
    pub size: usize,
    pub sort: AvailabilitySort,
    pub period: Option<SlotPeriod>,
    pub timezone: Option<String>,
}

/// A free window available for booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilitySlot {
    pub slot_id: SlotId,
    pub photographer_id: PhotographerId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period: SlotPeriod,
    pub timezone: String,
}

/// Computed availability slots, paginated.
#[derive(Debug, Clone, Serialize)]
pub struct ListAvailabilityOutput {
    pub slots: Vec<AvailabilitySlot>,
    pub total: u64,
    pub page: usize,
    pub size: usize,
    pub timezone: String,
}

// ==================== Agenda listing ====================

/// Filters for the photographer-centric agenda listing.
#[derive(Debug, Clone)]
pub struct ListAgendaInput {
    pub photographer_id: PhotographerId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub page: usize,
    pub size: usize,
    pub timezone: Option<String>,
    pub entry_type: Option<AgendaEntryType>,
}

/// An agenda entry rendered for clients. Synthetic entries (holidays,
/// weekends, outside-hours blocks) carry hashed ids with the high bit set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaSlotView {
    pub entry_id: u64,
    pub photographer_id: PhotographerId,
    pub entry_type: AgendaEntryType,
    pub source: AgendaEntrySource,
    pub source_id: Option<i64>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: SlotStatus,
    pub group_id: String,
    pub is_holiday: bool,
    pub is_time_off: bool,
    pub holiday_labels: Vec<String>,
    pub holiday_calendar_ids: Vec<HolidayCalendarId>,
    pub reason: Option<String>,
    pub timezone: String,
}

/// Agenda listing result.
#[derive(Debug, Clone, Serialize)]
pub struct ListAgendaOutput {
    pub slots: Vec<AgendaSlotView>,
    pub total: u64,
    pub page: usize,
    pub size: usize,
    pub timezone: String,
}

// ==================== Reservation lifecycle ====================

/// Identifiers needed to reserve a photo session window.
#[derive(Debug, Clone, Copy)]
pub struct ReserveSessionInput {
    pub user_id: UserId,
    pub listing_identity_id: ListingIdentityId,
    pub slot_id: SlotId,
}

/// Metadata about a reserved session.
#[derive(Debug, Clone, Serialize)]
pub struct ReserveSessionOutput {
    pub photo_session_id: BookingId,
    pub slot_id: SlotId,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub photographer_id: PhotographerId,
    pub listing_identity_id: ListingIdentityId,
    pub status: BookingStatus,
}

/// Data required to confirm a reserved session.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmSessionInput {
    pub user_id: UserId,
    pub listing_id: ListingId,
    pub photo_session_id: BookingId,
}

/// Confirmed session metadata, with the slot window localized to the
/// timezone the agenda entry was authored in.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmSessionOutput {
    pub photo_session_id: BookingId,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub photographer_id: PhotographerId,
    pub listing_id: ListingId,
    pub status: BookingStatus,
    pub timezone: String,
}

/// Identifiers needed to cancel an existing session.
#[derive(Debug, Clone, Copy)]
pub struct CancelSessionInput {
    pub user_id: UserId,
    pub photo_session_id: BookingId,
}

/// Metadata about a cancelled session.
#[derive(Debug, Clone, Serialize)]
pub struct CancelSessionOutput {
    pub photo_session_id: BookingId,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub photographer_id: PhotographerId,
    pub listing_id: ListingId,
    pub listing_code: u32,
    pub status: BookingStatus,
    pub timezone: String,
}

/// Photographer decision on a pending booking.
#[derive(Debug, Clone, Copy)]
pub struct UpdateSessionStatusInput {
    pub session_id: BookingId,
    pub photographer_id: PhotographerId,
    pub status: BookingStatus,
}

// ==================== Time off ====================

/// Payload to create a time-off entry.
#[derive(Debug, Clone)]
pub struct CreateTimeOffInput {
    pub photographer_id: PhotographerId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub timezone: Option<String>,
}

/// Payload to update a time-off entry.
#[derive(Debug, Clone)]
pub struct UpdateTimeOffInput {
    pub time_off_id: AgendaEntryId,
    pub photographer_id: PhotographerId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub timezone: Option<String>,
}

/// Identifiers to delete a time-off entry.
#[derive(Debug, Clone, Copy)]
pub struct DeleteTimeOffInput {
    pub time_off_id: AgendaEntryId,
    pub photographer_id: PhotographerId,
}

/// Filters for time-off listing.
#[derive(Debug, Clone)]
pub struct ListTimeOffInput {
    pub photographer_id: PhotographerId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub page: usize,
    pub size: usize,
    pub timezone: Option<String>,
}

/// Paginated time-off entries.
#[derive(Debug, Clone, Serialize)]
pub struct ListTimeOffOutput {
    pub time_offs: Vec<AgendaEntry>,
    pub total: u64,
    pub page: usize,
    pub size: usize,
    pub timezone: String,
}

/// A single time-off entry alongside timezone metadata.
#[derive(Debug, Clone, Serialize)]
pub struct TimeOffDetail {
    pub time_off: AgendaEntry,
    pub timezone: String,
}

// ==================== Service areas ====================

/// Payload to create a service area.
#[derive(Debug, Clone)]
pub struct CreateServiceAreaInput {
    pub photographer_id: PhotographerId,
    pub city: String,
    pub state: String,
}

/// Payload to update a service area.
#[derive(Debug, Clone)]
pub struct UpdateServiceAreaInput {
    pub photographer_id: PhotographerId,
    pub service_area_id: ServiceAreaId,
    pub city: String,
    pub state: String,
}

/// Paginated service areas.
#[derive(Debug, Clone, Serialize)]
pub struct ListServiceAreasOutput {
    pub areas: Vec<ServiceArea>,
    pub total: u64,
    pub page: usize,
    pub size: usize,
}

// ==================== Agenda bootstrap ====================

/// Parameters for (re)provisioning a photographer's projected agenda.
#[derive(Debug, Clone)]
pub struct EnsureAgendaInput {
    pub photographer_id: PhotographerId,
    pub timezone: Option<String>,
    pub horizon_months: Option<u32>,
    /// When present, replaces the photographer's calendar associations
    /// before projecting holidays.
    pub calendar_ids: Option<Vec<HolidayCalendarId>>,
}

// ==================== Engagement ====================

/// One owner response to fold into the SLA aggregates.
#[derive(Debug, Clone, Copy)]
pub struct RecordOwnerResponseInput {
    pub owner_id: UserId,
    pub kind: ResponseKind,
    pub elapsed_seconds: f64,
}
