//! Row types and domain converters for the Postgres backend.
//!
//! Enumerations are stored as uppercase varchar and converted at the edge;
//! a row carrying an unknown discriminant is a data error, not a panic.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use super::schema::*;
use crate::api::{
    AgendaEntryId, BookingId, HolidayCalendarId, ListingId, ListingIdentityId, PhotographerId,
    ServiceAreaId, UserId,
};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    AgendaEntry, AgendaEntryDraft, AgendaEntrySource, AgendaEntryType, Booking, BookingDraft,
    BookingStatus, CalendarScope, HolidayCalendar, HolidayDate, Listing, ListingStatus,
    OwnerResponseMetrics, ServiceArea, User,
};

fn parse_discriminant<T>(raw: &str, parse: impl Fn(&str) -> Option<T>, what: &str) -> RepositoryResult<T> {
    parse(raw).ok_or_else(|| RepositoryError::internal(format!("unknown {what}: {raw}")))
}

fn parse_entry_type(raw: &str) -> Option<AgendaEntryType> {
    match raw {
        "PHOTO_SESSION" => Some(AgendaEntryType::PhotoSession),
        "HOLIDAY" => Some(AgendaEntryType::Holiday),
        "TIME_OFF" => Some(AgendaEntryType::TimeOff),
        "BLOCK" => Some(AgendaEntryType::Block),
        _ => None,
    }
}

fn parse_source(raw: &str) -> Option<AgendaEntrySource> {
    match raw {
        "BOOKING" => Some(AgendaEntrySource::Booking),
        "HOLIDAY" => Some(AgendaEntrySource::Holiday),
        "MANUAL" => Some(AgendaEntrySource::Manual),
        "ONBOARDING" => Some(AgendaEntrySource::Onboarding),
        _ => None,
    }
}

fn parse_listing_status(raw: &str) -> Option<ListingStatus> {
    match raw {
        "DRAFT" => Some(ListingStatus::Draft),
        "PENDING_PHOTO_SCHEDULING" => Some(ListingStatus::PendingPhotoScheduling),
        "PENDING_PHOTO_CONFIRMATION" => Some(ListingStatus::PendingPhotoConfirmation),
        "PHOTOS_SCHEDULED" => Some(ListingStatus::PhotosScheduled),
        "PUBLISHED" => Some(ListingStatus::Published),
        "SUSPENDED" => Some(ListingStatus::Suspended),
        _ => None,
    }
}

fn parse_scope(raw: &str) -> Option<CalendarScope> {
    match raw {
        "NATIONAL" => Some(CalendarScope::National),
        "STATE" => Some(CalendarScope::State),
        "CITY" => Some(CalendarScope::City),
        _ => None,
    }
}

// ==================== Agenda entries ====================

#[derive(Debug, Queryable)]
pub struct AgendaEntryRow {
    pub id: i64,
    pub photographer_user_id: i64,
    pub entry_type: String,
    pub source: String,
    pub source_id: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub blocking: bool,
    pub reason: Option<String>,
    pub timezone: String,
}

impl AgendaEntryRow {
    pub fn into_domain(self) -> RepositoryResult<AgendaEntry> {
        Ok(AgendaEntry {
            id: AgendaEntryId(self.id),
            photographer_id: PhotographerId(self.photographer_user_id),
            entry_type: parse_discriminant(&self.entry_type, parse_entry_type, "agenda entry type")?,
            source: parse_discriminant(&self.source, parse_source, "agenda entry source")?,
            source_id: self.source_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            blocking: self.blocking,
            reason: self.reason,
            timezone: self.timezone,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = photographer_agenda_entries)]
pub struct NewAgendaEntryRow {
    pub photographer_user_id: i64,
    pub entry_type: String,
    pub source: String,
    pub source_id: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub blocking: bool,
    pub reason: Option<String>,
    pub timezone: String,
}

impl NewAgendaEntryRow {
    pub fn from_draft(draft: &AgendaEntryDraft) -> Self {
        Self {
            photographer_user_id: draft.photographer_id.value(),
            entry_type: draft.entry_type.as_str().to_string(),
            source: draft.source.as_str().to_string(),
            source_id: draft.source_id,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            blocking: draft.blocking,
            reason: draft.reason.clone(),
            timezone: draft.timezone.clone(),
        }
    }
}

// ==================== Bookings ====================

#[derive(Debug, Queryable)]
pub struct BookingRow {
    pub id: i64,
    pub agenda_entry_id: i64,
    pub photographer_user_id: i64,
    pub listing_identity_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
    pub reason: Option<String>,
    pub reservation_token: Option<String>,
    pub reserved_until: Option<DateTime<Utc>>,
}

impl BookingRow {
    pub fn into_domain(self) -> RepositoryResult<Booking> {
        let status: BookingStatus = self
            .status
            .parse()
            .map_err(RepositoryError::internal)?;
        Ok(Booking {
            id: BookingId(self.id),
            agenda_entry_id: AgendaEntryId(self.agenda_entry_id),
            photographer_id: PhotographerId(self.photographer_user_id),
            listing_identity_id: ListingIdentityId(self.listing_identity_id),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status,
            reason: self.reason,
            reservation_token: self.reservation_token,
            reserved_until: self.reserved_until,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = photo_session_bookings)]
pub struct NewBookingRow {
    pub agenda_entry_id: i64,
    pub photographer_user_id: i64,
    pub listing_identity_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
    pub reservation_token: Option<String>,
    pub reserved_until: Option<DateTime<Utc>>,
}

impl NewBookingRow {
    pub fn from_draft(draft: &BookingDraft) -> Self {
        Self {
            agenda_entry_id: draft.agenda_entry_id.value(),
            photographer_user_id: draft.photographer_id.value(),
            listing_identity_id: draft.listing_identity_id.value(),
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            status: draft.status.as_str().to_string(),
            reservation_token: draft.reservation_token.clone(),
            reserved_until: draft.reserved_until,
        }
    }
}

// ==================== Collaborator rows ====================

#[derive(Debug, Queryable)]
pub struct ListingRow {
    pub id: i64,
    pub identity_id: i64,
    pub user_id: i64,
    pub status: String,
    pub deleted: bool,
    pub city: String,
    pub state: String,
    pub code: i32,
}

impl ListingRow {
    pub fn into_domain(self) -> RepositoryResult<Listing> {
        Ok(Listing {
            id: ListingId(self.id),
            identity_id: ListingIdentityId(self.identity_id),
            user_id: UserId(self.user_id),
            status: parse_discriminant(&self.status, parse_listing_status, "listing status")?,
            deleted: self.deleted,
            city: self.city,
            state: self.state,
            code: self.code as u32,
        })
    }
}

#[derive(Debug, Queryable)]
pub struct UserRow {
    pub id: i64,
    pub full_name: String,
    pub city: String,
    pub state: String,
    pub timezone: Option<String>,
    pub photographer: bool,
}

impl UserRow {
    pub fn into_domain(self) -> User {
        User {
            id: UserId(self.id),
            full_name: self.full_name,
            city: self.city,
            state: self.state,
            timezone: self.timezone,
            photographer: self.photographer,
        }
    }
}

#[derive(Debug, Queryable)]
pub struct ServiceAreaRow {
    pub id: i64,
    pub photographer_user_id: i64,
    pub city: String,
    pub state: String,
}

impl ServiceAreaRow {
    pub fn into_domain(self) -> ServiceArea {
        ServiceArea {
            id: ServiceAreaId(self.id),
            photographer_id: PhotographerId(self.photographer_user_id),
            city: self.city,
            state: self.state,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = photographer_service_areas)]
pub struct NewServiceAreaRow {
    pub photographer_user_id: i64,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Queryable)]
pub struct HolidayCalendarRow {
    pub id: i64,
    pub name: String,
    pub scope: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub active: bool,
}

impl HolidayCalendarRow {
    pub fn into_domain(self) -> RepositoryResult<HolidayCalendar> {
        Ok(HolidayCalendar {
            id: HolidayCalendarId(self.id),
            name: self.name,
            scope: parse_discriminant(&self.scope, parse_scope, "calendar scope")?,
            state: self.state,
            city: self.city,
            active: self.active,
        })
    }
}

#[derive(Debug, Queryable)]
pub struct HolidayDateRow {
    pub id: i64,
    pub calendar_id: i64,
    pub holiday_date: NaiveDate,
    pub label: String,
}

impl HolidayDateRow {
    pub fn into_domain(self) -> HolidayDate {
        HolidayDate {
            calendar_id: HolidayCalendarId(self.calendar_id),
            date: self.holiday_date,
            label: self.label,
        }
    }
}

#[derive(Debug, Queryable)]
pub struct OwnerResponseMetricsRow {
    pub owner_id: i64,
    pub visit_avg_seconds: f64,
    pub visit_count: i64,
    pub visit_last_at: Option<DateTime<Utc>>,
    pub proposal_avg_seconds: f64,
    pub proposal_count: i64,
    pub proposal_last_at: Option<DateTime<Utc>>,
}

impl OwnerResponseMetricsRow {
    pub fn into_domain(self) -> OwnerResponseMetrics {
        OwnerResponseMetrics {
            owner_id: UserId(self.owner_id),
            visit_avg_seconds: self.visit_avg_seconds,
            visit_count: self.visit_count.max(0) as u64,
            visit_last_at: self.visit_last_at,
            proposal_avg_seconds: self.proposal_avg_seconds,
            proposal_count: self.proposal_count.max(0) as u64,
            proposal_last_at: self.proposal_last_at,
        }
    }
}
