//! Collaborator store traits consumed by the scheduling core.
//!
//! Listings, users, holiday catalogs and engagement counters are owned by
//! other subsystems; the core reads them (and performs guarded listing
//! transitions) through these seams so the backends can be swapped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryResult;
use crate::api::{
    HolidayCalendarId, ListingId, ListingIdentityId, PhotographerId, ServiceAreaId, UserId,
};
use crate::db::Tx;
use crate::models::{
    CalendarDatesFilter, CalendarFilter, HolidayCalendar, HolidayCalendarAssociation, HolidayDate,
    Listing, ListingStatus, OwnerResponseMetrics, ServiceArea, User,
};

/// Listing lookups and guarded lifecycle transitions.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Latest non-deleted version for a listing identity.
    async fn get_active_listing_version(
        &self,
        tx: &mut Tx,
        identity_id: ListingIdentityId,
    ) -> RepositoryResult<Listing>;

    /// One listing version by its primary key.
    async fn get_listing_by_id(&self, tx: &mut Tx, listing_id: ListingId)
        -> RepositoryResult<Listing>;

    /// Guarded status transition: updates the row only when its current
    /// status equals `expected`. Zero affected rows surface as not-found,
    /// which callers map to a listing-not-eligible conflict.
    async fn update_listing_status(
        &self,
        tx: &mut Tx,
        listing_id: ListingId,
        new_status: ListingStatus,
        expected: ListingStatus,
    ) -> RepositoryResult<()>;
}

/// User lookups needed for holiday projection and notification fan-out.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user_by_id(&self, tx: &mut Tx, user_id: UserId) -> RepositoryResult<User>;

    /// Distinct ids of users holding an active photographer role.
    async fn list_photographer_ids(&self, tx: &mut Tx) -> RepositoryResult<Vec<PhotographerId>>;

    /// Device token strings of a user who opted into push notifications.
    async fn list_device_tokens_by_user_if_opted_in(
        &self,
        tx: &mut Tx,
        user_id: UserId,
    ) -> RepositoryResult<Vec<String>>;
}

/// Photographer service areas.
#[async_trait]
pub trait ServiceAreaRepository: Send + Sync {
    /// Insert a service area; conflict on a duplicate (photographer, city,
    /// state) triple, compared case-insensitively.
    async fn create_service_area(&self, tx: &mut Tx, area: &ServiceArea)
        -> RepositoryResult<ServiceAreaId>;

    /// Update city/state keeping the uniqueness guarantee.
    async fn update_service_area(&self, tx: &mut Tx, area: &ServiceArea) -> RepositoryResult<()>;

    async fn delete_service_area(&self, tx: &mut Tx, area_id: ServiceAreaId)
        -> RepositoryResult<()>;

    async fn get_service_area_by_id(
        &self,
        tx: &mut Tx,
        area_id: ServiceAreaId,
    ) -> RepositoryResult<ServiceArea>;

    async fn list_service_areas_by_photographer(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
    ) -> RepositoryResult<Vec<ServiceArea>>;

    /// Photographer ids serving the given city/state.
    async fn list_photographer_ids_by_location(
        &self,
        tx: &mut Tx,
        city: &str,
        state: &str,
    ) -> RepositoryResult<Vec<PhotographerId>>;
}

/// Holiday catalog reads and photographer calendar associations.
///
/// Both listing methods paginate with total-less iteration: a page shorter
/// than the filter limit terminates the scan.
#[async_trait]
pub trait HolidayRepository: Send + Sync {
    async fn list_calendars(
        &self,
        tx: &mut Tx,
        filter: &CalendarFilter,
    ) -> RepositoryResult<Vec<HolidayCalendar>>;

    async fn list_calendar_dates(
        &self,
        tx: &mut Tx,
        filter: &CalendarDatesFilter,
    ) -> RepositoryResult<Vec<HolidayDate>>;

    /// Replace the set of calendars a photographer observes.
    async fn replace_associations(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        calendar_ids: &[HolidayCalendarId],
    ) -> RepositoryResult<()>;

    async fn list_associations(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
    ) -> RepositoryResult<Vec<HolidayCalendarAssociation>>;
}

/// Owner response SLAs and listing view counters.
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Current aggregates for an owner; not-found when never recorded.
    async fn get_owner_response_metrics(
        &self,
        tx: &mut Tx,
        owner_id: UserId,
    ) -> RepositoryResult<OwnerResponseMetrics>;

    /// Insert-or-update the aggregates row for an owner.
    async fn upsert_owner_response_metrics(
        &self,
        tx: &mut Tx,
        metrics: &OwnerResponseMetrics,
    ) -> RepositoryResult<()>;

    /// Atomically bump and return the view counter for a listing identity.
    /// Successive calls return strictly increasing values.
    async fn increment_and_get_views(
        &self,
        tx: &mut Tx,
        listing_identity_id: ListingIdentityId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<u64>;
}
