//! Collaborator store implementations over the in-memory state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{local_tx_mut, LocalRepository};
use crate::api::{
    HolidayCalendarId, ListingId, ListingIdentityId, PhotographerId, ServiceAreaId, UserId,
};
use crate::db::repository::{
    EngagementRepository, ErrorContext, HolidayRepository, ListingRepository, RepositoryError,
    RepositoryResult, ServiceAreaRepository, UserRepository,
};
use crate::db::Tx;
use crate::models::{
    CalendarDatesFilter, CalendarFilter, HolidayCalendar, HolidayCalendarAssociation, HolidayDate,
    Listing, ListingStatus, ListingViewCounter, OwnerResponseMetrics, ServiceArea, User,
};

fn paginate<T: Clone>(items: Vec<T>, page: usize, limit: usize) -> Vec<T> {
    let page = page.max(1);
    let limit = limit.max(1);
    let start = (page - 1).saturating_mul(limit).min(items.len());
    let end = (start + limit).min(items.len());
    items[start..end].to_vec()
}

#[async_trait]
impl ListingRepository for LocalRepository {
    async fn get_active_listing_version(
        &self,
        tx: &mut Tx,
        identity_id: ListingIdentityId,
    ) -> RepositoryResult<Listing> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .listings
            .values()
            .filter(|listing| listing.identity_id == identity_id && !listing.deleted)
            .max_by_key(|listing| listing.id.value())
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    "listing not found",
                    ErrorContext::new("get_active_listing_version")
                        .with_entity_id(identity_id.value()),
                )
            })
    }

    async fn get_listing_by_id(
        &self,
        tx: &mut Tx,
        listing_id: ListingId,
    ) -> RepositoryResult<Listing> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .listings
            .get(&listing_id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("listing not found"))
    }

    async fn update_listing_status(
        &self,
        tx: &mut Tx,
        listing_id: ListingId,
        new_status: ListingStatus,
        expected: ListingStatus,
    ) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        match state.listings.get_mut(&listing_id.value()) {
            // Guarded update: zero affected rows surface as not-found.
            Some(listing) if listing.status == expected => {
                listing.status = new_status;
                Ok(())
            }
            _ => Err(RepositoryError::not_found_with_context(
                "listing not in expected status",
                ErrorContext::new("update_listing_status")
                    .with_entity_id(listing_id.value())
                    .with_details(format!("expected={expected} new={new_status}")),
            )),
        }
    }
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn get_user_by_id(&self, tx: &mut Tx, user_id: UserId) -> RepositoryResult<User> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .users
            .get(&user_id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("user not found"))
    }

    async fn list_photographer_ids(&self, tx: &mut Tx) -> RepositoryResult<Vec<PhotographerId>> {
        let local = local_tx_mut(tx)?;
        Ok(local
            .state()
            .users
            .values()
            .filter(|user| user.photographer)
            .map(|user| PhotographerId(user.id.value()))
            .collect())
    }

    async fn list_device_tokens_by_user_if_opted_in(
        &self,
        tx: &mut Tx,
        user_id: UserId,
    ) -> RepositoryResult<Vec<String>> {
        let local = local_tx_mut(tx)?;
        Ok(local
            .state()
            .device_tokens
            .iter()
            .filter(|token| token.user_id == user_id && token.opted_in)
            .map(|token| token.token.clone())
            .collect())
    }
}

#[async_trait]
impl ServiceAreaRepository for LocalRepository {
    async fn create_service_area(
        &self,
        tx: &mut Tx,
        area: &ServiceArea,
    ) -> RepositoryResult<ServiceAreaId> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;

        let duplicate = state.service_areas.values().any(|existing| {
            existing.photographer_id == area.photographer_id
                && existing.matches_location(&area.city, &area.state)
        });
        if duplicate {
            return Err(RepositoryError::conflict(
                "service area already exists for photographer",
            ));
        }

        state.next_area_id += 1;
        let id = ServiceAreaId(state.next_area_id);
        let mut stored = area.clone();
        stored.id = id;
        state.service_areas.insert(id.value(), stored);
        Ok(id)
    }

    async fn update_service_area(&self, tx: &mut Tx, area: &ServiceArea) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;

        if !state.service_areas.contains_key(&area.id.value()) {
            return Err(RepositoryError::not_found("service area not found"));
        }
        let duplicate = state.service_areas.values().any(|existing| {
            existing.id != area.id
                && existing.photographer_id == area.photographer_id
                && existing.matches_location(&area.city, &area.state)
        });
        if duplicate {
            return Err(RepositoryError::conflict(
                "service area already exists for photographer",
            ));
        }
        state.service_areas.insert(area.id.value(), area.clone());
        Ok(())
    }

    async fn delete_service_area(
        &self,
        tx: &mut Tx,
        area_id: ServiceAreaId,
    ) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        if state.service_areas.remove(&area_id.value()).is_none() {
            return Err(RepositoryError::not_found("service area not found"));
        }
        Ok(())
    }

    async fn get_service_area_by_id(
        &self,
        tx: &mut Tx,
        area_id: ServiceAreaId,
    ) -> RepositoryResult<ServiceArea> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .service_areas
            .get(&area_id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("service area not found"))
    }

    async fn list_service_areas_by_photographer(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
    ) -> RepositoryResult<Vec<ServiceArea>> {
        let local = local_tx_mut(tx)?;
        let mut areas: Vec<ServiceArea> = local
            .state()
            .service_areas
            .values()
            .filter(|area| area.photographer_id == photographer_id)
            .cloned()
            .collect();
        areas.sort_by_key(|area| area.id.value());
        Ok(areas)
    }

    async fn list_photographer_ids_by_location(
        &self,
        tx: &mut Tx,
        city: &str,
        state_code: &str,
    ) -> RepositoryResult<Vec<PhotographerId>> {
        let local = local_tx_mut(tx)?;
        let mut ids: Vec<PhotographerId> = local
            .state()
            .service_areas
            .values()
            .filter(|area| area.matches_location(city, state_code))
            .map(|area| area.photographer_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl HolidayRepository for LocalRepository {
    async fn list_calendars(
        &self,
        tx: &mut Tx,
        filter: &CalendarFilter,
    ) -> RepositoryResult<Vec<HolidayCalendar>> {
        let local = local_tx_mut(tx)?;
        let mut calendars: Vec<HolidayCalendar> = local
            .state()
            .calendars
            .values()
            .filter(|calendar| !filter.only_active || calendar.active)
            .filter(|calendar| filter.scope.map_or(true, |scope| calendar.scope == scope))
            .filter(|calendar| {
                filter.state.as_deref().map_or(true, |state| {
                    calendar
                        .state
                        .as_deref()
                        .map_or(false, |own| own.eq_ignore_ascii_case(state))
                })
            })
            .filter(|calendar| {
                filter.city.as_deref().map_or(true, |city| {
                    calendar
                        .city
                        .as_deref()
                        .map_or(false, |own| own.eq_ignore_ascii_case(city))
                })
            })
            .cloned()
            .collect();
        calendars.sort_by_key(|calendar| calendar.id.value());
        Ok(paginate(calendars, filter.page, filter.limit))
    }

    async fn list_calendar_dates(
        &self,
        tx: &mut Tx,
        filter: &CalendarDatesFilter,
    ) -> RepositoryResult<Vec<HolidayDate>> {
        let local = local_tx_mut(tx)?;
        let mut dates: Vec<HolidayDate> = local
            .state()
            .calendar_dates
            .iter()
            .filter(|date| date.calendar_id == filter.calendar_id)
            .filter(|date| date.date >= filter.from && date.date <= filter.to)
            .cloned()
            .collect();
        dates.sort_by_key(|date| date.date);
        Ok(paginate(dates, filter.page, filter.limit))
    }

    async fn replace_associations(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
        calendar_ids: &[HolidayCalendarId],
    ) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        state
            .associations
            .retain(|assoc| assoc.photographer_id != photographer_id);
        let mut seen = Vec::new();
        for calendar_id in calendar_ids {
            if seen.contains(calendar_id) {
                continue;
            }
            seen.push(*calendar_id);
            state.associations.push(HolidayCalendarAssociation {
                photographer_id,
                calendar_id: *calendar_id,
            });
        }
        Ok(())
    }

    async fn list_associations(
        &self,
        tx: &mut Tx,
        photographer_id: PhotographerId,
    ) -> RepositoryResult<Vec<HolidayCalendarAssociation>> {
        let local = local_tx_mut(tx)?;
        Ok(local
            .state()
            .associations
            .iter()
            .filter(|assoc| assoc.photographer_id == photographer_id)
            .copied()
            .collect())
    }
}

#[async_trait]
impl EngagementRepository for LocalRepository {
    async fn get_owner_response_metrics(
        &self,
        tx: &mut Tx,
        owner_id: UserId,
    ) -> RepositoryResult<OwnerResponseMetrics> {
        let local = local_tx_mut(tx)?;
        local
            .state()
            .owner_metrics
            .get(&owner_id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("owner response metrics not found"))
    }

    async fn upsert_owner_response_metrics(
        &self,
        tx: &mut Tx,
        metrics: &OwnerResponseMetrics,
    ) -> RepositoryResult<()> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        state
            .owner_metrics
            .insert(metrics.owner_id.value(), metrics.clone());
        Ok(())
    }

    async fn increment_and_get_views(
        &self,
        tx: &mut Tx,
        listing_identity_id: ListingIdentityId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<u64> {
        let local = local_tx_mut(tx)?;
        let state = local.state_mut()?;
        let counter = state
            .view_counters
            .entry(listing_identity_id.value())
            .or_insert(ListingViewCounter {
                listing_identity_id,
                views: 0,
                last_view_at: None,
            });
        counter.views += 1;
        counter.last_view_at = Some(at);
        Ok(counter.views)
    }
}
