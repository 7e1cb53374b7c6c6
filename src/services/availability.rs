//! Availability computation.
//!
//! The computer is a pure function over the business-hours policy, the
//! photographer's blocking agenda entries, the projected holidays and a
//! reference clock. It allocates no locks: the listing runs inside a
//! read-only transaction and the reservation coordinator re-verifies the
//! chosen window under lock.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::api::PageRequest;
use crate::db::{
    AgendaRepository, ListingRepository, ServiceAreaRepository, TransactionManager,
    UserRepository,
};
use crate::error::{map_repo_err, ConflictError, CoreError, CoreResult};
use crate::models::{AgendaEntry, SlotId, SlotPeriod};
use crate::services::types::{
    AvailabilitySlot, AvailabilitySort, ListAvailabilityInput, ListAvailabilityOutput,
};
use crate::services::SchedulerService;

/// Business window applied to each weekday, in local hours.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

/// Half-open UTC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// A local calendar moment as UTC; `hour` may be 24 (midnight of the next
/// day). Falls back to the earliest valid instant around DST gaps.
pub(crate) fn local_moment(tz: Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
    let (date, hour) = if hour >= 24 {
        (date.succ_opt()?, hour - 24)
    } else {
        (date, hour)
    };
    let naive = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The whole local day as a UTC range.
pub(crate) fn local_day_range(tz: Tz, date: NaiveDate) -> Option<TimeRange> {
    let start = local_moment(tz, date, 0)?;
    let end = local_moment(tz, date, 24)?;
    Some(TimeRange::new(start, end))
}

pub(crate) fn clamp_range(
    range: TimeRange,
    min: DateTime<Utc>,
    max: DateTime<Utc>,
) -> Option<TimeRange> {
    let start = range.start.max(min);
    let end = range.end.min(max);
    (end > start).then_some(TimeRange::new(start, end))
}

/// Remove one interval from every range, keeping the leftovers.
pub(crate) fn subtract_range(ranges: Vec<TimeRange>, removal: TimeRange) -> Vec<TimeRange> {
    if removal.end <= removal.start {
        return ranges;
    }
    let mut result = Vec::with_capacity(ranges.len());
    for current in ranges {
        if current.end <= removal.start || removal.end <= current.start {
            result.push(current);
            continue;
        }
        if removal.start > current.start {
            result.push(TimeRange::new(current.start, removal.start));
        }
        if removal.end < current.end {
            result.push(TimeRange::new(removal.end, current.end));
        }
    }
    result
}

/// Weekday working-hour ranges over the window, clipped to `[from, to]`.
pub(crate) fn build_working_ranges(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tz: Tz,
    hours: BusinessHours,
) -> Vec<TimeRange> {
    let mut ranges = Vec::new();
    if hours.end_hour <= hours.start_hour {
        return ranges;
    }

    let mut day = from.with_timezone(&tz).date_naive();
    let last_day = to.with_timezone(&tz).date_naive();
    while day <= last_day {
        let weekday = day.weekday();
        if weekday != Weekday::Sat && weekday != Weekday::Sun {
            if let (Some(start), Some(end)) = (
                local_moment(tz, day, hours.start_hour),
                local_moment(tz, day, hours.end_hour),
            ) {
                if let Some(clamped) = clamp_range(TimeRange::new(start, end), from, to) {
                    ranges.push(clamped);
                }
            }
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    ranges
}

/// Subtract every blocking entry from the free ranges.
pub(crate) fn subtract_blocking_entries(
    ranges: Vec<TimeRange>,
    entries: &[AgendaEntry],
) -> Vec<TimeRange> {
    let mut result = ranges;
    for entry in entries.iter().filter(|entry| entry.blocking) {
        result = subtract_range(result, TimeRange::new(entry.starts_at, entry.ends_at));
    }
    result
}

/// Subtract the whole local day of each holiday.
pub(crate) fn subtract_holiday_days(
    ranges: Vec<TimeRange>,
    days: &[NaiveDate],
    tz: Tz,
) -> Vec<TimeRange> {
    let mut result = ranges;
    for day in days {
        if let Some(removal) = local_day_range(tz, *day) {
            result = subtract_range(result, removal);
        }
    }
    result
}

/// Drop ranges entirely in the past and clip ranges straddling `now`.
pub(crate) fn prune_past_ranges(ranges: Vec<TimeRange>, now: DateTime<Utc>) -> Vec<TimeRange> {
    ranges
        .into_iter()
        .filter_map(|range| {
            let start = range.start.max(now);
            (range.end > start).then_some(TimeRange::new(start, range.end))
        })
        .collect()
}

/// Split a free range into consecutive fixed-duration slots; a remainder
/// shorter than the duration is discarded.
pub(crate) fn split_into_slots(range: TimeRange, duration: Duration) -> Vec<TimeRange> {
    let mut slots = Vec::new();
    if duration <= Duration::zero() {
        return slots;
    }
    let mut start = range.start;
    while start + duration <= range.end {
        slots.push(TimeRange::new(start, start + duration));
        start = start + duration;
    }
    slots
}

/// Free ranges for one photographer: working hours minus blocking entries
/// minus holiday days, clipped against the clock.
pub(crate) fn compute_free_ranges(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tz: Tz,
    hours: BusinessHours,
    blocking: &[AgendaEntry],
    holiday_days: &[NaiveDate],
    now: DateTime<Utc>,
) -> Vec<TimeRange> {
    let ranges = build_working_ranges(from, to, tz, hours);
    let ranges = subtract_blocking_entries(ranges, blocking);
    let ranges = subtract_holiday_days(ranges, holiday_days, tz);
    prune_past_ranges(ranges, now)
}

pub(crate) fn sort_availability_slots(slots: &mut [AvailabilitySlot], sort: AvailabilitySort) {
    match sort {
        AvailabilitySort::StartAsc => slots.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.photographer_id.cmp(&b.photographer_id))
        }),
        AvailabilitySort::StartDesc => slots.sort_by(|a, b| {
            b.start
                .cmp(&a.start)
                .then_with(|| b.photographer_id.cmp(&a.photographer_id))
        }),
        AvailabilitySort::PhotographerAsc => slots.sort_by(|a, b| {
            a.photographer_id
                .cmp(&b.photographer_id)
                .then_with(|| a.start.cmp(&b.start))
        }),
        AvailabilitySort::PhotographerDesc => slots.sort_by(|a, b| {
            b.photographer_id
                .cmp(&a.photographer_id)
                .then_with(|| a.start.cmp(&b.start))
        }),
    }
}

impl SchedulerService {
    /// Compute bookable slots for the photographers serving a listing's
    /// location over a window. Snapshot-consistent and lock-free.
    pub async fn list_availability(
        &self,
        input: ListAvailabilityInput,
    ) -> CoreResult<ListAvailabilityOutput> {
        if !input.listing_identity_id.is_valid() {
            return Err(CoreError::validation(
                "listingId",
                "listingId must be greater than zero",
            ));
        }

        let tz = self.resolve_timezone(input.timezone.as_deref())?;
        let page = PageRequest::normalized(input.page, input.size);

        let hours = BusinessHours {
            start_hour: self.config().workday_start_hour,
            end_hour: self.config().workday_end_hour,
        };

        let now = self.clock().now();
        let range_start = input.from.unwrap_or(now);
        let range_end = match input.to {
            Some(to) => to,
            None => range_start
                .checked_add_months(Months::new(self.config().default_horizon_months))
                .ok_or_else(|| CoreError::validation("to", "horizon out of range"))?,
        };
        if range_end < range_start {
            return Err(CoreError::validation("to", "to must be after from"));
        }

        let slot_duration = self.config().slot_duration();

        let mut tx = self
            .repo()
            .begin_read_only()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .list_availability_in_tx(&mut tx, &input, tz, hours, now, range_start, range_end, slot_duration)
            .await;

        self.rollback_quietly(tx, "list_availability").await;

        let mut slots = result?;
        sort_availability_slots(&mut slots, input.sort);

        let total = slots.len() as u64;
        let slots = page.slice(&slots);

        Ok(ListAvailabilityOutput {
            slots,
            total,
            page: page.page,
            size: page.size,
            timezone: tz.name().to_string(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn list_availability_in_tx(
        &self,
        tx: &mut crate::db::Tx,
        input: &ListAvailabilityInput,
        tz: Tz,
        hours: BusinessHours,
        now: DateTime<Utc>,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        slot_duration: Duration,
    ) -> CoreResult<Vec<AvailabilitySlot>> {
        let listing = self
            .repo()
            .get_active_listing_version(tx, input.listing_identity_id)
            .await
            .map_err(|e| map_repo_err("Listing", e))?;

        if listing.deleted {
            return Err(CoreError::validation("listing", "listing is not available"));
        }
        if !listing.status.allows_photo_session() {
            return Err(ConflictError::ListingNotEligible.into());
        }

        let city = listing.city.trim().to_string();
        let state = listing.state.trim().to_string();
        if city.is_empty() || state.is_empty() {
            return Err(CoreError::validation(
                "listing",
                "listing address must contain city and state",
            ));
        }

        let photographer_ids = self
            .repo()
            .list_photographer_ids_by_location(tx, &city, &state)
            .await
            .map_err(|e| map_repo_err("Photographer", e))?;

        let from_day = range_start.with_timezone(&tz).date_naive();
        let to_day = range_end.with_timezone(&tz).date_naive();

        // Holiday days per location; photographers sharing a city resolve to
        // the same calendars, so the lookup is cached per (city, state).
        let mut holiday_cache: HashMap<(String, String), Vec<NaiveDate>> = HashMap::new();

        let mut slots = Vec::new();
        for photographer_id in photographer_ids {
            let location = match self
                .repo()
                .get_user_by_id(tx, crate::api::UserId(photographer_id.value()))
                .await
            {
                Ok(user) => {
                    let user_city = user.city.trim().to_string();
                    let user_state = user.state.trim().to_string();
                    if user_city.is_empty() || user_state.is_empty() {
                        (city.clone(), state.clone())
                    } else {
                        (user_city, user_state)
                    }
                }
                Err(err) if err.is_not_found() => (city.clone(), state.clone()),
                Err(err) => return Err(map_repo_err("Photographer", err)),
            };

            let holiday_days = match holiday_cache.get(&location) {
                Some(days) => days.clone(),
                None => {
                    let days = self
                        .location_holiday_days(tx, &location.0, &location.1, from_day, to_day)
                        .await?;
                    holiday_cache.insert(location.clone(), days.clone());
                    days
                }
            };

            let entries = self
                .repo()
                .find_blocking_entries(tx, photographer_id, range_start, range_end)
                .await
                .map_err(|e| map_repo_err("Agenda entry", e))?;

            let free = compute_free_ranges(
                range_start,
                range_end,
                tz,
                hours,
                &entries,
                &holiday_days,
                now,
            );

            for range in free {
                for slot in split_into_slots(range, slot_duration) {
                    let period =
                        SlotPeriod::from_local_hour(slot.start.with_timezone(&tz).hour());
                    if input.period.is_some_and(|wanted| wanted != period) {
                        continue;
                    }
                    slots.push(AvailabilitySlot {
                        slot_id: SlotId::encode(photographer_id, slot.start),
                        photographer_id,
                        start: slot.start,
                        end: slot.end,
                        period,
                        timezone: tz.name().to_string(),
                    });
                }
            }
        }

        Ok(slots)
    }
}
