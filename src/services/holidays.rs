//! Holiday projection.
//!
//! Calendars resolve for a location in scope order (national, then state,
//! then city); dates are read with total-less pagination (a short page
//! terminates the scan). Multiple calendars marking the same local day are
//! merged into one whole-day block carrying every label and calendar id.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::api::HolidayCalendarId;
use crate::db::{AgendaRepository, HolidayRepository, TransactionManager, Tx};
use crate::error::{map_repo_err, CoreError, CoreResult};
use crate::models::{
    AgendaEntryDraft, AgendaEntrySource, AgendaEntryType, CalendarDatesFilter, CalendarFilter,
    CalendarScope, HolidayCalendar, HolidayDate,
};
use crate::services::availability::local_day_range;
use crate::services::types::EnsureAgendaInput;
use crate::services::SchedulerService;

const CALENDAR_PAGE_LIMIT: usize = 100;
const DATES_PAGE_LIMIT: usize = 200;

/// All calendars marking one local day, merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedHolidayDay {
    pub labels: Vec<String>,
    pub calendar_ids: Vec<HolidayCalendarId>,
}

impl MergedHolidayDay {
    fn absorb(&mut self, date: &HolidayDate) {
        let label = date.label.trim();
        let label = if label.is_empty() { "Holiday" } else { label };
        if !self.labels.iter().any(|existing| existing == label) {
            self.labels.push(label.to_string());
        }
        if !self.calendar_ids.contains(&date.calendar_id) {
            self.calendar_ids.push(date.calendar_id);
        }
    }
}

/// Group holiday dates by calendar day, merging labels and calendar ids.
pub fn merge_holiday_dates(dates: &[HolidayDate]) -> BTreeMap<NaiveDate, MergedHolidayDay> {
    let mut merged: BTreeMap<NaiveDate, MergedHolidayDay> = BTreeMap::new();
    for date in dates {
        merged.entry(date.date).or_default().absorb(date);
    }
    merged
}

impl SchedulerService {
    /// Calendars in scope for a location, resolved national → state → city
    /// and deduplicated by id.
    pub(crate) async fn resolve_location_calendars(
        &self,
        tx: &mut Tx,
        city: &str,
        state: &str,
    ) -> CoreResult<Vec<HolidayCalendar>> {
        let state = state.trim().to_uppercase();
        let city = city.trim().to_string();

        let mut scopes = vec![(CalendarScope::National, None, None)];
        if !state.is_empty() {
            scopes.push((CalendarScope::State, Some(state.clone()), None));
            if !city.is_empty() {
                scopes.push((CalendarScope::City, Some(state.clone()), Some(city.clone())));
            }
        }

        let mut by_id: BTreeMap<i64, HolidayCalendar> = BTreeMap::new();
        for (scope, state_filter, city_filter) in scopes {
            let mut page = 1;
            loop {
                let filter = CalendarFilter {
                    scope: Some(scope),
                    state: state_filter.clone(),
                    city: city_filter.clone(),
                    only_active: true,
                    page,
                    limit: CALENDAR_PAGE_LIMIT,
                };
                let calendars = self
                    .repo()
                    .list_calendars(tx, &filter)
                    .await
                    .map_err(|e| map_repo_err("Holiday calendar", e))?;
                let fetched = calendars.len();
                for calendar in calendars {
                    by_id.insert(calendar.id.value(), calendar);
                }
                if fetched < CALENDAR_PAGE_LIMIT {
                    break;
                }
                page += 1;
            }
        }

        Ok(by_id.into_values().collect())
    }

    /// Every date of the given calendars intersecting the day window.
    pub(crate) async fn fetch_calendar_dates(
        &self,
        tx: &mut Tx,
        calendar_ids: &[HolidayCalendarId],
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<Vec<HolidayDate>> {
        let mut dates = Vec::new();
        for calendar_id in calendar_ids {
            if !calendar_id.is_valid() {
                continue;
            }
            let mut page = 1;
            loop {
                let filter = CalendarDatesFilter {
                    calendar_id: *calendar_id,
                    from,
                    to,
                    page,
                    limit: DATES_PAGE_LIMIT,
                };
                let fetched = self
                    .repo()
                    .list_calendar_dates(tx, &filter)
                    .await
                    .map_err(|e| map_repo_err("Holiday date", e))?;
                let count = fetched.len();
                dates.extend(fetched);
                if count < DATES_PAGE_LIMIT {
                    break;
                }
                page += 1;
            }
        }
        Ok(dates)
    }

    /// The distinct holiday days for a location over a day window.
    pub(crate) async fn location_holiday_days(
        &self,
        tx: &mut Tx,
        city: &str,
        state: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<Vec<NaiveDate>> {
        let calendars = self.resolve_location_calendars(tx, city, state).await?;
        if calendars.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<HolidayCalendarId> = calendars.iter().map(|c| c.id).collect();
        let dates = self.fetch_calendar_dates(tx, &ids, from, to).await?;
        Ok(merge_holiday_dates(&dates).into_keys().collect())
    }

    /// Merged holiday days (labels + calendar ids) for a location.
    pub(crate) async fn location_merged_holidays(
        &self,
        tx: &mut Tx,
        city: &str,
        state: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<BTreeMap<NaiveDate, MergedHolidayDay>> {
        let calendars = self.resolve_location_calendars(tx, city, state).await?;
        if calendars.is_empty() {
            return Ok(BTreeMap::new());
        }
        let ids: Vec<HolidayCalendarId> = calendars.iter().map(|c| c.id).collect();
        let dates = self.fetch_calendar_dates(tx, &ids, from, to).await?;
        Ok(merge_holiday_dates(&dates))
    }

    /// (Re)provision a photographer's projected holiday agenda: replace the
    /// calendar associations when requested, then rematerialize the
    /// holiday-sourced entries over the configured horizon.
    ///
    /// Days already occupied by another blocking entry are skipped; they are
    /// blocked either way and a second blocking row would break the
    /// no-overlap invariant.
    pub async fn ensure_photographer_agenda(&self, input: EnsureAgendaInput) -> CoreResult<()> {
        if !input.photographer_id.is_valid() {
            return Err(CoreError::validation(
                "photographerId",
                "photographerId must be greater than zero",
            ));
        }
        let tz = self.resolve_timezone(input.timezone.as_deref())?;
        let horizon = input
            .horizon_months
            .unwrap_or(self.config().default_horizon_months);

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .ensure_agenda_in_tx(&mut tx, &input, tz, horizon)
            .await;

        match result {
            Ok(()) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit agenda bootstrap", e))?;
                tracing::info!(
                    photographer_id = input.photographer_id.value(),
                    "photo_session.bootstrap.success"
                );
                Ok(())
            }
            Err(err) => {
                self.rollback_quietly(tx, "ensure_photographer_agenda").await;
                Err(err)
            }
        }
    }

    async fn ensure_agenda_in_tx(
        &self,
        tx: &mut Tx,
        input: &EnsureAgendaInput,
        tz: Tz,
        horizon_months: u32,
    ) -> CoreResult<()> {
        if let Some(ref calendar_ids) = input.calendar_ids {
            let wanted: Vec<HolidayCalendarId> = calendar_ids
                .iter()
                .copied()
                .filter(HolidayCalendarId::is_valid)
                .collect();
            self.repo()
                .replace_associations(tx, input.photographer_id, &wanted)
                .await
                .map_err(|e| map_repo_err("Holiday calendar association", e))?;
        }

        let associations = self
            .repo()
            .list_associations(tx, input.photographer_id)
            .await
            .map_err(|e| map_repo_err("Holiday calendar association", e))?;

        self.repo()
            .delete_entries_by_source(
                tx,
                input.photographer_id,
                AgendaEntryType::Holiday,
                AgendaEntrySource::Holiday,
                None,
            )
            .await
            .map_err(|e| map_repo_err("Agenda entry", e))?;

        if associations.is_empty() {
            return Ok(());
        }

        let today = self.clock().now().with_timezone(&tz).date_naive();
        let until = today
            .checked_add_months(chrono::Months::new(horizon_months))
            .ok_or_else(|| CoreError::validation("horizonMonths", "horizon out of range"))?;

        let calendar_ids: Vec<HolidayCalendarId> =
            associations.iter().map(|assoc| assoc.calendar_id).collect();
        let dates = self
            .fetch_calendar_dates(tx, &calendar_ids, today, until)
            .await?;

        let mut drafts = Vec::new();
        for (day, merged) in merge_holiday_dates(&dates) {
            let Some(range) = local_day_range(tz, day) else {
                continue;
            };

            let occupied = self
                .repo()
                .find_blocking_entries(tx, input.photographer_id, range.start, range.end)
                .await
                .map_err(|e| map_repo_err("Agenda entry", e))?;
            if !occupied.is_empty() {
                continue;
            }

            let mut draft = AgendaEntryDraft::new(
                input.photographer_id,
                AgendaEntryType::Holiday,
                AgendaEntrySource::Holiday,
                range.start,
                range.end,
                tz.name(),
            )
            .with_reason(merged.labels.join(", "));
            if let Some(first) = merged.calendar_ids.first() {
                draft = draft.with_source_id(first.value());
            }
            drafts.push(draft);
        }

        if !drafts.is_empty() {
            self.repo()
                .create_entries(tx, &drafts)
                .await
                .map_err(|e| map_repo_err("Agenda entry", e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HolidayCalendarId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_calendars_merge_labels_and_ids() {
        let dates = vec![
            HolidayDate {
                calendar_id: HolidayCalendarId(1),
                date: date(2025, 4, 21),
                label: "Tiradentes".to_string(),
            },
            HolidayDate {
                calendar_id: HolidayCalendarId(2),
                date: date(2025, 4, 21),
                label: "City Founding".to_string(),
            },
            HolidayDate {
                calendar_id: HolidayCalendarId(1),
                date: date(2025, 5, 1),
                label: "".to_string(),
            },
        ];
        let merged = merge_holiday_dates(&dates);
        assert_eq!(merged.len(), 2);

        let day = &merged[&date(2025, 4, 21)];
        assert_eq!(day.labels, vec!["Tiradentes", "City Founding"]);
        assert_eq!(
            day.calendar_ids,
            vec![HolidayCalendarId(1), HolidayCalendarId(2)]
        );

        // Blank labels fall back to a generic one.
        assert_eq!(merged[&date(2025, 5, 1)].labels, vec!["Holiday"]);
    }
}
