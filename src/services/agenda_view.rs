//! Photographer agenda listing with display enrichment.
//!
//! The listing returns the raw persisted entries and synthesizes
//! display-only slots for holidays, weekends and outside-business-hours
//! windows so clients see a complete calendar. Synthetic slots never touch
//! the store; their ids live in a hashed id space with the high bit set.
//! Group ids concatenate the source with the local calendar day so clients
//! can collapse multi-day blocks.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use crate::api::{PageRequest, PhotographerId, UserId};
use crate::db::{AgendaRepository, TransactionManager, Tx, UserRepository};
use crate::error::{map_repo_err, CoreError, CoreResult};
use crate::models::{
    synthetic_slot_id, AgendaEntry, AgendaEntrySource, AgendaEntryType,
};
use crate::services::availability::{clamp_range, local_day_range, local_moment, TimeRange};
use crate::services::types::{AgendaSlotView, ListAgendaInput, ListAgendaOutput, SlotStatus};
use crate::services::SchedulerService;

fn group_id(source: AgendaEntrySource, start: DateTime<Utc>, tz: Tz) -> String {
    format!(
        "{}-{}",
        source.as_str().to_lowercase(),
        start.with_timezone(&tz).format("%Y-%m-%d")
    )
}

fn occupancy_key(
    entry_type: AgendaEntryType,
    source: AgendaEntrySource,
    range: TimeRange,
) -> String {
    format!(
        "{}|{}|{}|{}",
        entry_type.as_str(),
        source.as_str(),
        range.start.timestamp(),
        range.end.timestamp()
    )
}

fn entry_view(entry: &AgendaEntry, tz: Tz) -> AgendaSlotView {
    let status = match entry.entry_type {
        AgendaEntryType::PhotoSession => SlotStatus::Booked,
        _ if entry.blocking => SlotStatus::Blocked,
        _ => SlotStatus::Available,
    };

    AgendaSlotView {
        entry_id: entry.id.value() as u64,
        photographer_id: entry.photographer_id,
        entry_type: entry.entry_type,
        source: entry.source,
        source_id: entry.source_id,
        start: entry.starts_at,
        end: entry.ends_at,
        status,
        group_id: group_id(entry.source, entry.starts_at, tz),
        is_holiday: entry.entry_type == AgendaEntryType::Holiday,
        is_time_off: entry.entry_type == AgendaEntryType::TimeOff,
        holiday_labels: match (entry.entry_type, &entry.reason) {
            (AgendaEntryType::Holiday, Some(reason)) => vec![reason.clone()],
            _ => Vec::new(),
        },
        holiday_calendar_ids: match (entry.entry_type, entry.source_id) {
            (AgendaEntryType::Holiday, Some(source_id)) => {
                vec![crate::api::HolidayCalendarId(source_id)]
            }
            _ => Vec::new(),
        },
        reason: entry.reason.clone(),
        timezone: tz.name().to_string(),
    }
}

fn synthetic_block_view(
    photographer_id: PhotographerId,
    range: TimeRange,
    tz: Tz,
    reason: &str,
) -> AgendaSlotView {
    let normalized = reason.to_lowercase().replace(' ', "-");
    let owner_tag = photographer_id.value().to_string();
    AgendaSlotView {
        entry_id: synthetic_slot_id("block", range.start, &[owner_tag.as_str(), normalized.as_str()]),
        photographer_id,
        entry_type: AgendaEntryType::Block,
        source: AgendaEntrySource::Onboarding,
        source_id: None,
        start: range.start,
        end: range.end,
        status: SlotStatus::Blocked,
        group_id: format!(
            "synthetic-{normalized}-{}",
            range.start.with_timezone(&tz).format("%Y-%m-%d")
        ),
        is_holiday: false,
        is_time_off: false,
        holiday_labels: Vec::new(),
        holiday_calendar_ids: Vec::new(),
        reason: Some(reason.to_string()),
        timezone: tz.name().to_string(),
    }
}

impl SchedulerService {
    /// Raw agenda entries plus synthesized holiday/weekend/outside-hours
    /// display slots, ordered by start and paginated.
    pub async fn list_agenda(&self, input: ListAgendaInput) -> CoreResult<ListAgendaOutput> {
        if !input.photographer_id.is_valid() {
            return Err(CoreError::validation(
                "photographerId",
                "photographerId must be greater than zero",
            ));
        }
        if input.to < input.from {
            return Err(CoreError::validation(
                "endDate",
                "endDate must be after or equal to startDate",
            ));
        }

        let tz = self.resolve_timezone(input.timezone.as_deref())?;
        let page = PageRequest::normalized(input.page, input.size);

        let mut tx = self
            .repo()
            .begin_read_only()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self.list_agenda_in_tx(&mut tx, &input, tz).await;
        self.rollback_quietly(tx, "list_agenda").await;

        let mut slots = result?;
        slots.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.entry_id.cmp(&b.entry_id)));

        let total = slots.len() as u64;
        let slots = page.slice(&slots);

        Ok(ListAgendaOutput {
            slots,
            total,
            page: page.page,
            size: page.size,
            timezone: tz.name().to_string(),
        })
    }

    async fn list_agenda_in_tx(
        &self,
        tx: &mut Tx,
        input: &ListAgendaInput,
        tz: Tz,
    ) -> CoreResult<Vec<AgendaSlotView>> {
        let entries = self
            .repo()
            .list_entries_by_range(tx, input.photographer_id, input.from, input.to, input.entry_type)
            .await
            .map_err(|e| map_repo_err("Agenda entry", e))?;

        let mut occupied: HashSet<String> = entries
            .iter()
            .map(|entry| {
                occupancy_key(
                    entry.entry_type,
                    entry.source,
                    TimeRange::new(entry.starts_at, entry.ends_at),
                )
            })
            .collect();

        let mut slots: Vec<AgendaSlotView> =
            entries.iter().map(|entry| entry_view(entry, tz)).collect();

        let want_holidays = matches!(input.entry_type, None | Some(AgendaEntryType::Holiday));
        let want_blocks = matches!(input.entry_type, None | Some(AgendaEntryType::Block));

        if want_holidays {
            slots.extend(
                self.synthesize_holiday_slots(tx, input, tz, &mut occupied)
                    .await?,
            );
        }
        if want_blocks {
            slots.extend(self.synthesize_non_working_slots(input, tz, &mut occupied));
        }

        Ok(slots)
    }

    async fn synthesize_holiday_slots(
        &self,
        tx: &mut Tx,
        input: &ListAgendaInput,
        tz: Tz,
        occupied: &mut HashSet<String>,
    ) -> CoreResult<Vec<AgendaSlotView>> {
        // The photographer's location decides which calendars apply; a
        // photographer without a profile row simply gets no holiday slots.
        let user = match self
            .repo()
            .get_user_by_id(tx, UserId(input.photographer_id.value()))
            .await
        {
            Ok(user) => user,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(map_repo_err("Photographer", err)),
        };
        if user.city.trim().is_empty() || user.state.trim().is_empty() {
            return Ok(Vec::new());
        }

        let from_day = input.from.with_timezone(&tz).date_naive();
        let to_day = input.to.with_timezone(&tz).date_naive();
        let merged = self
            .location_merged_holidays(tx, &user.city, &user.state, from_day, to_day)
            .await?;

        let mut slots = Vec::new();
        for (day, holiday) in merged {
            let Some(range) = local_day_range(tz, day) else {
                continue;
            };
            let Some(clamped) = clamp_range(range, input.from, input.to) else {
                continue;
            };

            let key = occupancy_key(AgendaEntryType::Holiday, AgendaEntrySource::Holiday, clamped);
            if !occupied.insert(key) {
                continue;
            }

            let calendar_tag = holiday
                .calendar_ids
                .first()
                .map(|id| id.value().to_string())
                .unwrap_or_default();
            slots.push(AgendaSlotView {
                entry_id: synthetic_slot_id("holiday", clamped.start, &[calendar_tag.as_str()]),
                photographer_id: input.photographer_id,
                entry_type: AgendaEntryType::Holiday,
                source: AgendaEntrySource::Holiday,
                source_id: holiday.calendar_ids.first().map(|id| id.value()),
                start: clamped.start,
                end: clamped.end,
                status: SlotStatus::Blocked,
                group_id: format!("holiday-{}", day.format("%Y-%m-%d")),
                is_holiday: true,
                is_time_off: false,
                reason: holiday.labels.first().cloned(),
                holiday_labels: holiday.labels,
                holiday_calendar_ids: holiday.calendar_ids,
                timezone: tz.name().to_string(),
            });
        }

        Ok(slots)
    }

    fn synthesize_non_working_slots(
        &self,
        input: &ListAgendaInput,
        tz: Tz,
        occupied: &mut HashSet<String>,
    ) -> Vec<AgendaSlotView> {
        let start_hour = self.config().workday_start_hour;
        let end_hour = self.config().workday_end_hour;

        let mut slots = Vec::new();
        let mut day = input.from.with_timezone(&tz).date_naive();
        let last_day = input.to.with_timezone(&tz).date_naive();

        while day <= last_day {
            slots.extend(self.day_block_slots(input, tz, day, start_hour, end_hour, occupied));
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        slots
    }

    fn day_block_slots(
        &self,
        input: &ListAgendaInput,
        tz: Tz,
        day: NaiveDate,
        start_hour: u32,
        end_hour: u32,
        occupied: &mut HashSet<String>,
    ) -> Vec<AgendaSlotView> {
        let mut slots = Vec::new();
        let Some(full_day) = local_day_range(tz, day) else {
            return slots;
        };

        let mut push_block = |range: TimeRange, reason: &str| {
            let Some(clamped) = clamp_range(range, input.from, input.to) else {
                return;
            };
            let key = occupancy_key(AgendaEntryType::Block, AgendaEntrySource::Onboarding, clamped);
            if occupied.insert(key) {
                slots.push(synthetic_block_view(input.photographer_id, clamped, tz, reason));
            }
        };

        let weekday = day.weekday();
        if weekday == Weekday::Sat || weekday == Weekday::Sun {
            push_block(full_day, "Weekend");
        } else {
            if start_hour > 0 {
                if let Some(business_start) = local_moment(tz, day, start_hour) {
                    if business_start > full_day.start {
                        push_block(
                            TimeRange::new(full_day.start, business_start),
                            "Outside business hours",
                        );
                    }
                }
            }
            if end_hour < 24 {
                if let Some(business_end) = local_moment(tz, day, end_hour) {
                    if business_end < full_day.end {
                        push_block(
                            TimeRange::new(business_end, full_day.end),
                            "Outside business hours",
                        );
                    }
                }
            }
        }

        slots
    }
}
