//! Holiday catalog read model.
//!
//! Holidays are projected, never owned: the catalog lives in its own
//! subsystem and the scheduling core materializes whole-day blocks from it
//! on demand.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{HolidayCalendarId, PhotographerId};

/// Geographic scope of a holiday calendar. Calendars are resolved for a
/// photographer in scope order: national, then state, then city.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarScope {
    National,
    State,
    City,
}

impl CalendarScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarScope::National => "NATIONAL",
            CalendarScope::State => "STATE",
            CalendarScope::City => "CITY",
        }
    }
}

/// A named catalog of holiday dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    pub id: HolidayCalendarId,
    pub name: String,
    pub scope: CalendarScope,
    pub state: Option<String>,
    pub city: Option<String>,
    pub active: bool,
}

/// One holiday date inside a calendar. The date is a plain calendar day;
/// whole-day semantics are applied in the photographer's timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidayDate {
    pub calendar_id: HolidayCalendarId,
    pub date: NaiveDate,
    pub label: String,
}

/// Which holiday calendars a photographer observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendarAssociation {
    pub photographer_id: PhotographerId,
    pub calendar_id: HolidayCalendarId,
}

/// Filter for calendar listing. Paginated with total-less iteration: a page
/// shorter than `limit` terminates the scan.
#[derive(Debug, Clone, Default)]
pub struct CalendarFilter {
    pub scope: Option<CalendarScope>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub only_active: bool,
    pub page: usize,
    pub limit: usize,
}

/// Filter for the dates of one calendar intersecting a window.
#[derive(Debug, Clone)]
pub struct CalendarDatesFilter {
    pub calendar_id: HolidayCalendarId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub page: usize,
    pub limit: usize,
}
