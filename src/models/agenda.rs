//! Photographer agenda entries.
//!
//! One agenda entry is one occupied interval on a photographer's calendar.
//! Every blocking fact (photo session, projected holiday, time-off,
//! administrative block) is materialized as an entry; blocking entries of
//! the same photographer never overlap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AgendaEntryId, PhotographerId};

/// What kind of occupation the entry represents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgendaEntryType {
    PhotoSession,
    Holiday,
    TimeOff,
    Block,
}

impl AgendaEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgendaEntryType::PhotoSession => "PHOTO_SESSION",
            AgendaEntryType::Holiday => "HOLIDAY",
            AgendaEntryType::TimeOff => "TIME_OFF",
            AgendaEntryType::Block => "BLOCK",
        }
    }
}

impl std::fmt::Display for AgendaEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which subsystem authored the entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgendaEntrySource {
    Booking,
    Holiday,
    Manual,
    Onboarding,
}

impl AgendaEntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgendaEntrySource::Booking => "BOOKING",
            AgendaEntrySource::Holiday => "HOLIDAY",
            AgendaEntrySource::Manual => "MANUAL",
            AgendaEntrySource::Onboarding => "ONBOARDING",
        }
    }
}

impl std::fmt::Display for AgendaEntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted agenda entry. Timestamps are UTC; `timezone` records the IANA
/// zone the entry was authored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaEntry {
    pub id: AgendaEntryId,
    pub photographer_id: PhotographerId,
    pub entry_type: AgendaEntryType,
    pub source: AgendaEntrySource,
    pub source_id: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub blocking: bool,
    pub reason: Option<String>,
    pub timezone: String,
}

impl AgendaEntry {
    /// Whether `[starts_at, ends_at)` intersects the given half-open window.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.ends_at > from && self.starts_at < to
    }
}

/// Entry awaiting insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct AgendaEntryDraft {
    pub photographer_id: PhotographerId,
    pub entry_type: AgendaEntryType,
    pub source: AgendaEntrySource,
    pub source_id: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub blocking: bool,
    pub reason: Option<String>,
    pub timezone: String,
}

impl AgendaEntryDraft {
    /// Start a draft for the given photographer and window. Drafts default
    /// to blocking, which is what every current entry type wants.
    pub fn new(
        photographer_id: PhotographerId,
        entry_type: AgendaEntryType,
        source: AgendaEntrySource,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            photographer_id,
            entry_type,
            source,
            source_id: None,
            starts_at,
            ends_at,
            blocking: true,
            reason: None,
            timezone: timezone.into(),
        }
    }

    pub fn with_source_id(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if !reason.trim().is_empty() {
            self.reason = Some(reason.trim().to_string());
        }
        self
    }

    pub fn non_blocking(mut self) -> Self {
        self.blocking = false;
        self
    }

    /// Materialize the draft with a store-assigned id.
    pub fn into_entry(self, id: AgendaEntryId) -> AgendaEntry {
        AgendaEntry {
            id,
            photographer_id: self.photographer_id,
            entry_type: self.entry_type,
            source: self.source,
            source_id: self.source_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            blocking: self.blocking,
            reason: self.reason,
            timezone: self.timezone,
        }
    }

    /// A draft is well-formed when its interval is non-empty.
    pub fn is_well_formed(&self) -> bool {
        self.starts_at < self.ends_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(start_h: u32, end_h: u32) -> AgendaEntry {
        AgendaEntryDraft::new(
            PhotographerId(1),
            AgendaEntryType::TimeOff,
            AgendaEntrySource::Manual,
            Utc.with_ymd_and_hms(2025, 3, 10, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 10, end_h, 0, 0).unwrap(),
            "UTC",
        )
        .into_entry(AgendaEntryId(1))
    }

    #[test]
    fn overlap_is_half_open() {
        let e = entry(10, 12);
        let at = |h| Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap();
        assert!(e.overlaps(at(11), at(13)));
        assert!(e.overlaps(at(9), at(11)));
        // Touching boundaries do not overlap.
        assert!(!e.overlaps(at(12), at(14)));
        assert!(!e.overlaps(at(8), at(10)));
    }

    #[test]
    fn draft_trims_reason_and_drops_blank() {
        let base = AgendaEntryDraft::new(
            PhotographerId(1),
            AgendaEntryType::TimeOff,
            AgendaEntrySource::Manual,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            "UTC",
        );
        assert_eq!(
            base.clone().with_reason("  dentist  ").reason.as_deref(),
            Some("dentist")
        );
        assert!(base.with_reason("   ").reason.is_none());
    }
}
