//! Deterministic slot identifiers.
//!
//! A `SlotId` couples the photographer and the slot start instant so that
//! availability listing and reservation refer to the same window without a
//! server round-trip: the server recomputes the slot end from the configured
//! duration. Synthetic display entries (holidays, weekends, outside-hours
//! blocks) use a separate hashed id space with the high bit forced set so
//! clients can tell them apart from persisted agenda entries.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::api::PhotographerId;

const PHOTOGRAPHER_SHIFT: u32 = 32;
const TIME_MASK: u64 = (1 << PHOTOGRAPHER_SHIFT) - 1;

/// Encoded (photographer, slot start) pair.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SlotId(pub u64);

impl SlotId {
    /// Encode a photographer id and a UTC slot start into one 64-bit id:
    /// photographer in the high 32 bits, unix seconds in the low 32 bits.
    pub fn encode(photographer_id: PhotographerId, start: DateTime<Utc>) -> Self {
        let seconds = (start.timestamp() as u64) & TIME_MASK;
        SlotId(((photographer_id.0 as u64) << PHOTOGRAPHER_SHIFT) | seconds)
    }

    /// Decode back into the photographer id and the UTC slot start.
    pub fn decode(&self) -> (PhotographerId, DateTime<Utc>) {
        let photographer = (self.0 >> PHOTOGRAPHER_SHIFT) as i64;
        let seconds = (self.0 & TIME_MASK) as i64;
        let start = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH);
        (PhotographerId(photographer), start)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-day classification of a slot by its local start hour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotPeriod {
    Morning,
    Afternoon,
}

impl SlotPeriod {
    /// Slots starting before noon (local time) are morning slots.
    pub fn from_local_hour(hour: u32) -> Self {
        if hour < 12 {
            SlotPeriod::Morning
        } else {
            SlotPeriod::Afternoon
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotPeriod::Morning => "MORNING",
            SlotPeriod::Afternoon => "AFTERNOON",
        }
    }
}

impl std::fmt::Display for SlotPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic id for synthetic display slots, FNV-1a over the namespace,
/// the slot start, and any extra discriminators, with the high bit set.
pub fn synthetic_slot_id(namespace: &str, start: DateTime<Utc>, extras: &[&str]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    let mut feed = |bytes: &[u8]| {
        for byte in bytes {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    };

    feed(namespace.as_bytes());
    feed(start.to_rfc3339().as_bytes());
    for extra in extras {
        feed(&[0]);
        feed(extra.as_bytes());
    }

    hash | (1 << 63)
}
