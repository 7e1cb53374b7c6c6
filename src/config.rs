//! Runtime configuration for the scheduling core.
//!
//! A single immutable record loaded once at startup (environment variables
//! and/or a TOML file) and passed explicitly into service constructors.
//! There is no process-global configuration state.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Configuration for the photo session scheduling core.
///
/// # Options
/// * `slot_duration_minutes` - Duration of one bookable slot. A single value
///   for the whole system: it participates in `SlotId` decoding, so a
///   reservation requesting a different duration is rejected.
/// * `slots_per_period` - Informational cap of slots per period; not a hard
///   constraint enforced by the core.
/// * `morning_start_hour` / `afternoon_start_hour` - Anchors used when
///   classifying a slot as morning or afternoon.
/// * `workday_start_hour` / `workday_end_hour` - Default business window in
///   the photographer's timezone; callers may override per request.
/// * `require_photographer_approval` - Approval regime on reserve: when
///   false, bookings are created `Accepted` and the listing jumps straight
///   to `PhotosScheduled`.
/// * `default_horizon_months` - Upper bound applied when an availability
///   request omits `to`.
/// * `default_timezone` - Fallback IANA zone for requests without one.
/// * `retention_batch_limit` / `retention_default` - Clamping bounds for the
///   retention sweeper batch size.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub slot_duration_minutes: u32,
    pub slots_per_period: u32,
    pub morning_start_hour: u32,
    pub afternoon_start_hour: u32,
    pub workday_start_hour: u32,
    pub workday_end_hour: u32,
    pub require_photographer_approval: bool,
    pub default_horizon_months: u32,
    pub default_timezone: String,
    pub retention_batch_limit: usize,
    pub retention_default: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 240,
            slots_per_period: 1,
            morning_start_hour: 8,
            afternoon_start_hour: 13,
            workday_start_hour: 8,
            workday_end_hour: 19,
            require_photographer_approval: true,
            default_horizon_months: 3,
            default_timezone: "America/Sao_Paulo".to_string(),
            retention_batch_limit: 5000,
            retention_default: 500,
        }
    }
}

impl SchedulingConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Recognized variables mirror the field names upper-cased with a
    /// `SCHED_` prefix, e.g. `SCHED_SLOT_DURATION_MINUTES`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        read_env_u32("SCHED_SLOT_DURATION_MINUTES", &mut cfg.slot_duration_minutes);
        read_env_u32("SCHED_SLOTS_PER_PERIOD", &mut cfg.slots_per_period);
        read_env_u32("SCHED_MORNING_START_HOUR", &mut cfg.morning_start_hour);
        read_env_u32("SCHED_AFTERNOON_START_HOUR", &mut cfg.afternoon_start_hour);
        read_env_u32("SCHED_WORKDAY_START_HOUR", &mut cfg.workday_start_hour);
        read_env_u32("SCHED_WORKDAY_END_HOUR", &mut cfg.workday_end_hour);
        read_env_u32("SCHED_DEFAULT_HORIZON_MONTHS", &mut cfg.default_horizon_months);
        if let Ok(value) = std::env::var("SCHED_REQUIRE_PHOTOGRAPHER_APPROVAL") {
            if let Ok(parsed) = value.parse::<bool>() {
                cfg.require_photographer_approval = parsed;
            }
        }
        if let Ok(value) = std::env::var("SCHED_DEFAULT_TIMEZONE") {
            if !value.trim().is_empty() {
                cfg.default_timezone = value;
            }
        }
        if let Ok(value) = std::env::var("SCHED_RETENTION_BATCH_LIMIT") {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.retention_batch_limit = parsed;
            }
        }
        if let Ok(value) = std::env::var("SCHED_RETENTION_DEFAULT") {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.retention_default = parsed;
            }
        }
        cfg
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CoreError::infra(format!(
                "failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let cfg: SchedulingConfig = toml::from_str(&raw)
            .map_err(|e| CoreError::infra(format!("failed to parse config file: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency of the configured values.
    pub fn validate(&self) -> CoreResult<()> {
        if self.slot_duration_minutes == 0 {
            return Err(CoreError::validation(
                "slot_duration_minutes",
                "must be greater than zero",
            ));
        }
        if self.workday_end_hour <= self.workday_start_hour {
            return Err(CoreError::validation(
                "workday_end_hour",
                "must be greater than workday_start_hour",
            ));
        }
        if self.workday_end_hour > 24 {
            return Err(CoreError::validation(
                "workday_end_hour",
                "must be at most 24",
            ));
        }
        if self.retention_batch_limit == 0 {
            return Err(CoreError::validation(
                "retention_batch_limit",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Slot duration as a chrono duration.
    pub fn slot_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.slot_duration_minutes))
    }

    /// Clamp a requested retention batch limit into the configured bounds.
    /// Zero (or anything non-positive at the caller) selects the default.
    pub fn clamp_retention_limit(&self, requested: usize) -> usize {
        if requested == 0 {
            self.retention_default
        } else {
            requested.clamp(1, self.retention_batch_limit)
        }
    }
}

fn read_env_u32(key: &str, target: &mut u32) {
    if let Ok(value) = std::env::var(key) {
        if let Ok(parsed) = value.parse::<u32>() {
            *target = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let cfg = SchedulingConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.slot_duration_minutes, 240);
        assert_eq!(cfg.workday_start_hour, 8);
        assert_eq!(cfg.workday_end_hour, 19);
        assert!(cfg.require_photographer_approval);
    }

    #[test]
    fn retention_limit_clamping() {
        let cfg = SchedulingConfig::default();
        assert_eq!(cfg.clamp_retention_limit(0), 500);
        assert_eq!(cfg.clamp_retention_limit(12), 12);
        assert_eq!(cfg.clamp_retention_limit(999_999), 5000);
    }

    #[test]
    fn inverted_workday_window_is_rejected() {
        let cfg = SchedulingConfig {
            workday_start_hour: 19,
            workday_end_hour: 8,
            ..SchedulingConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
