//! Owner response SLAs and listing view counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ListingIdentityId, UserId};

/// Which kind of owner response was recorded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseKind {
    Visit,
    Proposal,
}

/// Aggregated response-time statistics per listing owner. Counts are
/// monotone nondecreasing; averages are running means in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerResponseMetrics {
    pub owner_id: UserId,
    pub visit_avg_seconds: f64,
    pub visit_count: u64,
    pub visit_last_at: Option<DateTime<Utc>>,
    pub proposal_avg_seconds: f64,
    pub proposal_count: u64,
    pub proposal_last_at: Option<DateTime<Utc>>,
}

impl OwnerResponseMetrics {
    pub fn empty(owner_id: UserId) -> Self {
        Self {
            owner_id,
            visit_avg_seconds: 0.0,
            visit_count: 0,
            visit_last_at: None,
            proposal_avg_seconds: 0.0,
            proposal_count: 0,
            proposal_last_at: None,
        }
    }

    /// Fold one response into the running aggregates.
    pub fn record(&mut self, kind: ResponseKind, elapsed_seconds: f64, at: DateTime<Utc>) {
        let elapsed = elapsed_seconds.max(0.0);
        match kind {
            ResponseKind::Visit => {
                self.visit_avg_seconds = running_mean(
                    self.visit_avg_seconds,
                    self.visit_count,
                    elapsed,
                );
                self.visit_count += 1;
                self.visit_last_at = Some(at);
            }
            ResponseKind::Proposal => {
                self.proposal_avg_seconds = running_mean(
                    self.proposal_avg_seconds,
                    self.proposal_count,
                    elapsed,
                );
                self.proposal_count += 1;
                self.proposal_last_at = Some(at);
            }
        }
    }
}

fn running_mean(current: f64, count: u64, sample: f64) -> f64 {
    let n = count as f64;
    (current * n + sample) / (n + 1.0)
}

/// Atomic per-identity view counter. Views are monotone nondecreasing and
/// `increment_and_get` on the store returns strictly increasing values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListingViewCounter {
    pub listing_identity_id: ListingIdentityId,
    pub views: u64,
    pub last_view_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn running_average_over_three_samples() {
        let mut metrics = OwnerResponseMetrics::empty(UserId(100));
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        metrics.record(ResponseKind::Visit, 60.0, at);
        metrics.record(ResponseKind::Visit, 120.0, at);
        metrics.record(ResponseKind::Visit, 180.0, at);
        assert_eq!(metrics.visit_count, 3);
        assert!((metrics.visit_avg_seconds - 120.0).abs() < 1e-9);
        assert_eq!(metrics.proposal_count, 0);
    }

    #[test]
    fn negative_samples_clamp_to_zero() {
        let mut metrics = OwnerResponseMetrics::empty(UserId(100));
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        metrics.record(ResponseKind::Proposal, -5.0, at);
        assert_eq!(metrics.proposal_count, 1);
        assert_eq!(metrics.proposal_avg_seconds, 0.0);
    }
}
