//! Owner response SLAs and listing view counting.

use crate::api::ListingIdentityId;
use crate::db::{EngagementRepository, TransactionManager};
use crate::error::{map_repo_err, CoreError, CoreResult};
use crate::models::OwnerResponseMetrics;
use crate::services::types::RecordOwnerResponseInput;
use crate::services::SchedulerService;

impl SchedulerService {
    /// Fold one owner response into the aggregates, creating the row on
    /// first use. Returns the updated aggregates.
    pub async fn record_owner_response(
        &self,
        input: RecordOwnerResponseInput,
    ) -> CoreResult<OwnerResponseMetrics> {
        if !input.owner_id.is_valid() {
            return Err(CoreError::validation(
                "ownerId",
                "ownerId must be greater than zero",
            ));
        }
        if !input.elapsed_seconds.is_finite() || input.elapsed_seconds < 0.0 {
            return Err(CoreError::validation(
                "elapsedSeconds",
                "elapsedSeconds must be non-negative",
            ));
        }

        let now = self.clock().now();

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = async {
            let mut metrics = match self
                .repo()
                .get_owner_response_metrics(&mut tx, input.owner_id)
                .await
            {
                Ok(metrics) => metrics,
                Err(err) if err.is_not_found() => OwnerResponseMetrics::empty(input.owner_id),
                Err(err) => return Err(map_repo_err("Owner response metrics", err)),
            };

            metrics.record(input.kind, input.elapsed_seconds, now);

            self.repo()
                .upsert_owner_response_metrics(&mut tx, &metrics)
                .await
                .map_err(|e| map_repo_err("Owner response metrics", e))?;
            Ok(metrics)
        }
        .await;

        match result {
            Ok(metrics) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit response metrics", e))?;
                Ok(metrics)
            }
            Err(err) => {
                self.rollback_quietly(tx, "record_owner_response").await;
                Err(err)
            }
        }
    }

    /// Bump the view counter for a listing identity; returns the new total.
    pub async fn register_listing_view(
        &self,
        listing_identity_id: ListingIdentityId,
    ) -> CoreResult<u64> {
        if !listing_identity_id.is_valid() {
            return Err(CoreError::validation(
                "listingId",
                "listingId must be greater than zero",
            ));
        }

        let now = self.clock().now();

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .repo()
            .increment_and_get_views(&mut tx, listing_identity_id, now)
            .await
            .map_err(|e| map_repo_err("Listing view counter", e));

        match result {
            Ok(views) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit view counter", e))?;
                Ok(views)
            }
            Err(err) => {
                self.rollback_quietly(tx, "register_listing_view").await;
                Err(err)
            }
        }
    }
}
