//! Photographer service area management.

use crate::api::{PageRequest, PhotographerId, ServiceAreaId};
use crate::db::{ServiceAreaRepository, TransactionManager};
use crate::error::{map_repo_err, map_repo_err_conflict, ConflictError, CoreError, CoreResult};
use crate::models::ServiceArea;
use crate::services::types::{
    CreateServiceAreaInput, ListServiceAreasOutput, UpdateServiceAreaInput,
};
use crate::services::SchedulerService;

fn normalized_location(city: &str, state: &str) -> CoreResult<(String, String)> {
    let city = city.trim().to_string();
    let state = state.trim().to_uppercase();
    if city.is_empty() {
        return Err(CoreError::validation("city", "city is required"));
    }
    if state.is_empty() {
        return Err(CoreError::validation("state", "state is required"));
    }
    Ok((city, state))
}

impl SchedulerService {
    /// Add a (city, state) pair to a photographer's coverage.
    pub async fn create_service_area(
        &self,
        input: CreateServiceAreaInput,
    ) -> CoreResult<ServiceAreaId> {
        if !input.photographer_id.is_valid() {
            return Err(CoreError::validation(
                "photographerId",
                "photographerId must be greater than zero",
            ));
        }
        let (city, state) = normalized_location(&input.city, &input.state)?;

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let area = ServiceArea {
            id: ServiceAreaId(0),
            photographer_id: input.photographer_id,
            city,
            state,
        };
        let result = self
            .repo()
            .create_service_area(&mut tx, &area)
            .await
            .map_err(|e| map_repo_err_conflict("Service area", e, ConflictError::AlreadyExists));

        match result {
            Ok(id) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit service area", e))?;
                Ok(id)
            }
            Err(err) => {
                self.rollback_quietly(tx, "create_service_area").await;
                Err(err)
            }
        }
    }

    /// Update the location of an existing service area.
    pub async fn update_service_area(
        &self,
        input: UpdateServiceAreaInput,
    ) -> CoreResult<ServiceArea> {
        if !input.service_area_id.is_valid() {
            return Err(CoreError::validation(
                "serviceAreaId",
                "serviceAreaId must be greater than zero",
            ));
        }
        let (city, state) = normalized_location(&input.city, &input.state)?;

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = async {
            let existing = self
                .repo()
                .get_service_area_by_id(&mut tx, input.service_area_id)
                .await
                .map_err(|e| map_repo_err("Service area", e))?;
            if existing.photographer_id != input.photographer_id {
                return Err(CoreError::NotFound("Service area"));
            }

            let updated = ServiceArea {
                city,
                state,
                ..existing
            };
            self.repo()
                .update_service_area(&mut tx, &updated)
                .await
                .map_err(|e| {
                    map_repo_err_conflict("Service area", e, ConflictError::AlreadyExists)
                })?;
            Ok(updated)
        }
        .await;

        match result {
            Ok(area) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit service area", e))?;
                Ok(area)
            }
            Err(err) => {
                self.rollback_quietly(tx, "update_service_area").await;
                Err(err)
            }
        }
    }

    /// Remove a service area, checking ownership.
    pub async fn delete_service_area(
        &self,
        photographer_id: PhotographerId,
        service_area_id: ServiceAreaId,
    ) -> CoreResult<()> {
        if !service_area_id.is_valid() {
            return Err(CoreError::validation(
                "serviceAreaId",
                "serviceAreaId must be greater than zero",
            ));
        }

        let mut tx = self
            .repo()
            .begin()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = async {
            let existing = self
                .repo()
                .get_service_area_by_id(&mut tx, service_area_id)
                .await
                .map_err(|e| map_repo_err("Service area", e))?;
            if existing.photographer_id != photographer_id {
                return Err(CoreError::NotFound("Service area"));
            }
            self.repo()
                .delete_service_area(&mut tx, service_area_id)
                .await
                .map_err(|e| map_repo_err("Service area", e))
        }
        .await;

        match result {
            Ok(()) => {
                self.repo()
                    .commit(tx)
                    .await
                    .map_err(|e| CoreError::infra_from("failed to commit service area removal", e))?;
                Ok(())
            }
            Err(err) => {
                self.rollback_quietly(tx, "delete_service_area").await;
                Err(err)
            }
        }
    }

    /// Paginated service areas of one photographer.
    pub async fn list_service_areas(
        &self,
        photographer_id: PhotographerId,
        page: usize,
        size: usize,
    ) -> CoreResult<ListServiceAreasOutput> {
        if !photographer_id.is_valid() {
            return Err(CoreError::validation(
                "photographerId",
                "photographerId must be greater than zero",
            ));
        }
        let page = PageRequest::normalized(page, size);

        let mut tx = self
            .repo()
            .begin_read_only()
            .await
            .map_err(|e| CoreError::infra_from("failed to start transaction", e))?;

        let result = self
            .repo()
            .list_service_areas_by_photographer(&mut tx, photographer_id)
            .await
            .map_err(|e| map_repo_err("Service area", e));

        self.rollback_quietly(tx, "list_service_areas").await;

        let areas = result?;
        let total = areas.len() as u64;
        let areas = page.slice(&areas);

        Ok(ListServiceAreasOutput {
            areas,
            total,
            page: page.page,
            size: page.size,
        })
    }
}
