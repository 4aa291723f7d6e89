//! Equipment service

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::notify::IdentityResolver;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::ImpactCategory,
        equipment::{AdjustMaintenance, CreateEquipment, EquipmentItem, UpdateEquipment},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
    resolver: Arc<dyn IdentityResolver>,
}

impl EquipmentService {
    pub fn new(repository: Repository, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { repository, resolver }
    }

    pub async fn list(&self) -> AppResult<Vec<EquipmentItem>> {
        self.repository.equipment.list().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<EquipmentItem> {
        self.repository.equipment.get_by_id(id).await
    }

    pub async fn create(&self, data: CreateEquipment) -> AppResult<EquipmentItem> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        self.repository.equipment.create(&data).await
    }

    pub async fn update(&self, id: Uuid, data: UpdateEquipment) -> AppResult<EquipmentItem> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        self.repository.equipment.update(id, &data).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.equipment.delete(id).await
    }

    /// Maintenance scheduling entry point. The assignee reference, when
    /// given, is resolved through the injected identity resolver; the core
    /// never does name matching itself.
    pub async fn adjust_maintenance(
        &self,
        id: Uuid,
        request: AdjustMaintenance,
    ) -> AppResult<EquipmentItem> {
        let assignee = match request.assignee.as_deref() {
            Some(reference) => {
                let resolved = self.resolver.resolve(reference).await?;
                if resolved.is_none() {
                    return Err(AppError::Validation(format!(
                        "Unknown maintenance assignee: {}",
                        reference
                    )));
                }
                resolved
            }
            None => None,
        };

        let item = self.repository.equipment.adjust_maintenance(id, request.delta).await?;
        tracing::info!(
            equipment = %id,
            delta = request.delta,
            reason = %request.reason,
            assignee = assignee.as_deref().unwrap_or("-"),
            "maintenance adjustment"
        );
        Ok(item)
    }

    /// Generic ledger adjustment for the calibration and disposal workflows
    pub async fn adjust_impact(
        &self,
        id: Uuid,
        category: ImpactCategory,
        delta: i32,
    ) -> AppResult<EquipmentItem> {
        self.repository.equipment.adjust_impact(id, category, delta).await
    }

    /// Administrative borrowable override; quantities untouched
    pub async fn set_borrowable(&self, id: Uuid, allowed: bool) -> AppResult<EquipmentItem> {
        self.repository.equipment.set_borrowable(id, allowed).await
    }
}
