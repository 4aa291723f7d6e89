//! Equipment item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::{EquipmentCategory, EquipmentCondition, EquipmentStatus, MaintenanceNeed};
use super::ledger::ImpactCounts;

/// Equipment record with its quantity ledger.
///
/// `available_quantity` is derived; it is written only by the repository,
/// always in the same statement as the impact counters it derives from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EquipmentItem {
    pub id: Uuid,
    /// Stable human-facing identifier (asset tag)
    pub asset_tag: String,
    pub name: String,
    pub category: EquipmentCategory,
    pub condition: EquipmentCondition,
    pub status: EquipmentStatus,
    pub maintenance_need: MaintenanceNeed,
    /// Administrative override, independent of quantities
    pub can_be_borrowed: bool,
    pub total_quantity: i32,
    pub maintenance_qty: i32,
    pub calibration_qty: i32,
    pub disposal_qty: i32,
    pub borrowed_qty: i32,
    pub available_quantity: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentItem {
    /// The four impact counters as a ledger value
    pub fn impacts(&self) -> ImpactCounts {
        ImpactCounts::new(
            self.maintenance_qty,
            self.calibration_qty,
            self.disposal_qty,
            self.borrowed_qty,
        )
    }
}

/// Create equipment request (inventory intake)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    pub asset_tag: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category: EquipmentCategory,
    pub condition: Option<EquipmentCondition>,
    #[validate(range(min = 0))]
    pub total_quantity: i32,
    pub can_be_borrowed: Option<bool>,
    pub notes: Option<String>,
}

/// Update equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category: Option<EquipmentCategory>,
    pub condition: Option<EquipmentCondition>,
    pub status: Option<EquipmentStatus>,
    #[validate(range(min = 0))]
    pub total_quantity: Option<i32>,
    pub notes: Option<String>,
}

/// Maintenance adjustment request (maintenance scheduling collaborator)
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustMaintenance {
    /// Signed number of units entering (+) or leaving (-) maintenance
    pub delta: i32,
    pub reason: String,
    /// Free-form reference to the assignee, resolved externally
    pub assignee: Option<String>,
}

/// Borrowable override request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetBorrowable {
    pub allowed: bool,
}
