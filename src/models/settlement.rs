//! Return settlement model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{DamageSeverity, EquipmentCondition, MaintenanceNeed, SettlementState};

/// Fee and condition record produced when equipment comes back.
///
/// The ledger deltas this settlement applied are stored on the record
/// (`borrowed_delta`, `maintenance_delta`) together with the equipment state
/// it overwrote. Rejection reverses from these stored values, never from a
/// recomputation against current equipment state, so the cancellation is
/// exact no matter what happened to the item in between.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReturnSettlement {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub equipment_id: Uuid,
    pub returned_qty: i32,
    pub condition_before: EquipmentCondition,
    pub condition_after: EquipmentCondition,
    pub maintenance_need_before: MaintenanceNeed,
    pub damage_severity: DamageSeverity,
    pub is_late: bool,
    pub late_days: i32,
    pub penalty_fee: Decimal,
    pub damage_fee: Decimal,
    pub total_fee: Decimal,
    /// Signed delta applied to the borrowed impact at submit time
    pub borrowed_delta: i32,
    /// Signed delta applied to the maintenance impact at submit time
    pub maintenance_delta: i32,
    /// Reservation's actual-return timestamp before this settlement
    pub return_at_before: Option<DateTime<Utc>>,
    pub state: SettlementState,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Submit return request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReturn {
    pub returned_qty: i32,
    pub condition_after: EquipmentCondition,
    pub damage_severity: DamageSeverity,
    /// Defaults to now when omitted
    pub returned_at: Option<DateTime<Utc>>,
}
