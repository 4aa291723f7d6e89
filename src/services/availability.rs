//! Availability calculator
//!
//! Read-only. Answers "how many units can go out right now" and "can `qty`
//! units go out over `[start, end)`". Results are advisory: the release
//! transaction re-validates against the ledger at commit time, which is the
//! authority under concurrency.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{EquipmentStatus, MaintenanceNeed},
        equipment::EquipmentItem,
    },
    repository::Repository,
};

/// Outcome of a window availability check
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailabilityResult {
    pub ok: bool,
    /// Units still free over the requested window
    pub remaining: i32,
    pub reason: Option<String>,
}

/// The administrative flag, condition, maintenance flag and status gates,
/// independent of quantities. `None` when the item may lend; otherwise the
/// blocking reason.
pub fn borrow_gate(item: &EquipmentItem) -> Option<String> {
    if !item.can_be_borrowed {
        Some("Borrowing disabled for this equipment".to_string())
    } else if !item.condition.is_lendable() {
        Some(format!("Condition is {}", item.condition))
    } else if item.maintenance_need != MaintenanceNeed::None {
        Some("Maintenance pending".to_string())
    } else if item.status != EquipmentStatus::Active {
        Some(format!("Status is {:?}", item.status))
    } else {
        None
    }
}

/// Units borrowable right now. Zero whenever a gate blocks the item,
/// regardless of quantities; otherwise the derived available quantity.
pub fn instant_borrowable(item: &EquipmentItem) -> i32 {
    if borrow_gate(item).is_some() {
        return 0;
    }
    item.available_quantity
}

/// Capacity base for a window check: total minus the non-borrow impacts.
/// Borrowed units are accounted by the overlap query through their
/// reservation windows; subtracting `borrowed_qty` here as well would count
/// them twice and wrongly block a window abutting an existing loan.
pub fn window_base(item: &EquipmentItem) -> i32 {
    if borrow_gate(item).is_some() {
        return 0;
    }
    (item.total_quantity - item.maintenance_qty - item.calibration_qty - item.disposal_qty).max(0)
}

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start, b_end)`.
/// Mirrors the SQL predicate used by the reservation overlap query; an
/// interval ending exactly where the other begins does not overlap.
pub fn windows_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Validate a requested borrow window before it reaches the calculator
pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>, qty: i32) -> AppResult<()> {
    if qty < 1 {
        return Err(AppError::Validation(format!(
            "Quantity must be at least 1, got {}",
            qty
        )));
    }
    if start >= end {
        return Err(AppError::Validation(
            "Interval start must be before its end".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AvailabilityService {
    repository: Repository,
}

impl AvailabilityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Can `qty` units be borrowed over `[start, end)`?
    ///
    /// Short-circuits when the window base is zero; otherwise subtracts
    /// every Approved/Released reservation of this item overlapping the
    /// window. Mutates nothing.
    pub async fn check_window(
        &self,
        equipment_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        qty: i32,
    ) -> AppResult<AvailabilityResult> {
        validate_window(start, end, qty)?;
        let item = self.repository.equipment.get_by_id(equipment_id).await?;
        self.check_window_for_item(&item, start, end, qty).await
    }

    /// Same check against an already-loaded item (used by the borrow state
    /// machine, which re-validates at approval time).
    pub async fn check_window_for_item(
        &self,
        item: &EquipmentItem,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        qty: i32,
    ) -> AppResult<AvailabilityResult> {
        if let Some(reason) = borrow_gate(item) {
            return Ok(AvailabilityResult {
                ok: false,
                remaining: 0,
                reason: Some(reason),
            });
        }
        let base = window_base(item);
        if base == 0 {
            return Ok(AvailabilityResult {
                ok: false,
                remaining: 0,
                reason: Some("No units available".to_string()),
            });
        }

        let reserved = self
            .repository
            .reservations
            .overlapping_committed_qty(item.id, start, end)
            .await?;
        let remaining = base - reserved as i32;
        let ok = remaining >= qty;
        Ok(AvailabilityResult {
            ok,
            remaining,
            reason: if ok {
                None
            } else {
                Some(format!(
                    "Only {} of {} requested units free over the window",
                    remaining.max(0),
                    qty
                ))
            },
        })
    }
}
