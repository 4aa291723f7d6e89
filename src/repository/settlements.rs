//! Return settlement repository
//!
//! The settlement insert, the reservation state change, and the equipment
//! ledger change are one atomic unit: a single Postgres transaction holds
//! the reservation and equipment row locks, so either all three records
//! commit or none of them do. A half-applied return is not observable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Transaction};
use uuid::Uuid;

use super::equipment::EquipmentRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{
            DamageSeverity, EquipmentCondition, ImpactCategory, MaintenanceNeed, ReservationState,
            SettlementState,
        },
        reservation::BorrowReservation,
        settlement::ReturnSettlement,
    },
};

/// A computed settlement ready to be committed (fees derived by the service)
pub struct NewSettlement {
    pub reservation_id: Uuid,
    pub returned_qty: i32,
    pub condition_after: EquipmentCondition,
    pub damage_severity: DamageSeverity,
    pub is_late: bool,
    pub late_days: i32,
    pub penalty_fee: Decimal,
    pub damage_fee: Decimal,
    pub total_fee: Decimal,
    pub returned_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SettlementsRepository {
    pool: Pool<Postgres>,
}

impl SettlementsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ReturnSettlement> {
        sqlx::query_as::<_, ReturnSettlement>("SELECT * FROM settlements WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Settlement {} not found", id)))
    }

    pub async fn list_for_reservation(
        &self,
        reservation_id: Uuid,
    ) -> AppResult<Vec<ReturnSettlement>> {
        let rows = sqlx::query_as::<_, ReturnSettlement>(
            "SELECT * FROM settlements WHERE reservation_id = $1 ORDER BY submitted_at",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn lock_reservation(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<BorrowReservation> {
        sqlx::query_as::<_, BorrowReservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Submit a return: creates the PendingReview settlement and
    /// optimistically applies the ledger and condition changes, all in one
    /// transaction with the reservation's move to ReturnRequested.
    pub async fn submit(&self, data: NewSettlement) -> AppResult<ReturnSettlement> {
        let mut tx = self.pool.begin().await?;

        let reservation = Self::lock_reservation(&mut tx, data.reservation_id).await?;
        if reservation.state != ReservationState::Released {
            return Err(AppError::InvalidStateTransition(format!(
                "Reservation {} is {}, expected Released",
                reservation.id, reservation.state
            )));
        }
        let outstanding = reservation.outstanding_qty();
        if outstanding == 0 {
            return Err(AppError::AlreadySettled(format!(
                "Reservation {} has no outstanding units",
                reservation.id
            )));
        }
        if data.returned_qty < 1 || data.returned_qty > outstanding {
            return Err(AppError::InvalidQuantity(format!(
                "Returned quantity {} not in 1..={}",
                data.returned_qty, outstanding
            )));
        }

        let item = EquipmentRepository::lock_item(&mut tx, reservation.equipment_id).await?;
        let damaged = data.damage_severity != DamageSeverity::None;
        let borrowed_delta = -data.returned_qty;
        let maintenance_delta = if damaged { data.returned_qty } else { 0 };

        let mut impacts = item.impacts().with_delta(
            ImpactCategory::Borrowed,
            borrowed_delta,
            item.total_quantity,
        )?;
        if maintenance_delta != 0 {
            impacts = impacts.with_delta(
                ImpactCategory::Maintenance,
                maintenance_delta,
                item.total_quantity,
            )?;
        }
        EquipmentRepository::store_impacts(&mut tx, item.id, impacts, item.total_quantity).await?;

        let (condition, maintenance_need) = if damaged {
            (EquipmentCondition::NeedsRepair, MaintenanceNeed::Requested)
        } else {
            (data.condition_after, MaintenanceNeed::None)
        };
        sqlx::query("UPDATE equipment SET condition = $2, maintenance_need = $3 WHERE id = $1")
            .bind(item.id)
            .bind(condition)
            .bind(maintenance_need)
            .execute(&mut *tx)
            .await?;

        let settlement = sqlx::query_as::<_, ReturnSettlement>(
            r#"
            INSERT INTO settlements (
                id, reservation_id, equipment_id, returned_qty,
                condition_before, condition_after, maintenance_need_before,
                damage_severity, is_late, late_days, penalty_fee, damage_fee,
                total_fee, borrowed_delta, maintenance_delta, return_at_before,
                state, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(reservation.id)
        .bind(item.id)
        .bind(data.returned_qty)
        .bind(item.condition)
        .bind(data.condition_after)
        .bind(item.maintenance_need)
        .bind(data.damage_severity)
        .bind(data.is_late)
        .bind(data.late_days)
        .bind(data.penalty_fee)
        .bind(data.damage_fee)
        .bind(data.total_fee)
        .bind(borrowed_delta)
        .bind(maintenance_delta)
        .bind(reservation.actual_return_at)
        .bind(SettlementState::PendingReview)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE reservations
            SET state = $2, actual_return_at = $3, returned_qty = returned_qty + $4
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(ReservationState::ReturnRequested)
        .bind(data.returned_at)
        .bind(data.returned_qty)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(settlement)
    }

    /// Approve a pending settlement: the reservation finalizes to Returned,
    /// or back to Released when units remain outstanding after a partial
    /// return. The review passes through ReturnApproved; the stored state is
    /// the endpoint of that path. The optimistic ledger change from submit
    /// time stands. The settlement completes when the reservation closes,
    /// and stays Approved for an accepted partial return.
    pub async fn approve(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<ReturnSettlement> {
        let mut tx = self.pool.begin().await?;

        let settlement = Self::lock_settlement(&mut tx, id).await?;
        if settlement.state != SettlementState::PendingReview {
            return Err(AppError::InvalidStateTransition(format!(
                "Settlement {} already reviewed",
                id
            )));
        }

        let reservation = Self::lock_reservation(&mut tx, settlement.reservation_id).await?;
        let (final_state, settlement_state) = if reservation.outstanding_qty() == 0 {
            (ReservationState::Returned, SettlementState::Completed)
        } else {
            (ReservationState::Released, SettlementState::Approved)
        };
        Self::check_review_path(
            &reservation,
            ReservationState::ReturnApproved,
            final_state,
        )?;

        sqlx::query("UPDATE reservations SET state = $2 WHERE id = $1")
            .bind(reservation.id)
            .bind(final_state)
            .execute(&mut *tx)
            .await?;

        let settlement = sqlx::query_as::<_, ReturnSettlement>(
            "UPDATE settlements SET state = $2, reviewed_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(settlement_state)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(settlement)
    }

    /// Reject a pending settlement: reapply the exact inverse of the deltas
    /// recorded on the settlement, restore the equipment condition and
    /// maintenance flag it overwrote, and move the reservation back to
    /// Released. All derived from the stored record, never recomputed from
    /// current equipment state.
    pub async fn reject(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<ReturnSettlement> {
        let mut tx = self.pool.begin().await?;

        let settlement = Self::lock_settlement(&mut tx, id).await?;
        if settlement.state != SettlementState::PendingReview {
            return Err(AppError::InvalidStateTransition(format!(
                "Settlement {} already reviewed",
                id
            )));
        }

        let reservation = Self::lock_reservation(&mut tx, settlement.reservation_id).await?;
        Self::check_review_path(
            &reservation,
            ReservationState::ReturnRejected,
            ReservationState::Released,
        )?;

        let item = EquipmentRepository::lock_item(&mut tx, settlement.equipment_id).await?;
        let mut impacts = item.impacts().with_delta(
            ImpactCategory::Borrowed,
            -settlement.borrowed_delta,
            item.total_quantity,
        )?;
        if settlement.maintenance_delta != 0 {
            impacts = impacts.with_delta(
                ImpactCategory::Maintenance,
                -settlement.maintenance_delta,
                item.total_quantity,
            )?;
        }
        EquipmentRepository::store_impacts(&mut tx, item.id, impacts, item.total_quantity).await?;

        sqlx::query("UPDATE equipment SET condition = $2, maintenance_need = $3 WHERE id = $1")
            .bind(item.id)
            .bind(settlement.condition_before)
            .bind(settlement.maintenance_need_before)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE reservations
            SET state = $2, actual_return_at = $3, returned_qty = returned_qty - $4
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(ReservationState::Released)
        .bind(settlement.return_at_before)
        .bind(settlement.returned_qty)
        .execute(&mut *tx)
        .await?;

        let settlement = sqlx::query_as::<_, ReturnSettlement>(
            "UPDATE settlements SET state = $2, reviewed_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(SettlementState::Rejected)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(settlement)
    }

    /// A review decision is two transitions (into the review state, then to
    /// its endpoint) collapsed into one write. Both edges are validated
    /// against the reservation transition table, so a reservation not in
    /// ReturnRequested is rejected here.
    fn check_review_path(
        reservation: &BorrowReservation,
        review_state: ReservationState,
        endpoint: ReservationState,
    ) -> AppResult<()> {
        if !reservation.state.allows(review_state) || !review_state.allows(endpoint) {
            return Err(AppError::InvalidStateTransition(format!(
                "Reservation {} is {}, cannot move through {} to {}",
                reservation.id, reservation.state, review_state, endpoint
            )));
        }
        Ok(())
    }

    async fn lock_settlement(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<ReturnSettlement> {
        sqlx::query_as::<_, ReturnSettlement>("SELECT * FROM settlements WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Settlement {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::BorrowerType;

    fn reservation(state: ReservationState) -> BorrowReservation {
        let now = Utc::now();
        BorrowReservation {
            id: Uuid::new_v4(),
            equipment_id: Uuid::new_v4(),
            borrower_type: BorrowerType::Student,
            borrower_ref: "s-1001".into(),
            borrower_email: None,
            qty: 2,
            purpose: None,
            state,
            requested_at: now,
            intended_start: now,
            intended_end: now + chrono::Duration::days(3),
            approved_at: None,
            released_at: None,
            actual_return_at: None,
            returned_qty: 0,
        }
    }

    #[test]
    fn review_decisions_follow_the_transition_table() {
        let pending = reservation(ReservationState::ReturnRequested);
        for endpoint in [ReservationState::Returned, ReservationState::Released] {
            assert!(SettlementsRepository::check_review_path(
                &pending,
                ReservationState::ReturnApproved,
                endpoint,
            )
            .is_ok());
        }
        assert!(SettlementsRepository::check_review_path(
            &pending,
            ReservationState::ReturnRejected,
            ReservationState::Released,
        )
        .is_ok());
    }

    #[test]
    fn review_requires_a_return_request() {
        let released = reservation(ReservationState::Released);
        let err = SettlementsRepository::check_review_path(
            &released,
            ReservationState::ReturnApproved,
            ReservationState::Returned,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }
}
