//! Borrow reservation repository

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::equipment::EquipmentRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{BorrowerType, ImpactCategory, ReservationState},
        equipment::EquipmentItem,
        reservation::BorrowReservation,
    },
};

/// Fields for a new reservation row (validated at the service boundary)
pub struct NewReservation {
    pub equipment_id: Uuid,
    pub borrower_type: BorrowerType,
    pub borrower_ref: String,
    pub borrower_email: Option<String>,
    pub qty: i32,
    pub purpose: Option<String>,
    pub intended_start: DateTime<Utc>,
    pub intended_end: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BorrowReservation> {
        sqlx::query_as::<_, BorrowReservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    /// List reservations, optionally filtered by state
    pub async fn list(&self, state: Option<ReservationState>) -> AppResult<Vec<BorrowReservation>> {
        let rows = match state {
            Some(state) => {
                sqlx::query_as::<_, BorrowReservation>(
                    "SELECT * FROM reservations WHERE state = $1 ORDER BY requested_at DESC",
                )
                .bind(state)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, BorrowReservation>(
                    "SELECT * FROM reservations ORDER BY requested_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Active reservations of one borrower
    pub async fn list_for_borrower(&self, borrower_ref: &str) -> AppResult<Vec<BorrowReservation>> {
        let rows = sqlx::query_as::<_, BorrowReservation>(
            "SELECT * FROM reservations WHERE borrower_ref = $1 ORDER BY requested_at DESC",
        )
        .bind(borrower_ref)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Released reservations past their intended end (derived overdue view)
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<BorrowReservation>> {
        let rows = sqlx::query_as::<_, BorrowReservation>(
            "SELECT * FROM reservations WHERE state = $1 AND intended_end < $2 ORDER BY intended_end",
        )
        .bind(ReservationState::Released)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Outstanding quantity held by window-holding reservations of this item
    /// whose window overlaps `[start, end)`. The state list comes from
    /// [`ReservationState::window_holding`], and each reservation counts at
    /// `qty - returned_qty` so units already handed back (pending review or
    /// partially settled) stop holding the window. Half-open semantics: a
    /// reservation ending exactly at `start` does not overlap. Served by the
    /// `(equipment_id, state)` index; never scans other items.
    pub async fn overlapping_committed_qty(
        &self,
        equipment_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<i64> {
        let held: Vec<i16> = ReservationState::window_holding()
            .into_iter()
            .map(|s| s as i16)
            .collect();
        let qty: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(qty - returned_qty), 0)::bigint
            FROM reservations
            WHERE equipment_id = $1
              AND state = ANY($2)
              AND intended_start < $4
              AND intended_end > $3
            "#,
        )
        .bind(equipment_id)
        .bind(&held)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(qty)
    }

    pub async fn create(&self, data: NewReservation) -> AppResult<BorrowReservation> {
        let row = sqlx::query_as::<_, BorrowReservation>(
            r#"
            INSERT INTO reservations (
                id, equipment_id, borrower_type, borrower_ref, borrower_email,
                qty, purpose, state, requested_at, intended_start, intended_end, returned_qty
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.equipment_id)
        .bind(data.borrower_type)
        .bind(&data.borrower_ref)
        .bind(&data.borrower_email)
        .bind(data.qty)
        .bind(&data.purpose)
        .bind(ReservationState::Pending)
        .bind(Utc::now())
        .bind(data.intended_start)
        .bind(data.intended_end)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Guarded state flip: succeeds only when the row is still in `from`.
    /// The `state = from` predicate makes concurrent transitions race safely;
    /// the loser sees zero rows and gets `InvalidStateTransition`.
    pub async fn transition(
        &self,
        id: Uuid,
        from: ReservationState,
        to: ReservationState,
        approved_at: Option<DateTime<Utc>>,
    ) -> AppResult<BorrowReservation> {
        if !from.allows(to) {
            return Err(AppError::InvalidStateTransition(format!(
                "Reservation cannot move from {} to {}",
                from, to
            )));
        }
        let row = sqlx::query_as::<_, BorrowReservation>(
            r#"
            UPDATE reservations
            SET state = $3, approved_at = COALESCE($4, approved_at)
            WHERE id = $1 AND state = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(approved_at)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(r) => Ok(r),
            None => {
                let current = self.get_by_id(id).await?;
                Err(AppError::InvalidStateTransition(format!(
                    "Reservation {} is {}, expected {}",
                    id, current.state, from
                )))
            }
        }
    }

    /// Approved -> Released with the borrowed-impact commit, in one
    /// transaction. The equipment row lock is taken first, so two releases
    /// against the same item serialize and the second sees the updated
    /// ledger; if the capacity is gone it fails with `CapacityExceeded` and
    /// nothing commits.
    pub async fn release(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<(BorrowReservation, EquipmentItem)> {
        let mut tx = self.pool.begin().await?;

        let reservation = sqlx::query_as::<_, BorrowReservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))?;

        if reservation.state != ReservationState::Approved {
            return Err(AppError::InvalidStateTransition(format!(
                "Reservation {} is {}, expected Approved",
                id, reservation.state
            )));
        }

        let item = EquipmentRepository::lock_item(&mut tx, reservation.equipment_id).await?;
        let impacts = item
            .impacts()
            .with_delta(ImpactCategory::Borrowed, reservation.qty, item.total_quantity)
            .map_err(|e| match e {
                AppError::InsufficientCapacity(msg) => AppError::CapacityExceeded(msg),
                other => other,
            })?;
        let item =
            EquipmentRepository::store_impacts(&mut tx, item.id, impacts, item.total_quantity)
                .await?;

        let reservation = sqlx::query_as::<_, BorrowReservation>(
            "UPDATE reservations SET state = $2, released_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(ReservationState::Released)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((reservation, item))
    }
}
