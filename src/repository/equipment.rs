//! Equipment repository
//!
//! All impact mutations go through a row-locked transaction: read the
//! current counters under `FOR UPDATE`, validate the delta with the ledger
//! math, and write the new counters together with the recomputed available
//! quantity in one statement. Two concurrent writers against the same item
//! serialize on the row lock, so the impact-sum invariant cannot be raced.

use chrono::Utc;
use sqlx::{Pool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{EquipmentCondition, EquipmentStatus, ImpactCategory, MaintenanceNeed},
        equipment::{CreateEquipment, EquipmentItem, UpdateEquipment},
        ledger::ImpactCounts,
    },
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all equipment
    pub async fn list(&self) -> AppResult<Vec<EquipmentItem>> {
        let rows = sqlx::query_as::<_, EquipmentItem>("SELECT * FROM equipment ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<EquipmentItem> {
        sqlx::query_as::<_, EquipmentItem>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Lock an equipment row for the remainder of the transaction
    pub(crate) async fn lock_item(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<EquipmentItem> {
        sqlx::query_as::<_, EquipmentItem>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Persist new impact counters together with the derived available
    /// quantity. Only ever called with counters produced by
    /// [`ImpactCounts::with_delta`] on the locked row.
    pub(crate) async fn store_impacts(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        impacts: ImpactCounts,
        total_quantity: i32,
    ) -> AppResult<EquipmentItem> {
        let row = sqlx::query_as::<_, EquipmentItem>(
            r#"
            UPDATE equipment
            SET maintenance_qty = $2, calibration_qty = $3, disposal_qty = $4,
                borrowed_qty = $5, available_quantity = $6, updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(impacts.maintenance)
        .bind(impacts.calibration)
        .bind(impacts.disposal)
        .bind(impacts.borrowed)
        .bind(impacts.available(total_quantity))
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Apply a signed delta to one impact category as a single atomic
    /// read-modify-write. Fails with `InsufficientCapacity` when the delta
    /// would break the ledger invariant; nothing is written in that case.
    pub async fn adjust_impact(
        &self,
        id: Uuid,
        category: ImpactCategory,
        delta: i32,
    ) -> AppResult<EquipmentItem> {
        let mut tx = self.pool.begin().await?;
        let item = Self::lock_item(&mut tx, id).await?;
        let impacts = item.impacts().with_delta(category, delta, item.total_quantity)?;
        let updated = Self::store_impacts(&mut tx, id, impacts, item.total_quantity).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Maintenance adjustment: ledger delta plus the maintenance-need flag
    /// kept in step with the counter, in one transaction.
    pub async fn adjust_maintenance(&self, id: Uuid, delta: i32) -> AppResult<EquipmentItem> {
        let mut tx = self.pool.begin().await?;
        let item = Self::lock_item(&mut tx, id).await?;
        let impacts =
            item.impacts()
                .with_delta(ImpactCategory::Maintenance, delta, item.total_quantity)?;
        Self::store_impacts(&mut tx, id, impacts, item.total_quantity).await?;
        let need = if impacts.maintenance > 0 {
            MaintenanceNeed::Scheduled
        } else {
            MaintenanceNeed::None
        };
        let updated = sqlx::query_as::<_, EquipmentItem>(
            "UPDATE equipment SET maintenance_need = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(need)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Flip the administrative borrowable flag; quantities untouched
    pub async fn set_borrowable(&self, id: Uuid, allowed: bool) -> AppResult<EquipmentItem> {
        sqlx::query_as::<_, EquipmentItem>(
            "UPDATE equipment SET can_be_borrowed = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(allowed)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Create equipment (inventory intake)
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<EquipmentItem> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, EquipmentItem>(
            r#"
            INSERT INTO equipment (
                id, asset_tag, name, category, condition, status, maintenance_need,
                can_be_borrowed, total_quantity, maintenance_qty, calibration_qty,
                disposal_qty, borrowed_qty, available_quantity, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, 0, 0, 0, $9, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.asset_tag)
        .bind(&data.name)
        .bind(data.category)
        .bind(data.condition.unwrap_or(EquipmentCondition::Good))
        .bind(EquipmentStatus::Active)
        .bind(MaintenanceNeed::None)
        .bind(data.can_be_borrowed.unwrap_or(true))
        .bind(data.total_quantity)
        .bind(&data.notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Asset tag {} already exists", data.asset_tag))
            }
            _ => AppError::Database(e),
        })?;
        Ok(row)
    }

    /// Update equipment. Runs as a locked read-modify-write because a total
    /// quantity change must re-derive the available quantity against the
    /// current impacts.
    pub async fn update(&self, id: Uuid, data: &UpdateEquipment) -> AppResult<EquipmentItem> {
        let mut tx = self.pool.begin().await?;
        let item = Self::lock_item(&mut tx, id).await?;

        let total_quantity = data.total_quantity.unwrap_or(item.total_quantity);
        let impacts = item.impacts();
        if total_quantity < impacts.total() {
            return Err(AppError::InsufficientCapacity(format!(
                "total quantity {} is below outstanding impacts {}",
                total_quantity,
                impacts.total()
            )));
        }

        let row = sqlx::query_as::<_, EquipmentItem>(
            r#"
            UPDATE equipment
            SET name = $2, category = $3, condition = $4, status = $5,
                total_quantity = $6, available_quantity = $7, notes = $8, updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().unwrap_or(&item.name))
        .bind(data.category.unwrap_or(item.category))
        .bind(data.condition.unwrap_or(item.condition))
        .bind(data.status.unwrap_or(item.status))
        .bind(total_quantity)
        .bind(impacts.available(total_quantity))
        .bind(data.notes.clone().or(item.notes.clone()))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Delete equipment. Refused while any units are still out.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let item = self.get_by_id(id).await?;
        if item.borrowed_qty > 0 {
            return Err(AppError::Conflict(format!(
                "Equipment {} has {} borrowed units outstanding",
                id, item.borrowed_qty
            )));
        }
        sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
