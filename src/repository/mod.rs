//! Repository layer for database operations

pub mod equipment;
pub mod reservations;
pub mod settlements;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub equipment: equipment::EquipmentRepository,
    pub reservations: reservations::ReservationsRepository,
    pub settlements: settlements::SettlementsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            settlements: settlements::SettlementsRepository::new(pool.clone()),
            pool,
        }
    }
}
