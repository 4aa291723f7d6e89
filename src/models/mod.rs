//! Domain models

pub mod enums;
pub mod equipment;
pub mod ledger;
pub mod reservation;
pub mod settlement;
pub mod user;
