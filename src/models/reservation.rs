//! Borrow reservation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{BorrowerType, ReservationState};

/// A request to borrow `qty` units of one equipment item over
/// `[intended_start, intended_end)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowReservation {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub borrower_type: BorrowerType,
    /// Identity reference supplied by the identity provider
    pub borrower_ref: String,
    pub borrower_email: Option<String>,
    pub qty: i32,
    pub purpose: Option<String>,
    pub state: ReservationState,
    pub requested_at: DateTime<Utc>,
    pub intended_start: DateTime<Utc>,
    pub intended_end: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub actual_return_at: Option<DateTime<Utc>>,
    /// Cumulative units already handed back across settlements
    pub returned_qty: i32,
}

impl BorrowReservation {
    /// Units still out with the borrower
    pub fn outstanding_qty(&self) -> i32 {
        self.qty - self.returned_qty
    }

    /// Overdue is derived at read time, never stored.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.state == ReservationState::Released && now > self.intended_end
    }

    /// State as presented to callers, with the derived overdue marker
    pub fn effective_state(&self, now: DateTime<Utc>) -> ReservationState {
        if self.is_overdue(now) {
            ReservationState::Overdue
        } else {
            self.state
        }
    }
}

/// Submit borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub equipment_id: Uuid,
    pub qty: i32,
    pub intended_start: DateTime<Utc>,
    pub intended_end: DateTime<Utc>,
    pub purpose: Option<String>,
}

/// Reservation as returned by the API, with the derived state
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: BorrowReservation,
    pub effective_state: ReservationState,
    pub is_overdue: bool,
}

impl ReservationDetails {
    pub fn at(reservation: BorrowReservation, now: DateTime<Utc>) -> Self {
        let effective_state = reservation.effective_state(now);
        let is_overdue = reservation.is_overdue(now);
        Self {
            reservation,
            effective_state,
            is_overdue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reservation(state: ReservationState) -> BorrowReservation {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        BorrowReservation {
            id: Uuid::new_v4(),
            equipment_id: Uuid::new_v4(),
            borrower_type: BorrowerType::Student,
            borrower_ref: "s-1001".into(),
            borrower_email: None,
            qty: 3,
            purpose: None,
            state,
            requested_at: start,
            intended_start: start,
            intended_end: Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
            approved_at: None,
            released_at: None,
            actual_return_at: None,
            returned_qty: 0,
        }
    }

    #[test]
    fn overdue_only_after_intended_end_and_only_when_released() {
        let r = reservation(ReservationState::Released);
        let before = Utc.with_ymd_and_hms(2026, 1, 4, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 0).unwrap();
        assert!(!r.is_overdue(before));
        assert!(r.is_overdue(after));
        assert_eq!(r.effective_state(after), ReservationState::Overdue);

        let pending = reservation(ReservationState::Pending);
        assert!(!pending.is_overdue(after));
        assert_eq!(pending.effective_state(after), ReservationState::Pending);
    }

    #[test]
    fn outstanding_tracks_partial_returns() {
        let mut r = reservation(ReservationState::Released);
        assert_eq!(r.outstanding_qty(), 3);
        r.returned_qty = 2;
        assert_eq!(r.outstanding_qty(), 1);
    }
}
