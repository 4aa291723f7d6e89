//! Borrow lifecycle service
//!
//! Drives a reservation from submission to hand-over. Approval re-validates
//! the window because time has passed since submission; release commits the
//! borrowed impact inside the repository transaction, which is where a race
//! between two releases is decided.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::availability::{self, AvailabilityService};
use super::notify::{dispatch, NotificationEvent, Notifier};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::ReservationState,
        reservation::{BorrowReservation, CreateReservation, ReservationDetails},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    availability: AvailabilityService,
    notifier: Arc<dyn Notifier>,
}

impl BorrowsService {
    pub fn new(
        repository: Repository,
        availability: AvailabilityService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository,
            availability,
            notifier,
        }
    }

    /// Fetch a reservation; borrowers may only see their own
    pub async fn get(&self, claims: &UserClaims, id: Uuid) -> AppResult<ReservationDetails> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        claims.require_owner(&reservation.borrower_ref)?;
        Ok(ReservationDetails::at(reservation, Utc::now()))
    }

    pub async fn list(&self, state: Option<ReservationState>) -> AppResult<Vec<ReservationDetails>> {
        let now = Utc::now();
        let rows = self.repository.reservations.list(state).await?;
        Ok(rows.into_iter().map(|r| ReservationDetails::at(r, now)).collect())
    }

    pub async fn list_for_borrower(&self, borrower_ref: &str) -> AppResult<Vec<ReservationDetails>> {
        let now = Utc::now();
        let rows = self.repository.reservations.list_for_borrower(borrower_ref).await?;
        Ok(rows.into_iter().map(|r| ReservationDetails::at(r, now)).collect())
    }

    pub async fn list_overdue(&self) -> AppResult<Vec<ReservationDetails>> {
        let now = Utc::now();
        let rows = self.repository.reservations.list_overdue(now).await?;
        Ok(rows.into_iter().map(|r| ReservationDetails::at(r, now)).collect())
    }

    /// Submit a borrow request. Validates the window, checks availability,
    /// and creates a Pending reservation. No ledger mutation happens here.
    pub async fn submit(
        &self,
        claims: &UserClaims,
        request: CreateReservation,
    ) -> AppResult<BorrowReservation> {
        let now = Utc::now();
        availability::validate_window(request.intended_start, request.intended_end, request.qty)?;
        if request.intended_start < now {
            return Err(AppError::Validation(
                "Intended start must not be in the past".to_string(),
            ));
        }

        let item = self.repository.equipment.get_by_id(request.equipment_id).await?;
        if let Some(reason) = availability::borrow_gate(&item) {
            return Err(AppError::NotBorrowable(reason));
        }
        let result = self
            .availability
            .check_window_for_item(&item, request.intended_start, request.intended_end, request.qty)
            .await?;
        if !result.ok {
            return Err(AppError::InsufficientCapacity(
                result.reason.unwrap_or_else(|| "Not available".to_string()),
            ));
        }

        self.repository
            .reservations
            .create(crate::repository::reservations::NewReservation {
                equipment_id: request.equipment_id,
                borrower_type: claims.borrower_type(),
                borrower_ref: claims.sub.clone(),
                borrower_email: claims.email.clone(),
                qty: request.qty,
                purpose: request.purpose,
                intended_start: request.intended_start,
                intended_end: request.intended_end,
            })
            .await
    }

    /// Pending -> Approved. The window is re-checked against the current
    /// reservation book; a stale pending request is not trusted from its
    /// creation-time check. On failure the reservation stays Pending.
    pub async fn approve(&self, id: Uuid) -> AppResult<ReservationDetails> {
        let now = Utc::now();
        let reservation = self.repository.reservations.get_by_id(id).await?;
        if reservation.state != ReservationState::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "Reservation {} is {}, expected Pending",
                id, reservation.state
            )));
        }

        let item = self.repository.equipment.get_by_id(reservation.equipment_id).await?;
        if let Some(reason) = availability::borrow_gate(&item) {
            return Err(AppError::NotBorrowable(reason));
        }
        let result = self
            .availability
            .check_window_for_item(
                &item,
                reservation.intended_start,
                reservation.intended_end,
                reservation.qty,
            )
            .await?;
        if !result.ok {
            return Err(AppError::InsufficientCapacity(
                result.reason.unwrap_or_else(|| "No longer available".to_string()),
            ));
        }

        let updated = self
            .repository
            .reservations
            .transition(id, ReservationState::Pending, ReservationState::Approved, Some(now))
            .await?;

        dispatch(
            self.notifier.clone(),
            NotificationEvent::BorrowApproved {
                reservation_id: updated.id,
                recipient: updated.borrower_email.clone(),
                equipment_name: item.name,
            },
        );
        Ok(ReservationDetails::at(updated, now))
    }

    /// Pending/Approved -> Rejected. Nothing was ever committed against the
    /// ledger in either source state, so no ledger effect. Rejecting an
    /// already-rejected reservation is an `InvalidStateTransition`, never a
    /// second state change.
    pub async fn reject(&self, id: Uuid) -> AppResult<ReservationDetails> {
        let now = Utc::now();
        let reservation = self.repository.reservations.get_by_id(id).await?;
        let from = match reservation.state {
            ReservationState::Pending | ReservationState::Approved => reservation.state,
            other => {
                return Err(AppError::InvalidStateTransition(format!(
                    "Reservation {} is {}, cannot reject",
                    id, other
                )))
            }
        };

        let updated = self
            .repository
            .reservations
            .transition(id, from, ReservationState::Rejected, None)
            .await?;

        let item = self.repository.equipment.get_by_id(updated.equipment_id).await?;
        dispatch(
            self.notifier.clone(),
            NotificationEvent::BorrowRejected {
                reservation_id: updated.id,
                recipient: updated.borrower_email.clone(),
                equipment_name: item.name,
            },
        );
        Ok(ReservationDetails::at(updated, now))
    }

    /// Approved -> Released: physical hand-over. The borrowed impact commits
    /// atomically with the state flip; a concurrent release that got there
    /// first surfaces as `CapacityExceeded` with nothing written.
    pub async fn release(&self, id: Uuid) -> AppResult<ReservationDetails> {
        let now = Utc::now();
        let (reservation, item) = self.repository.reservations.release(id, now).await?;

        dispatch(
            self.notifier.clone(),
            NotificationEvent::EquipmentReleased {
                reservation_id: reservation.id,
                recipient: reservation.borrower_email.clone(),
                equipment_name: item.name,
            },
        );
        Ok(ReservationDetails::at(reservation, now))
    }
}
