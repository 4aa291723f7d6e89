//! Return and fee settlement service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::notify::{dispatch, NotificationEvent, Notifier};
use crate::{
    config::FeeConfig,
    error::{AppError, AppResult},
    models::{
        enums::DamageSeverity,
        settlement::{ReturnSettlement, SubmitReturn},
        user::UserClaims,
    },
    repository::{settlements::NewSettlement, Repository},
};

/// Whole days late, rounded up: any started day past the intended end
/// counts in full.
pub fn late_days(intended_end: DateTime<Utc>, actual_return: DateTime<Utc>) -> i32 {
    let overdue_secs = (actual_return - intended_end).num_seconds();
    if overdue_secs <= 0 {
        return 0;
    }
    (overdue_secs as u64).div_ceil(86_400) as i32
}

/// Damage fee from the configured severity table
pub fn damage_fee(fees: &FeeConfig, severity: DamageSeverity) -> Decimal {
    match severity {
        DamageSeverity::None => Decimal::ZERO,
        DamageSeverity::Minor => fees.damage_minor,
        DamageSeverity::Moderate => fees.damage_moderate,
        DamageSeverity::Severe => fees.damage_severe,
    }
}

#[derive(Clone)]
pub struct ReturnsService {
    repository: Repository,
    fees: FeeConfig,
    notifier: Arc<dyn Notifier>,
}

impl ReturnsService {
    pub fn new(repository: Repository, fees: FeeConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            fees,
            notifier,
        }
    }

    /// Fetch a settlement; borrowers may only see their own
    pub async fn get(&self, claims: &UserClaims, id: Uuid) -> AppResult<ReturnSettlement> {
        let settlement = self.repository.settlements.get_by_id(id).await?;
        let reservation = self
            .repository
            .reservations
            .get_by_id(settlement.reservation_id)
            .await?;
        claims.require_owner(&reservation.borrower_ref)?;
        Ok(settlement)
    }

    pub async fn list_for_reservation(&self, reservation_id: Uuid) -> AppResult<Vec<ReturnSettlement>> {
        self.repository.settlements.list_for_reservation(reservation_id).await
    }

    /// Submit a return for review. Only the borrower (or an admin) may
    /// return a reservation. Fees are computed here from the reservation's
    /// intended end; the quantity and state checks done here are advisory
    /// and re-validated inside the settlement transaction.
    pub async fn submit(
        &self,
        claims: &UserClaims,
        reservation_id: Uuid,
        request: SubmitReturn,
    ) -> AppResult<ReturnSettlement> {
        if request.returned_qty < 1 {
            return Err(AppError::Validation(format!(
                "Returned quantity must be at least 1, got {}",
                request.returned_qty
            )));
        }
        let reservation = self.repository.reservations.get_by_id(reservation_id).await?;
        claims.require_owner(&reservation.borrower_ref)?;

        let returned_at = request.returned_at.unwrap_or_else(Utc::now);
        let days = late_days(reservation.intended_end, returned_at);
        let penalty = Decimal::from(days) * self.fees.daily_late_rate;
        let damage = damage_fee(&self.fees, request.damage_severity);

        let settlement = self
            .repository
            .settlements
            .submit(NewSettlement {
                reservation_id,
                returned_qty: request.returned_qty,
                condition_after: request.condition_after,
                damage_severity: request.damage_severity,
                is_late: days > 0,
                late_days: days,
                penalty_fee: penalty,
                damage_fee: damage,
                total_fee: penalty + damage,
                returned_at,
            })
            .await?;
        Ok(settlement)
    }

    /// Accept a pending settlement; the optimistic ledger change stands and
    /// the reservation finalizes.
    pub async fn approve(&self, id: Uuid) -> AppResult<ReturnSettlement> {
        let now = Utc::now();
        let settlement = self.repository.settlements.approve(id, now).await?;
        self.notify_decision(&settlement, true).await;
        Ok(settlement)
    }

    /// Reject a pending settlement; the exact inverse of the stored deltas
    /// is reapplied and the reservation reverts to Released.
    pub async fn reject(&self, id: Uuid) -> AppResult<ReturnSettlement> {
        let now = Utc::now();
        let settlement = self.repository.settlements.reject(id, now).await?;
        self.notify_decision(&settlement, false).await;
        Ok(settlement)
    }

    async fn notify_decision(&self, settlement: &ReturnSettlement, accepted: bool) {
        let recipient = match self
            .repository
            .reservations
            .get_by_id(settlement.reservation_id)
            .await
        {
            Ok(reservation) => reservation.borrower_email,
            Err(e) => {
                tracing::warn!("Could not load reservation for notification: {}", e);
                None
            }
        };
        dispatch(
            self.notifier.clone(),
            NotificationEvent::ReturnDecided {
                reservation_id: settlement.reservation_id,
                recipient,
                accepted,
                total_fee: settlement.total_fee,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn on_time_return_has_no_late_days() {
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 17, 0, 0).unwrap();
        assert_eq!(late_days(end, end), 0);
        assert_eq!(late_days(end, end - chrono::Duration::days(2)), 0);
    }

    #[test]
    fn partial_days_round_up() {
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 17, 0, 0).unwrap();
        assert_eq!(late_days(end, end + chrono::Duration::hours(1)), 1);
        assert_eq!(late_days(end, end + chrono::Duration::hours(24)), 1);
        assert_eq!(late_days(end, end + chrono::Duration::hours(25)), 2);
        assert_eq!(late_days(end, end + chrono::Duration::days(3)), 3);
    }

    #[test]
    fn damage_fees_follow_severity_table() {
        let fees = FeeConfig::default();
        assert_eq!(damage_fee(&fees, DamageSeverity::None), Decimal::ZERO);
        assert_eq!(damage_fee(&fees, DamageSeverity::Minor), dec!(15.00));
        assert_eq!(damage_fee(&fees, DamageSeverity::Moderate), dec!(40.00));
        assert_eq!(damage_fee(&fees, DamageSeverity::Severe), dec!(100.00));
        // strictly increasing
        assert!(fees.damage_minor < fees.damage_moderate);
        assert!(fees.damage_moderate < fees.damage_severe);
    }

    #[test]
    fn penalty_is_days_times_daily_rate() {
        let fees = FeeConfig::default();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 17, 0, 0).unwrap();
        let days = late_days(end, end + chrono::Duration::days(4));
        let penalty = Decimal::from(days) * fees.daily_late_rate;
        assert_eq!(penalty, dec!(20.00));
    }
}
