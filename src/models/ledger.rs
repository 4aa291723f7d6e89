//! Per-item quantity ledger arithmetic
//!
//! All impact accounting flows through [`ImpactCounts::with_delta`]; no call
//! site touches a counter directly. The repository wraps these checks in a
//! row-locked transaction so the invariant (impacts non-negative, sum never
//! above total) holds under concurrent writers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::enums::ImpactCategory;
use crate::error::{AppError, AppResult};

/// The four impact counters withheld from availability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImpactCounts {
    pub maintenance: i32,
    pub calibration: i32,
    pub disposal: i32,
    pub borrowed: i32,
}

impl ImpactCounts {
    pub fn new(maintenance: i32, calibration: i32, disposal: i32, borrowed: i32) -> Self {
        Self {
            maintenance,
            calibration,
            disposal,
            borrowed,
        }
    }

    /// Sum of all withheld quantities
    pub fn total(&self) -> i32 {
        self.maintenance + self.calibration + self.disposal + self.borrowed
    }

    pub fn get(&self, category: ImpactCategory) -> i32 {
        match category {
            ImpactCategory::Maintenance => self.maintenance,
            ImpactCategory::Calibration => self.calibration,
            ImpactCategory::Disposal => self.disposal,
            ImpactCategory::Borrowed => self.borrowed,
        }
    }

    /// Units left after subtracting every impact from the item total
    pub fn available(&self, total_quantity: i32) -> i32 {
        (total_quantity - self.total()).max(0)
    }

    /// Apply a signed delta to one category, validating that no counter goes
    /// negative and that the impact sum stays within `total_quantity`.
    /// Returns the new counters; the caller persists them together with the
    /// recomputed available quantity in the same write.
    pub fn with_delta(
        &self,
        category: ImpactCategory,
        delta: i32,
        total_quantity: i32,
    ) -> AppResult<ImpactCounts> {
        let mut next = *self;
        let counter = match category {
            ImpactCategory::Maintenance => &mut next.maintenance,
            ImpactCategory::Calibration => &mut next.calibration,
            ImpactCategory::Disposal => &mut next.disposal,
            ImpactCategory::Borrowed => &mut next.borrowed,
        };
        let updated = *counter + delta;
        if updated < 0 {
            return Err(AppError::InsufficientCapacity(format!(
                "{} impact would become negative ({} {:+})",
                category, *counter, delta
            )));
        }
        *counter = updated;
        if next.total() > total_quantity {
            return Err(AppError::InsufficientCapacity(format!(
                "impacts ({}) would exceed total quantity ({})",
                next.total(),
                total_quantity
            )));
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_total_minus_impacts() {
        let impacts = ImpactCounts::new(1, 0, 1, 3);
        assert_eq!(impacts.total(), 5);
        assert_eq!(impacts.available(10), 5);
        assert_eq!(impacts.available(5), 0);
    }

    #[test]
    fn available_clamps_at_zero() {
        // total shrank below the outstanding impacts (disposal while borrowed)
        let impacts = ImpactCounts::new(0, 0, 0, 4);
        assert_eq!(impacts.available(3), 0);
    }

    #[test]
    fn positive_delta_within_capacity() {
        let impacts = ImpactCounts::default();
        let next = impacts
            .with_delta(ImpactCategory::Borrowed, 3, 10)
            .unwrap();
        assert_eq!(next.borrowed, 3);
        assert_eq!(next.available(10), 7);
    }

    #[test]
    fn delta_past_total_is_rejected() {
        let impacts = ImpactCounts::new(2, 0, 0, 7);
        let err = impacts
            .with_delta(ImpactCategory::Borrowed, 2, 10)
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientCapacity(_)));
    }

    #[test]
    fn negative_counter_is_rejected() {
        let impacts = ImpactCounts::new(0, 0, 0, 1);
        let err = impacts
            .with_delta(ImpactCategory::Borrowed, -2, 10)
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientCapacity(_)));
        // original counters untouched
        assert_eq!(impacts.borrowed, 1);
    }

    #[test]
    fn invariant_holds_under_delta_sequences() {
        let total = 6;
        let mut impacts = ImpactCounts::default();
        let steps = [
            (ImpactCategory::Borrowed, 4),
            (ImpactCategory::Maintenance, 2),
            (ImpactCategory::Borrowed, 1),    // rejected, 7 > 6
            (ImpactCategory::Borrowed, -3),
            (ImpactCategory::Calibration, 2),
            (ImpactCategory::Disposal, 2),    // rejected, 7 > 6
            (ImpactCategory::Maintenance, -2),
        ];
        for (category, delta) in steps {
            if let Ok(next) = impacts.with_delta(category, delta, total) {
                impacts = next;
            }
            assert!(impacts.total() <= total);
            assert!(impacts.maintenance >= 0);
            assert!(impacts.calibration >= 0);
            assert!(impacts.disposal >= 0);
            assert!(impacts.borrowed >= 0);
            assert_eq!(impacts.available(total), total - impacts.total());
        }
        assert_eq!(impacts, ImpactCounts::new(0, 2, 0, 1));
    }

    #[test]
    fn exact_reversal_restores_counters() {
        let total = 10;
        let start = ImpactCounts::new(0, 0, 0, 5);
        // severe-damage return of 3 units
        let after = start
            .with_delta(ImpactCategory::Borrowed, -3, total)
            .unwrap()
            .with_delta(ImpactCategory::Maintenance, 3, total)
            .unwrap();
        assert_eq!(after, ImpactCounts::new(3, 0, 0, 2));
        // rejection applies the stored inverse deltas
        let reversed = after
            .with_delta(ImpactCategory::Borrowed, 3, total)
            .unwrap()
            .with_delta(ImpactCategory::Maintenance, -3, total)
            .unwrap();
        assert_eq!(reversed, start);
    }
}
