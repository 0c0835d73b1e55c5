//! Platform commission split for ride fares.
//!
//! The platform keeps a flat 5% of every fare and the driver keeps the rest.
//! Commission is computed in basis points on the scaled integer amount and
//! earnings are taken as the remainder, so the two parts always add back up
//! to the fare exactly.

use crate::Amount;

/// Platform commission in basis points (5%).
pub const COMMISSION_BPS: i64 = 500;

/// A fare divided between the platform and the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FareSplit {
    pub commission: Amount,
    pub driver_earnings: Amount,
}

impl FareSplit {
    pub fn of(fare: Amount) -> Self {
        let commission = fare.basis_points(COMMISSION_BPS);
        Self {
            commission,
            driver_earnings: fare - commission,
        }
    }

    pub fn total(&self) -> Amount {
        self.commission + self.driver_earnings
    }
}
