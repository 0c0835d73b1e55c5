use chrono::{DateTime, Utc};

use crate::Amount;
use crate::model::{AccountId, Role};

/// A rider or driver profile with its wallet and settlement counters.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    role: Role,
    balance: Amount,
    /// Lifetime driver earnings from QR rides.
    earnings: Amount,
    pending_penalty: Amount,
    penalty_deadline: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(id: AccountId, role: Role) -> Self {
        Self {
            id,
            role,
            balance: Amount::ZERO,
            earnings: Amount::ZERO,
            pending_penalty: Amount::ZERO,
            penalty_deadline: None,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn earnings(&self) -> Amount {
        self.earnings
    }

    pub fn pending_penalty(&self) -> Amount {
        self.pending_penalty
    }

    pub fn penalty_deadline(&self) -> Option<DateTime<Utc>> {
        self.penalty_deadline
    }

    /// An outstanding penalty whose deadline has passed.
    pub fn penalty_overdue(&self, now: DateTime<Utc>) -> bool {
        self.pending_penalty.is_positive() && self.penalty_deadline.is_some_and(|d| d <= now)
    }

    /// Apply a signed delta. `None` on overflow, leaving the balance as is.
    pub(crate) fn adjust(&mut self, delta: Amount) -> Option<Amount> {
        self.balance = self.balance.checked_add(delta)?;
        Some(self.balance)
    }

    pub(crate) fn add_earnings(&mut self, amount: Amount) -> Option<Amount> {
        self.earnings = self.earnings.checked_add(amount)?;
        Some(self.earnings)
    }

    pub(crate) fn add_penalty(
        &mut self,
        amount: Amount,
        deadline: DateTime<Utc>,
    ) -> Option<Amount> {
        self.pending_penalty = self.pending_penalty.checked_add(amount)?;
        self.penalty_deadline = Some(deadline);
        Some(self.pending_penalty)
    }

    pub(crate) fn clear_penalty(&mut self) -> Amount {
        let cleared = self.pending_penalty;
        self.pending_penalty = Amount::ZERO;
        self.penalty_deadline = None;
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn new_account_is_empty() {
        let account = Account::new(7, Role::Driver);
        assert_eq!(account.id(), 7);
        assert!(account.is_driver());
        assert_eq!(account.balance(), Amount::ZERO);
        assert_eq!(account.earnings(), Amount::ZERO);
        assert_eq!(account.pending_penalty(), Amount::ZERO);
        assert!(account.penalty_deadline().is_none());
    }

    #[test]
    fn penalties_accumulate_and_clear() {
        let now = Utc::now();
        let mut account = Account::new(1, Role::Driver);
        account.add_penalty(Amount::from_scaled(50_000), now);
        let total = account.add_penalty(Amount::from_scaled(20_000), now + TimeDelta::hours(1));
        assert_eq!(total, Some(Amount::from_scaled(70_000)));
        assert_eq!(account.penalty_deadline(), Some(now + TimeDelta::hours(1)));

        assert_eq!(account.clear_penalty(), Amount::from_scaled(70_000));
        assert_eq!(account.pending_penalty(), Amount::ZERO);
        assert!(account.penalty_deadline().is_none());
    }

    #[test]
    fn overdue_requires_outstanding_amount() {
        let now = Utc::now();
        let mut account = Account::new(1, Role::Driver);
        assert!(!account.penalty_overdue(now));

        account.add_penalty(Amount::from_scaled(1), now - TimeDelta::minutes(1));
        assert!(account.penalty_overdue(now));
        assert!(!account.penalty_overdue(now - TimeDelta::hours(1)));
    }

    #[test]
    fn overflowing_counters_are_left_untouched() {
        let now = Utc::now();
        let near_max = Amount::from_scaled(i64::MAX - 1);
        let mut account = Account::new(1, Role::Driver);
        account.adjust(near_max);
        account.add_earnings(near_max);
        account.add_penalty(near_max, now);

        assert_eq!(account.adjust(Amount::from_scaled(2)), None);
        assert_eq!(account.add_earnings(Amount::from_scaled(2)), None);
        assert_eq!(
            account.add_penalty(Amount::from_scaled(2), now + TimeDelta::hours(1)),
            None
        );
        assert_eq!(account.balance(), near_max);
        assert_eq!(account.earnings(), near_max);
        assert_eq!(account.pending_penalty(), near_max);
        assert_eq!(account.penalty_deadline(), Some(now));
    }
}
