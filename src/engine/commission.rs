//! Platform commission on cash rides.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{CommissionError, Engine, View};
use crate::Amount;
use crate::fare::FareSplit;
use crate::gateway::PaymentGateway;
use crate::model::{
    AccountId, NewTransaction, Notification, PaymentMethod, RideId, Severity, TransactionId,
    TransactionKind, TransactionStatus,
};
use crate::store::{Ledger, Store, StoreError};

/// How the commission on a cash ride was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommissionOutcome {
    /// Taken from the driver's wallet.
    Deducted {
        commission: Amount,
        balance: Amount,
        transaction: TransactionId,
    },
    /// Added to the driver's pending penalty.
    Deferred {
        commission: Amount,
        pending: Amount,
        deadline: DateTime<Utc>,
        transaction: TransactionId,
    },
}

impl<S: Store, G: PaymentGateway> Engine<S, G> {
    /// Settle the platform commission for a completed cash ride.
    ///
    /// The driver collected the whole fare in cash, so the platform's cut is
    /// taken from their wallet when the balance covers it. Otherwise it is
    /// added to the driver's pending penalty and the penalty deadline moves to
    /// `penalty_grace` from now.
    pub async fn settle_cash_commission(
        &self,
        driver: AccountId,
        ride: RideId,
        fare: Amount,
    ) -> Result<CommissionOutcome, CommissionError> {
        if fare.is_negative() {
            return Err(CommissionError::InvalidAmount(fare));
        }

        let now = self.now();
        let deadline = now + self.config.penalty_grace;
        let outcome = self
            .store
            .atomically(|ledger| deduct_or_defer(ledger, driver, ride, fare, now, deadline))
            .await?;

        self.invalidations.publish(View::DriverDashboard(driver));
        Ok(outcome)
    }
}

/// Check-and-debit happens in a single conditional update, so two rides
/// settled at once cannot both spend the same balance.
fn deduct_or_defer<L: Ledger>(
    ledger: &mut L,
    driver: AccountId,
    ride: RideId,
    fare: Amount,
    now: DateTime<Utc>,
    deadline: DateTime<Utc>,
) -> Result<CommissionOutcome, CommissionError> {
    if !ledger.account(driver)?.is_driver() {
        return Err(StoreError::NotADriver(driver).into());
    }

    let split = FareSplit::of(fare);
    let commission = split.commission;
    let record = |status: TransactionStatus| NewTransaction {
        kind: TransactionKind::CashCommission,
        ride: Some(ride),
        rider: None,
        driver: Some(driver),
        amount: fare,
        commission,
        driver_earnings: split.driver_earnings,
        method: PaymentMethod::Cash,
        status,
        reference: None,
    };

    if let Some(balance) = ledger.debit_if_sufficient(driver, commission)? {
        let transaction = ledger.append_transaction(record(TransactionStatus::Completed), now);
        ledger.add_platform_commission(commission, Some(transaction))?;
        ledger.post_notification(
            Notification::new(
                driver,
                Severity::Info,
                "Commission deducted",
                format!(
                    "A commission of {commission} for ride {ride} was deducted from your wallet."
                ),
                now,
            )
            .with_metadata(json!({
                "ride": ride,
                "commission": commission.to_string(),
                "balance": balance.to_string(),
            })),
        )?;
        return Ok(CommissionOutcome::Deducted {
            commission,
            balance,
            transaction,
        });
    }

    let pending = ledger.accrue_penalty(driver, commission, deadline)?;
    let transaction = ledger.append_transaction(record(TransactionStatus::Pending), now);
    ledger.post_notification(
        Notification::new(
            driver,
            Severity::Warning,
            "Commission payment required",
            format!(
                "Your wallet could not cover the {commission} commission for ride {ride}. \
                 Pay your pending {pending} before {}.",
                deadline.to_rfc3339()
            ),
            now,
        )
        .with_metadata(json!({
            "ride": ride,
            "commission": commission.to_string(),
            "pending_penalties": pending.to_string(),
            "deadline": deadline.to_rfc3339(),
        })),
    )?;

    Ok(CommissionOutcome::Deferred {
        commission,
        pending,
        deadline,
        transaction,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use std::sync::Arc;

    use super::*;
    use crate::engine::testing::*;

    #[tokio::test]
    async fn deducts_from_wallet_when_balance_covers_commission() {
        let (engine, _) = engine().await;
        fund(&engine, DRIVER, 10.0).await;

        let outcome = engine
            .settle_cash_commission(DRIVER, 8, amount(100.0))
            .await
            .unwrap();

        let CommissionOutcome::Deducted {
            commission,
            balance,
            transaction,
        } = outcome
        else {
            panic!("expected deduction, got {outcome:?}");
        };
        assert_eq!(commission, amount(5.0));
        assert_eq!(balance, amount(5.0));

        let driver = account(&engine, DRIVER).await;
        assert_eq!(driver.balance(), amount(5.0));
        assert_eq!(driver.pending_penalty(), Amount::ZERO);
        assert_eq!(platform_commission(&engine).await, amount(5.0));

        let tx = engine
            .store()
            .read(|ledger| ledger.transaction(transaction).cloned())
            .await
            .unwrap();
        assert_eq!(tx.kind, TransactionKind::CashCommission);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.method, PaymentMethod::Cash);
        assert_eq!(tx.commission + tx.driver_earnings, amount(100.0));

        let dashboard = engine.driver_dashboard(DRIVER).await.unwrap();
        let notification = dashboard.notifications.last().unwrap();
        assert_eq!(notification.severity, Severity::Info);
        assert!(notification.body.contains("5.0000"));
    }

    #[tokio::test]
    async fn balance_exactly_equal_to_commission_is_deducted() {
        let (engine, _) = engine().await;
        fund(&engine, DRIVER, 5.0).await;

        let outcome = engine
            .settle_cash_commission(DRIVER, 8, amount(100.0))
            .await
            .unwrap();
        assert!(matches!(outcome, CommissionOutcome::Deducted { balance, .. } if balance == Amount::ZERO));
    }

    #[tokio::test]
    async fn defers_as_penalty_when_wallet_is_short() {
        let (engine, _) = engine().await;
        fund(&engine, DRIVER, 1.0).await;

        let outcome = engine
            .settle_cash_commission(DRIVER, 9, amount(100.0))
            .await
            .unwrap();

        let expected_deadline = start() + TimeDelta::hours(24);
        assert!(matches!(
            outcome,
            CommissionOutcome::Deferred { commission, pending, deadline, .. }
                if commission == amount(5.0) && pending == amount(5.0) && deadline == expected_deadline
        ));

        let driver = account(&engine, DRIVER).await;
        assert_eq!(driver.balance(), amount(1.0));
        assert_eq!(driver.pending_penalty(), amount(5.0));
        assert_eq!(driver.penalty_deadline(), Some(expected_deadline));
        assert_eq!(platform_commission(&engine).await, Amount::ZERO);

        let dashboard = engine.driver_dashboard(DRIVER).await.unwrap();
        let warning = dashboard.notifications.last().unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        let metadata = warning.metadata.as_ref().unwrap();
        assert_eq!(metadata["deadline"], expected_deadline.to_rfc3339());
        assert_eq!(metadata["pending_penalties"], "5.0000");
    }

    #[tokio::test]
    async fn penalties_accumulate_and_deadline_moves() {
        let (engine, clock) = engine().await;
        engine
            .settle_cash_commission(DRIVER, 1, amount(100.0))
            .await
            .unwrap();
        clock.advance(TimeDelta::hours(2));
        let outcome = engine
            .settle_cash_commission(DRIVER, 2, amount(40.0))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            CommissionOutcome::Deferred { pending, .. } if pending == amount(7.0)
        ));
        let driver = account(&engine, DRIVER).await;
        assert_eq!(
            driver.penalty_deadline(),
            Some(start() + TimeDelta::hours(26))
        );
    }

    #[tokio::test]
    async fn negative_fare_is_rejected() {
        let (engine, _) = engine().await;
        let result = engine
            .settle_cash_commission(DRIVER, 1, amount(-10.0))
            .await;
        assert!(matches!(result, Err(CommissionError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn riders_and_unknown_accounts_are_rejected() {
        let (engine, _) = engine().await;
        assert!(matches!(
            engine.settle_cash_commission(RIDER, 1, amount(10.0)).await,
            Err(CommissionError::Store(StoreError::NotADriver(RIDER)))
        ));
        assert!(matches!(
            engine.settle_cash_commission(77, 1, amount(10.0)).await,
            Err(CommissionError::Store(StoreError::AccountNotFound(77)))
        ));
    }

    #[tokio::test]
    async fn settlement_invalidates_driver_dashboard() {
        let (engine, _) = engine().await;
        let mut views = engine.subscribe();
        engine
            .settle_cash_commission(DRIVER, 1, amount(20.0))
            .await
            .unwrap();
        assert_eq!(views.try_recv().unwrap(), View::DriverDashboard(DRIVER));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_settlements_cannot_overdraw() {
        let (engine, _) = engine().await;
        fund(&engine, DRIVER, 5.0).await;
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..2)
            .map(|ride| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .settle_cash_commission(DRIVER, ride, amount(100.0))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut deducted = 0;
        let mut deferred = 0;
        for handle in handles {
            match handle.await.unwrap() {
                CommissionOutcome::Deducted { .. } => deducted += 1,
                CommissionOutcome::Deferred { .. } => deferred += 1,
            }
        }
        assert_eq!((deducted, deferred), (1, 1));

        let driver = account(&engine, DRIVER).await;
        assert_eq!(driver.balance(), Amount::ZERO);
        assert_eq!(driver.pending_penalty(), amount(5.0));
    }
}
