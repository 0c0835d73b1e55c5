//! Paying off deferred commissions.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{Engine, PenaltyError, View};
use crate::Amount;
use crate::gateway::PaymentGateway;
use crate::model::{
    AccountId, NewTransaction, Notification, PaymentMethod, Severity, TransactionId,
    TransactionKind, TransactionStatus,
};
use crate::store::{Ledger, Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyReceipt {
    pub transaction: TransactionId,
    pub amount: Amount,
    /// Wallet balance after the payment.
    pub balance: Amount,
}

/// A driver past their penalty deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverduePenalty {
    pub driver: AccountId,
    pub amount: Amount,
    pub deadline: DateTime<Utc>,
}

impl<S: Store, G: PaymentGateway> Engine<S, G> {
    /// Pay the driver's whole pending penalty from their wallet.
    ///
    /// Partial payments are not accepted; the wallet has to cover the full
    /// amount.
    pub async fn pay_penalty(&self, driver: AccountId) -> Result<PenaltyReceipt, PenaltyError> {
        let now = self.now();
        let receipt = self
            .store
            .atomically(|ledger| settle_penalty(ledger, driver, now))
            .await?;

        self.invalidations.publish(View::DriverDashboard(driver));
        Ok(receipt)
    }

    pub async fn overdue_penalties(&self) -> Vec<OverduePenalty> {
        let now = self.now();
        self.store
            .read(|ledger| {
                ledger
                    .accounts()
                    .into_iter()
                    .filter(|account| account.penalty_overdue(now))
                    .filter_map(|account| {
                        Some(OverduePenalty {
                            driver: account.id(),
                            amount: account.pending_penalty(),
                            deadline: account.penalty_deadline()?,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .await
    }
}

fn settle_penalty<L: Ledger>(
    ledger: &mut L,
    driver: AccountId,
    now: DateTime<Utc>,
) -> Result<PenaltyReceipt, PenaltyError> {
    let account = ledger.account(driver)?;
    if !account.is_driver() {
        return Err(StoreError::NotADriver(driver).into());
    }

    let owed = account.pending_penalty();
    if !owed.is_positive() {
        return Err(PenaltyError::NoPendingPenalty(driver));
    }

    let Some(balance) = ledger.debit_if_sufficient(driver, owed)? else {
        let balance = ledger.account(driver)?.balance();
        return Err(PenaltyError::InsufficientBalance(driver, balance, owed));
    };

    ledger.clear_penalty(driver)?;
    let transaction = ledger.append_transaction(
        NewTransaction {
            kind: TransactionKind::PenaltyPayment,
            ride: None,
            rider: None,
            driver: Some(driver),
            amount: owed,
            commission: owed,
            driver_earnings: Amount::ZERO,
            method: PaymentMethod::Wallet,
            status: TransactionStatus::Completed,
            reference: None,
        },
        now,
    );
    ledger.add_platform_commission(owed, Some(transaction))?;
    ledger.post_notification(
        Notification::new(
            driver,
            Severity::Info,
            "Penalty paid",
            format!("Your pending commission of {owed} was paid from your wallet."),
            now,
        )
        .with_metadata(json!({
            "amount": owed.to_string(),
            "balance": balance.to_string(),
        })),
    )?;

    Ok(PenaltyReceipt {
        transaction,
        amount: owed,
        balance,
    })
}
