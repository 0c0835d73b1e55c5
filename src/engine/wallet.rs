//! Wallet top-ups.

use super::{Engine, TopUpError, View};
use crate::Amount;
use crate::gateway::PaymentGateway;
use crate::model::{
    AccountId, NewTransaction, PaymentMethod, Role, TransactionId, TransactionKind,
    TransactionStatus,
};
use crate::store::{Ledger, Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUpReceipt {
    pub transaction: TransactionId,
    pub balance: Amount,
    /// Gateway capture reference.
    pub reference: String,
}

impl<S: Store, G: PaymentGateway> Engine<S, G> {
    /// Capture `amount` through the payment gateway and credit it to the wallet.
    pub async fn top_up_wallet(
        &self,
        account: AccountId,
        amount: Amount,
        method: PaymentMethod,
    ) -> Result<TopUpReceipt, TopUpError> {
        if !amount.is_positive() {
            return Err(TopUpError::InvalidAmount(amount));
        }
        if method == PaymentMethod::Wallet {
            return Err(TopUpError::UnsupportedMethod(method));
        }

        // don't capture money for an account we can't credit
        self.store
            .read(|ledger| -> Result<(), StoreError> {
                ledger
                    .account(account)?
                    .balance()
                    .checked_add(amount)
                    .map(|_| ())
                    .ok_or(StoreError::Overflow(account))
            })
            .await?;

        let capture = self.gateway.capture(account, amount, method).await?;
        let now = self.now();
        let reference = capture.reference.clone();

        let (transaction, balance, role) = self
            .store
            .atomically(move |ledger| -> Result<_, TopUpError> {
                let role = ledger.account(account)?.role();
                let balance = ledger.adjust_balance(account, amount)?;
                let (rider, driver) = match role {
                    Role::Rider => (Some(account), None),
                    Role::Driver => (None, Some(account)),
                };
                let transaction = ledger.append_transaction(
                    NewTransaction {
                        kind: TransactionKind::WalletTopUp,
                        ride: None,
                        rider,
                        driver,
                        amount,
                        commission: Amount::ZERO,
                        driver_earnings: Amount::ZERO,
                        method,
                        status: TransactionStatus::Completed,
                        reference: Some(reference),
                    },
                    now,
                );
                Ok((transaction, balance, role))
            })
            .await?;

        self.invalidations.publish(match role {
            Role::Rider => View::RiderWallet(account),
            Role::Driver => View::DriverDashboard(account),
        });

        Ok(TopUpReceipt {
            transaction,
            balance,
            reference: capture.reference,
        })
    }
}
