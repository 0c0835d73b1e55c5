//! QR code ride payments.
//!
//! A rider's app shows a single-use token bound to a ride and an amount; the
//! driver scans it and the fare moves from the rider's wallet to the driver's
//! earnings and the platform's commission.
//!
//! Consuming the token, writing the ride payment and moving the money are one
//! unit of work. The token is only marked used once the payment row exists,
//! and both land together or not at all, so a token can never be replayed
//! and a failed settlement never burns it.
//!
//! The rider's balance is checked before any money moves: a scan that the
//! wallet cannot cover fails and leaves the token unused.

use chrono::{DateTime, Utc};

use super::{Engine, IssueTokenError, QrPaymentError, View};
use crate::Amount;
use crate::fare::FareSplit;
use crate::gateway::PaymentGateway;
use crate::model::{
    AccountId, NewTransaction, PaymentMethod, PaymentToken, RideId, TransactionId,
    TransactionKind, TransactionStatus,
};
use crate::store::{Ledger, Store, StoreError, TokenError};

/// Result of a settled QR payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrReceipt {
    pub transaction: TransactionId,
    pub ride: RideId,
    pub rider: AccountId,
    pub amount: Amount,
    pub split: FareSplit,
}

impl<S: Store, G: PaymentGateway> Engine<S, G> {
    /// Issue a payment token the rider can present for `ride`.
    ///
    /// A random code is generated unless one is given.
    pub async fn issue_payment_token(
        &self,
        rider: AccountId,
        ride: RideId,
        amount: Amount,
        code: Option<String>,
    ) -> Result<PaymentToken, IssueTokenError> {
        if amount.is_negative() {
            return Err(IssueTokenError::InvalidAmount(amount));
        }

        let code = code.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let token = PaymentToken::new(code, ride, rider, amount, self.now() + self.config.token_ttl);

        self.store
            .atomically(move |ledger| -> Result<PaymentToken, IssueTokenError> {
                ledger.account(rider)?;
                ledger.insert_token(token.clone())?;
                Ok(token)
            })
            .await
    }

    /// Settle a ride by consuming the scanned token `code`.
    pub async fn settle_qr_payment(
        &self,
        code: &str,
        driver: AccountId,
    ) -> Result<QrReceipt, QrPaymentError> {
        let now = self.now();
        let receipt = self
            .store
            .atomically(|ledger| consume_token(ledger, code, driver, now))
            .await?;

        self.invalidations.publish(View::DriverDashboard(driver));
        self.invalidations.publish(View::RiderWallet(receipt.rider));
        Ok(receipt)
    }
}

fn consume_token<L: Ledger>(
    ledger: &mut L,
    code: &str,
    driver: AccountId,
    now: DateTime<Utc>,
) -> Result<QrReceipt, QrPaymentError> {
    if !ledger.account(driver)?.is_driver() {
        return Err(StoreError::NotADriver(driver).into());
    }

    let token = ledger
        .token(code)
        .cloned()
        .ok_or_else(|| TokenError::NotFound(code.to_string()))?;

    // an expired token is reported as expired even if it was also used
    if token.is_expired(now) {
        return Err(TokenError::Expired(code.to_string()).into());
    }
    if token.is_used() {
        return Err(TokenError::AlreadyConsumed(code.to_string()).into());
    }

    let balance = ledger.account(token.rider)?.balance();
    if balance < token.amount {
        return Err(QrPaymentError::InsufficientBalance(
            token.rider,
            balance,
            token.amount,
        ));
    }

    let split = FareSplit::of(token.amount);
    let transaction = ledger.append_transaction(
        NewTransaction {
            kind: TransactionKind::RidePayment,
            ride: Some(token.ride),
            rider: Some(token.rider),
            driver: Some(driver),
            amount: token.amount,
            commission: split.commission,
            driver_earnings: split.driver_earnings,
            method: PaymentMethod::QrCode,
            status: TransactionStatus::Completed,
            reference: Some(token.code.clone()),
        },
        now,
    );
    ledger.mark_token_used(code, driver, transaction)?;
    ledger.increment_driver_earnings(driver, split.driver_earnings)?;
    ledger.adjust_balance(token.rider, -token.amount)?;
    ledger.add_platform_commission(split.commission, Some(transaction))?;

    Ok(QrReceipt {
        transaction,
        ride: token.ride,
        rider: token.rider,
        amount: token.amount,
        split,
    })
}
