//! Error types for settlement operations.

use thiserror::Error;

use crate::Amount;
use crate::gateway::GatewayError;
use crate::model::{AccountId, PaymentMethod};
use crate::store::{StoreError, TokenError};

/// Top-level error returned by [`Engine::apply`](super::Engine::apply).
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("cash commission failed: {0}")]
    Commission(#[from] CommissionError),

    #[error("qr payment failed: {0}")]
    QrPayment(#[from] QrPaymentError),

    #[error("wallet top-up failed: {0}")]
    TopUp(#[from] TopUpError),

    #[error("penalty payment failed: {0}")]
    Penalty(#[from] PenaltyError),

    #[error("token issue failed: {0}")]
    IssueToken(#[from] IssueTokenError),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Error while settling the commission on a cash ride.
#[derive(Debug, Error)]
pub enum CommissionError {
    #[error("invalid ride amount {0}")]
    InvalidAmount(Amount),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error while settling a ride through a scanned QR token.
#[derive(Debug, Error)]
pub enum QrPaymentError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("insufficient wallet balance for rider {0}: balance {1}, required {2}")]
    InsufficientBalance(AccountId, Amount, Amount),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error while crediting a wallet.
#[derive(Debug, Error)]
pub enum TopUpError {
    #[error("top-up amount must be positive, got {0}")]
    InvalidAmount(Amount),

    #[error("payment method {0} cannot fund a wallet")]
    UnsupportedMethod(PaymentMethod),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error while paying off accrued penalties.
#[derive(Debug, Error)]
pub enum PenaltyError {
    #[error("driver {0} has no pending penalty")]
    NoPendingPenalty(AccountId),

    #[error("insufficient wallet balance for driver {0}: balance {1}, required {2}")]
    InsufficientBalance(AccountId, Amount, Amount),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error while creating a payment token.
#[derive(Debug, Error)]
pub enum IssueTokenError {
    #[error("token amount must not be negative, got {0}")]
    InvalidAmount(Amount),

    #[error(transparent)]
    Store(#[from] StoreError),
}
