//! Error types for ledger primitives.

use thiserror::Error;

use crate::model::AccountId;

/// Failure of a single ledger primitive.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("account {0} already exists")]
    AccountExists(AccountId),

    #[error("account {0} is not a driver")]
    NotADriver(AccountId),

    #[error("payment token '{0}' already issued")]
    DuplicateToken(String),

    #[error("amount overflow on account {0}")]
    Overflow(AccountId),

    #[error("platform commission total overflow")]
    CommissionOverflow,
}

/// Reasons a payment token cannot be consumed.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid or expired token '{0}': not found")]
    NotFound(String),

    #[error("invalid or expired token '{0}': expired")]
    Expired(String),

    #[error("invalid or expired token '{0}': already used")]
    AlreadyConsumed(String),
}
