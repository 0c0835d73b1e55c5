//! Storage seam for settlements.
//!
//! [`Ledger`] is the set of row-level primitives a settlement is built from
//! (balance deltas, earnings and commission accrual, token consumption,
//! transaction and notification appends). [`Store`] hands out a ledger inside
//! a unit of work: either every primitive applied by the closure becomes
//! visible, or none of them do.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Amount;
use crate::model::{
    AccountId, NewTransaction, Notification, PaymentToken, Role, Transaction, TransactionId,
};

mod account;
pub use account::Account;

mod error;
pub use error::{StoreError, TokenError};

mod memory;
pub use memory::{CommissionEntry, InMemoryStore, LedgerState};

/// Row-level primitives available inside a unit of work.
pub trait Ledger {
    fn open_account(&mut self, id: AccountId, role: Role) -> Result<(), StoreError>;

    fn account(&self, id: AccountId) -> Result<&Account, StoreError>;

    /// All accounts, ordered by id.
    fn accounts(&self) -> Vec<&Account>;

    /// Apply a signed delta to the wallet and return the new balance.
    ///
    /// Balance, earnings and penalty primitives fail with
    /// [`StoreError::Overflow`] instead of wrapping.
    fn adjust_balance(&mut self, id: AccountId, delta: Amount) -> Result<Amount, StoreError>;

    /// Debit `amount` only if the balance covers it.
    ///
    /// Returns the new balance, or `None` when funds were insufficient and
    /// nothing changed.
    fn debit_if_sufficient(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> Result<Option<Amount>, StoreError>;

    /// Add to the pending penalty and move its deadline; returns the new total.
    fn accrue_penalty(
        &mut self,
        id: AccountId,
        amount: Amount,
        deadline: DateTime<Utc>,
    ) -> Result<Amount, StoreError>;

    /// Zero the pending penalty and its deadline; returns the cleared amount.
    fn clear_penalty(&mut self, id: AccountId) -> Result<Amount, StoreError>;

    fn increment_driver_earnings(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> Result<Amount, StoreError>;

    /// Credit the platform commission account. Fails if the running total
    /// would overflow.
    fn add_platform_commission(
        &mut self,
        amount: Amount,
        transaction: Option<TransactionId>,
    ) -> Result<(), StoreError>;

    fn platform_commission(&self) -> Amount;

    fn append_transaction(&mut self, tx: NewTransaction, at: DateTime<Utc>) -> TransactionId;

    fn transaction(&self, id: TransactionId) -> Option<&Transaction>;

    fn insert_token(&mut self, token: PaymentToken) -> Result<(), StoreError>;

    fn token(&self, code: &str) -> Option<&PaymentToken>;

    /// Flip a token from unused to used. Fails if it was already used.
    fn mark_token_used(
        &mut self,
        code: &str,
        consumer: AccountId,
        transaction: TransactionId,
    ) -> Result<(), TokenError>;

    fn post_notification(&mut self, notification: Notification) -> Result<(), StoreError>;

    fn notifications(&self, id: AccountId) -> Vec<&Notification>;
}

/// Shared backend holding the ledger.
#[async_trait]
pub trait Store: Send + Sync {
    type Ledger: Ledger + Send;

    /// Run `work` as one all-or-nothing unit.
    ///
    /// Units never interleave. If `work` returns an error, every primitive it
    /// applied is discarded.
    async fn atomically<R, E, F>(&self, work: F) -> Result<R, E>
    where
        F: FnOnce(&mut Self::Ledger) -> Result<R, E> + Send,
        R: Send,
        E: Send;

    /// Read a consistent view of the ledger.
    async fn read<R, F>(&self, query: F) -> R
    where
        F: FnOnce(&Self::Ledger) -> R + Send,
        R: Send;
}
