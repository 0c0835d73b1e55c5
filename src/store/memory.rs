//! In-memory store used by the CLI and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::{Account, Ledger, Store, StoreError, TokenError};
use crate::Amount;
use crate::model::{
    AccountId, NewTransaction, Notification, PaymentToken, Role, Transaction, TransactionId,
};

/// One credit to the platform commission account.
#[derive(Debug, Clone)]
pub struct CommissionEntry {
    pub amount: Amount,
    pub transaction: Option<TransactionId>,
}

/// How to revert one primitive applied inside a unit of work.
#[derive(Debug, Clone)]
enum Undo {
    Opened(AccountId),
    Account(Account),
    TokenIssued(String),
    Token(PaymentToken),
    Notified(AccountId),
}

/// Undo log of the unit of work in progress.
///
/// Appends to the transaction log and commission entries are reverted by
/// truncating back to the lengths seen when the unit began.
#[derive(Debug, Clone)]
struct Journal {
    undo: Vec<Undo>,
    transactions: usize,
    commission: usize,
    commission_total: Amount,
}

/// Complete ledger contents.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    tokens: HashMap<String, PaymentToken>,
    /// Append-only; a transaction's id is its index + 1.
    transactions: Vec<Transaction>,
    commission: Vec<CommissionEntry>,
    commission_total: Amount,
    inbox: HashMap<AccountId, Vec<Notification>>,
    journal: Option<Journal>,
}

impl LedgerState {
    pub fn commission_entries(&self) -> &[CommissionEntry] {
        &self.commission
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.undo.push(undo);
        }
    }

    /// Mutable access to an account, saving its current state to the journal.
    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, StoreError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::AccountNotFound(id))?;
        if let Some(journal) = self.journal.as_mut() {
            journal.undo.push(Undo::Account(account.clone()));
        }
        Ok(account)
    }

    fn begin(&mut self) {
        // a unit that panicked never reached commit or rollback
        if self.journal.is_some() {
            self.rollback();
        }
        self.journal = Some(Journal {
            undo: Vec::new(),
            transactions: self.transactions.len(),
            commission: self.commission.len(),
            commission_total: self.commission_total,
        });
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };

        for undo in journal.undo.into_iter().rev() {
            match undo {
                Undo::Opened(id) => {
                    self.accounts.remove(&id);
                }
                Undo::Account(account) => {
                    self.accounts.insert(account.id(), account);
                }
                Undo::TokenIssued(code) => {
                    self.tokens.remove(&code);
                }
                Undo::Token(token) => {
                    self.tokens.insert(token.code.clone(), token);
                }
                Undo::Notified(id) => {
                    if let Some(inbox) = self.inbox.get_mut(&id) {
                        inbox.pop();
                    }
                }
            }
        }
        self.transactions.truncate(journal.transactions);
        self.commission.truncate(journal.commission);
        self.commission_total = journal.commission_total;
    }
}

impl Ledger for LedgerState {
    fn open_account(&mut self, id: AccountId, role: Role) -> Result<(), StoreError> {
        if self.accounts.contains_key(&id) {
            return Err(StoreError::AccountExists(id));
        }
        self.accounts.insert(id, Account::new(id, role));
        self.record(Undo::Opened(id));
        Ok(())
    }

    fn account(&self, id: AccountId) -> Result<&Account, StoreError> {
        self.accounts.get(&id).ok_or(StoreError::AccountNotFound(id))
    }

    fn accounts(&self) -> Vec<&Account> {
        self.accounts.values().collect()
    }

    fn adjust_balance(&mut self, id: AccountId, delta: Amount) -> Result<Amount, StoreError> {
        self.account_mut(id)?
            .adjust(delta)
            .ok_or(StoreError::Overflow(id))
    }

    fn debit_if_sufficient(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> Result<Option<Amount>, StoreError> {
        if self.account(id)?.balance() < amount {
            return Ok(None);
        }
        let debit = Amount::ZERO
            .checked_sub(amount)
            .ok_or(StoreError::Overflow(id))?;
        self.adjust_balance(id, debit).map(Some)
    }

    fn accrue_penalty(
        &mut self,
        id: AccountId,
        amount: Amount,
        deadline: DateTime<Utc>,
    ) -> Result<Amount, StoreError> {
        self.account_mut(id)?
            .add_penalty(amount, deadline)
            .ok_or(StoreError::Overflow(id))
    }

    fn clear_penalty(&mut self, id: AccountId) -> Result<Amount, StoreError> {
        Ok(self.account_mut(id)?.clear_penalty())
    }

    fn increment_driver_earnings(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> Result<Amount, StoreError> {
        if !self.account(id)?.is_driver() {
            return Err(StoreError::NotADriver(id));
        }
        self.account_mut(id)?
            .add_earnings(amount)
            .ok_or(StoreError::Overflow(id))
    }

    fn add_platform_commission(
        &mut self,
        amount: Amount,
        transaction: Option<TransactionId>,
    ) -> Result<(), StoreError> {
        self.commission_total = self
            .commission_total
            .checked_add(amount)
            .ok_or(StoreError::CommissionOverflow)?;
        self.commission.push(CommissionEntry {
            amount,
            transaction,
        });
        Ok(())
    }

    fn platform_commission(&self) -> Amount {
        self.commission_total
    }

    fn append_transaction(&mut self, tx: NewTransaction, at: DateTime<Utc>) -> TransactionId {
        let id = self.transactions.len() as TransactionId + 1;
        self.transactions.push(Transaction::record(id, at, tx));
        id
    }

    fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        let idx = usize::try_from(id.checked_sub(1)?).ok()?;
        self.transactions.get(idx)
    }

    fn insert_token(&mut self, token: PaymentToken) -> Result<(), StoreError> {
        if self.tokens.contains_key(&token.code) {
            return Err(StoreError::DuplicateToken(token.code));
        }
        self.record(Undo::TokenIssued(token.code.clone()));
        self.tokens.insert(token.code.clone(), token);
        Ok(())
    }

    fn token(&self, code: &str) -> Option<&PaymentToken> {
        self.tokens.get(code)
    }

    fn mark_token_used(
        &mut self,
        code: &str,
        consumer: AccountId,
        transaction: TransactionId,
    ) -> Result<(), TokenError> {
        let token = self
            .tokens
            .get_mut(code)
            .ok_or_else(|| TokenError::NotFound(code.to_string()))?;

        if token.is_used() {
            return Err(TokenError::AlreadyConsumed(code.to_string()));
        }

        let before = token.clone();
        token.used_by = Some(consumer);
        token.transaction = Some(transaction);
        self.record(Undo::Token(before));
        Ok(())
    }

    fn post_notification(&mut self, notification: Notification) -> Result<(), StoreError> {
        // inbox owner must exist
        self.account(notification.account)?;
        let owner = notification.account;
        self.inbox.entry(owner).or_default().push(notification);
        self.record(Undo::Notified(owner));
        Ok(())
    }

    fn notifications(&self, id: AccountId) -> Vec<&Notification> {
        self.inbox
            .get(&id)
            .map(|inbox| inbox.iter().collect())
            .unwrap_or_default()
    }
}

/// Single-process store backed by [`LedgerState`].
///
/// A unit of work runs directly on the live state under the store lock while
/// journaling how to revert each primitive. An error replays the journal
/// backwards; success drops it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<LedgerState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(mut state: LedgerState) -> Self {
        state.journal = None;
        Self {
            state: Mutex::new(state),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Ledger = LedgerState;

    async fn atomically<R, E, F>(&self, work: F) -> Result<R, E>
    where
        F: FnOnce(&mut Self::Ledger) -> Result<R, E> + Send,
        R: Send,
        E: Send,
    {
        let mut state = self.state.lock().await;
        state.begin();
        match work(&mut *state) {
            Ok(out) => {
                state.commit();
                Ok(out)
            }
            Err(e) => {
                state.rollback();
                Err(e)
            }
        }
    }

    async fn read<R, F>(&self, query: F) -> R
    where
        F: FnOnce(&Self::Ledger) -> R + Send,
        R: Send,
    {
        let state = self.state.lock().await;
        query(&*state)
    }
}
