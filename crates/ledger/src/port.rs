//! Storage ports for accounts and the transaction log.
//!
//! A [`LedgerUnit`] extends the limits unit of work with account access, so a limit
//! check and the balance mutation it guards commit (or vanish) together.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerguard_core::{AccountId, Amount, RowKey, StoreError};
use ledgerguard_limits::{LimitsStore, LimitsUnit};

use crate::account::Account;
use crate::transaction::{HistoryFilter, Transaction};

#[async_trait]
pub trait LedgerUnit: LimitsUnit {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Add to a balance held by this unit. Returns the updated account.
    async fn increment_balance(&mut self, id: AccountId, amount: Amount) -> Result<Account, StoreError>;

    /// Subtract from a balance held by this unit. Implementations must refuse to take a
    /// balance below zero.
    async fn decrement_balance(&mut self, id: AccountId, amount: Amount) -> Result<Account, StoreError>;

    async fn append_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LedgerStore: LimitsStore {
    /// Open a unit of work holding the given account and limit-state rows.
    async fn begin(&self, scope: Vec<RowKey>) -> Result<Box<dyn LedgerUnit>, StoreError>;

    /// Committed view of an account, outside any unit of work.
    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// The account's records matching `filter`, newest first.
    async fn history(&self, id: AccountId, filter: &HistoryFilter) -> Result<Vec<Transaction>, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn begin(&self, scope: Vec<RowKey>) -> Result<Box<dyn LedgerUnit>, StoreError> {
        (**self).begin(scope).await
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).account(id).await
    }

    async fn history(&self, id: AccountId, filter: &HistoryFilter) -> Result<Vec<Transaction>, StoreError> {
        (**self).history(id, filter).await
    }
}
