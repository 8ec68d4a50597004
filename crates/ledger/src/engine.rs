//! Deposit / transfer orchestration.
//!
//! ```text
//! deposit/transfer
//!   ↓
//! 1. Validate inputs (no IO)
//!   ↓
//! 2. Begin a unit of work over the touched account and limit-state rows
//!   ↓
//! 3. Limits check inside the unit
//!      denied → commit the failure bookkeeping only, return the denial
//!   ↓
//! 4. Balance checks, balance mutation, transaction records
//!   ↓
//! 5. Commit (any error before this drops the unit: full rollback)
//! ```

use std::sync::Arc;

use tracing::{info, instrument};

use ledgerguard_core::{AccountId, Amount, Clock, DomainError, OperationName, RowKey};
use ledgerguard_limits::{operations, LimitCheckResult, LimitsEngine};

use crate::account::Account;
use crate::error::LedgerError;
use crate::port::{LedgerStore, LedgerUnit};
use crate::transaction::{HistoryFilter, Transaction, TransferReceipt};

/// Operation types the ledger checks limits under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOperations {
    pub deposit: OperationName,
    pub transfer: OperationName,
}

impl Default for LedgerOperations {
    fn default() -> Self {
        Self {
            deposit: OperationName::from_static(operations::DEPOSIT),
            transfer: OperationName::from_static(operations::TRANSFER),
        }
    }
}

pub struct LedgerEngine<S> {
    store: S,
    limits: LimitsEngine<S>,
    clock: Arc<dyn Clock>,
    operations: LedgerOperations,
}

impl<S: LedgerStore> LedgerEngine<S> {
    pub fn new(
        store: S,
        limits: LimitsEngine<S>,
        clock: Arc<dyn Clock>,
        operations: LedgerOperations,
    ) -> Self {
        Self {
            store,
            limits,
            clock,
            operations,
        }
    }

    pub fn limits(&self) -> &LimitsEngine<S> {
        &self.limits
    }

    pub fn operations(&self) -> &LedgerOperations {
        &self.operations
    }

    #[instrument(skip(self), fields(account_id = %account_id, %amount), err)]
    pub async fn deposit(&self, account_id: AccountId, amount: Amount) -> Result<Transaction, LedgerError> {
        amount.ensure_positive("deposit amount")?;

        let operation = &self.operations.deposit;
        let mut unit = self
            .store
            .begin(vec![
                RowKey::Account(account_id),
                RowKey::LimitState(account_id, operation.clone()),
            ])
            .await?;

        let account = load_account(&mut *unit, account_id).await?;
        let decision = self
            .limits
            .check_in(&mut *unit, account_id, operation, amount, account.level)
            .await?;
        refuse_if_denied(&mut *unit, decision).await?;

        ensure_no_overflow(&account, amount)?;
        unit.increment_balance(account_id, amount).await?;
        let tx = Transaction::deposit(account_id, amount, self.clock.now());
        unit.append_transaction(&tx).await?;
        unit.commit().await?;

        info!(transaction_id = %tx.id, "deposit recorded");
        Ok(tx)
    }

    #[instrument(
        skip(self, description),
        fields(sender_id = %sender_id, recipient_id = %recipient_id, %amount),
        err
    )]
    pub async fn transfer(
        &self,
        sender_id: AccountId,
        recipient_id: AccountId,
        amount: Amount,
        description: Option<String>,
    ) -> Result<TransferReceipt, LedgerError> {
        amount.ensure_positive("transfer amount")?;
        if sender_id == recipient_id {
            return Err(DomainError::invalid("cannot transfer to the same account").into());
        }

        let operation = &self.operations.transfer;
        let mut unit = self
            .store
            .begin(vec![
                RowKey::Account(sender_id),
                RowKey::Account(recipient_id),
                RowKey::LimitState(sender_id, operation.clone()),
            ])
            .await?;

        let sender = load_account(&mut *unit, sender_id).await?;
        let decision = self
            .limits
            .check_in(&mut *unit, sender_id, operation, amount, sender.level)
            .await?;
        refuse_if_denied(&mut *unit, decision).await?;

        if sender.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                available: sender.balance,
                requested: amount,
            });
        }
        let recipient = load_account(&mut *unit, recipient_id).await?;
        ensure_no_overflow(&recipient, amount)?;

        unit.decrement_balance(sender_id, amount).await?;
        unit.increment_balance(recipient_id, amount).await?;

        let (sent, received) =
            Transaction::transfer_pair(sender_id, recipient_id, amount, description, self.clock.now());
        unit.append_transaction(&sent).await?;
        unit.append_transaction(&received).await?;
        unit.commit().await?;

        info!(sent_id = %sent.id, received_id = %received.id, "transfer recorded");
        Ok(TransferReceipt { sent, received })
    }

    /// The account's records, newest first.
    pub async fn history(
        &self,
        account_id: AccountId,
        filter: &HistoryFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        if self.store.account(account_id).await?.is_none() {
            return Err(LedgerError::account_not_found(account_id));
        }
        Ok(self.store.history(account_id, filter).await?)
    }

    pub async fn account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .account(account_id)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(account_id))
    }

    /// Stand-alone limit check (no money moves); the outcome is still recorded.
    pub async fn check_operation_limit(
        &self,
        account_id: AccountId,
        operation_type: &OperationName,
        amount: Amount,
        user_level: u32,
    ) -> Result<LimitCheckResult, LedgerError> {
        Ok(self
            .limits
            .check_and_update(account_id, operation_type, amount, user_level)
            .await?)
    }
}

async fn load_account(unit: &mut dyn LedgerUnit, id: AccountId) -> Result<Account, LedgerError> {
    unit.account(id)
        .await?
        .ok_or_else(|| LedgerError::account_not_found(id))
}

/// A denial keeps the limits bookkeeping (failed attempts, block) but nothing else, so
/// the unit is committed before reporting it. Nothing else has been staged yet.
async fn refuse_if_denied(unit: &mut dyn LedgerUnit, decision: LimitCheckResult) -> Result<(), LedgerError> {
    match LedgerError::from_denial(decision) {
        None => Ok(()),
        Some(denial) => {
            unit.commit().await?;
            Err(denial)
        }
    }
}

fn ensure_no_overflow(account: &Account, amount: Amount) -> Result<(), LedgerError> {
    match account.balance.checked_add(amount) {
        Some(_) => Ok(()),
        None => Err(DomainError::invalid(format!("balance of account {} would overflow", account.id)).into()),
    }
}
