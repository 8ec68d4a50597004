//! In-memory store with per-row locking.
//!
//! Intended for tests/dev. Each [`RowKey`] maps to its own async mutex; a unit of work
//! acquires the mutexes for its declared rows in canonical order and holds them until it
//! is committed or dropped. Committed data sits behind a `RwLock` that is only taken for
//! the duration of a read or of applying a commit, never across an await point.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};

use ledgerguard_core::{AccountId, Amount, OperationName, RowKey, StoreError};
use ledgerguard_ledger::transaction::newest_first;
use ledgerguard_ledger::{Account, HistoryFilter, LedgerStore, LedgerUnit, Transaction};
use ledgerguard_limits::{
    LimitState, LimitsStore, LimitsUnit, OperationLimit, OperationType, PolicyStore,
};

type StateKey = (AccountId, OperationName);

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    operation_types: BTreeMap<OperationName, OperationType>,
    operation_limits: BTreeMap<(OperationName, u32), OperationLimit>,
    limit_states: HashMap<StateKey, LimitState>,
    transactions: Vec<Transaction>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<RowMutex<()>>>>,
}

impl Shared {
    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))
    }

    fn row_lock(&self, key: &RowKey) -> Result<Arc<RowMutex<()>>, StoreError> {
        let mut locks = self
            .row_locks
            .lock()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        Ok(locks.entry(key.clone()).or_default().clone())
    }

    /// Forget row mutexes nobody holds or waits on; the map's own `Arc` is the last one.
    fn release(&self, scope: &[RowKey]) {
        let Ok(mut locks) = self.row_locks.lock() else {
            return;
        };
        for key in scope {
            if locks.get(key).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
                locks.remove(key);
            }
        }
    }
}

/// In-memory accounts, policies, limit state and transaction log.
///
/// Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account. Account registration lives outside the ledger; this stands in for it.
    pub fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        let mut tables = self.shared.write()?;
        if tables.accounts.contains_key(&account.id) {
            return Err(StoreError::Conflict(format!("account {} already exists", account.id)));
        }
        tables.accounts.insert(account.id, account);
        Ok(())
    }

    /// Convenience for tests: create a fresh account with `balance` at `level`.
    pub fn open_account(&self, balance: Amount, level: u32) -> Result<Account, StoreError> {
        let account = Account::new(AccountId::new(), balance, level);
        self.insert_account(account.clone())?;
        Ok(account)
    }

    /// Number of committed transaction records, across all accounts.
    pub fn transaction_count(&self) -> Result<usize, StoreError> {
        Ok(self.shared.read()?.transactions.len())
    }

    async fn lock_rows(&self, scope: Vec<RowKey>) -> Result<InMemoryUnit, StoreError> {
        // Built before locking so a failed or abandoned acquisition still releases its rows.
        let mut unit = InMemoryUnit {
            shared: Arc::clone(&self.shared),
            scope: RowKey::canonical(scope),
            guards: Vec::new(),
            accounts: HashMap::new(),
            limit_states: HashMap::new(),
            transactions: Vec::new(),
            committed: false,
        };
        let mutexes = unit
            .scope
            .iter()
            .map(|key| self.shared.row_lock(key))
            .collect::<Result<Vec<_>, _>>()?;

        unit.guards.reserve(mutexes.len());
        for mutex in mutexes {
            unit.guards.push(mutex.lock_owned().await);
        }
        Ok(unit)
    }
}

/// A unit of work over the in-memory tables. Writes are staged here and applied on commit.
struct InMemoryUnit {
    shared: Arc<Shared>,
    scope: Vec<RowKey>,
    guards: Vec<OwnedMutexGuard<()>>,
    accounts: HashMap<AccountId, Account>,
    limit_states: HashMap<StateKey, LimitState>,
    transactions: Vec<Transaction>,
    committed: bool,
}

impl InMemoryUnit {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.committed {
            Err(StoreError::storage("unit of work already committed"))
        } else {
            Ok(())
        }
    }

    fn ensure_locked(&self, key: &RowKey) -> Result<(), StoreError> {
        self.ensure_open()?;
        if self.scope.binary_search(key).is_ok() {
            Ok(())
        } else {
            Err(StoreError::storage(format!("row {key:?} is not held by this unit of work")))
        }
    }

    fn release_rows(&mut self) {
        self.guards.clear();
        self.shared.release(&self.scope);
    }

    fn current_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.ensure_locked(&RowKey::Account(id))?;
        if let Some(staged) = self.accounts.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.shared.read()?.accounts.get(&id).cloned())
    }

    fn current_state(&self, key: &StateKey) -> Result<Option<LimitState>, StoreError> {
        self.ensure_locked(&RowKey::LimitState(key.0, key.1.clone()))?;
        if let Some(staged) = self.limit_states.get(key) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.shared.read()?.limit_states.get(key).cloned())
    }
}

impl Drop for InMemoryUnit {
    fn drop(&mut self) {
        self.release_rows();
    }
}

#[async_trait]
impl LimitsUnit for InMemoryUnit {
    async fn operation_type_exists(&mut self, name: &OperationName) -> Result<bool, StoreError> {
        self.ensure_open()?;
        Ok(self.shared.read()?.operation_types.contains_key(name))
    }

    async fn find_policy(
        &mut self,
        name: &OperationName,
        user_level: u32,
    ) -> Result<Option<OperationLimit>, StoreError> {
        self.ensure_open()?;
        Ok(self
            .shared
            .read()?
            .operation_limits
            .get(&(name.clone(), user_level))
            .cloned())
    }

    async fn limit_state(
        &mut self,
        account_id: AccountId,
        operation_type: &OperationName,
    ) -> Result<Option<LimitState>, StoreError> {
        self.current_state(&(account_id, operation_type.clone()))
    }

    async fn load_or_create_limit_state(
        &mut self,
        account_id: AccountId,
        operation_type: &OperationName,
    ) -> Result<LimitState, StoreError> {
        let key = (account_id, operation_type.clone());
        match self.current_state(&key)? {
            Some(state) => Ok(state),
            None => {
                // The row lock is held, so no other unit can create the same pair meanwhile.
                let fresh = LimitState::fresh(account_id, operation_type.clone());
                self.limit_states.insert(key, fresh.clone());
                Ok(fresh)
            }
        }
    }

    async fn save_limit_state(&mut self, state: &LimitState) -> Result<(), StoreError> {
        self.ensure_locked(&RowKey::LimitState(state.account_id, state.operation_type.clone()))?;
        self.limit_states
            .insert((state.account_id, state.operation_type.clone()), state.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        {
            let mut tables = self.shared.write()?;
            for (id, account) in self.accounts.drain() {
                tables.accounts.insert(id, account);
            }
            for (key, state) in self.limit_states.drain() {
                tables.limit_states.insert(key, state);
            }
            tables.transactions.append(&mut self.transactions);
        }
        self.committed = true;
        self.release_rows();
        Ok(())
    }
}

#[async_trait]
impl LedgerUnit for InMemoryUnit {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.current_account(id)
    }

    async fn increment_balance(&mut self, id: AccountId, amount: Amount) -> Result<Account, StoreError> {
        let mut account = self
            .current_account(id)?
            .ok_or_else(|| StoreError::storage(format!("account {id} does not exist")))?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::Conflict(format!("balance of account {id} would overflow")))?;
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn decrement_balance(&mut self, id: AccountId, amount: Amount) -> Result<Account, StoreError> {
        let mut account = self
            .current_account(id)?
            .ok_or_else(|| StoreError::storage(format!("account {id} does not exist")))?;
        account.balance = account
            .balance
            .checked_sub(amount)
            .ok_or_else(|| StoreError::Conflict(format!("balance of account {id} would go negative")))?;
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn append_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError> {
        self.ensure_locked(&RowKey::Account(tx.account_id))?;
        self.transactions.push(tx.clone());
        Ok(())
    }
}

#[async_trait]
impl LimitsStore for InMemoryStore {
    async fn begin_limits(&self, scope: Vec<RowKey>) -> Result<Box<dyn LimitsUnit>, StoreError> {
        Ok(Box::new(self.lock_rows(scope).await?))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn begin(&self, scope: Vec<RowKey>) -> Result<Box<dyn LedgerUnit>, StoreError> {
        Ok(Box::new(self.lock_rows(scope).await?))
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.shared.read()?.accounts.get(&id).cloned())
    }

    async fn history(&self, id: AccountId, filter: &HistoryFilter) -> Result<Vec<Transaction>, StoreError> {
        let tables = self.shared.read()?;
        let mut records: Vec<Transaction> = tables
            .transactions
            .iter()
            .filter(|tx| tx.account_id == id && filter.matches(tx))
            .cloned()
            .collect();
        records.sort_by(newest_first);
        Ok(records)
    }
}

#[async_trait]
impl PolicyStore for InMemoryStore {
    async fn insert_operation_type(&self, operation_type: OperationType) -> Result<(), StoreError> {
        let mut tables = self.shared.write()?;
        if tables.operation_types.contains_key(&operation_type.name) {
            return Err(StoreError::Conflict(format!(
                "operation type {} already exists",
                operation_type.name
            )));
        }
        tables
            .operation_types
            .insert(operation_type.name.clone(), operation_type);
        Ok(())
    }

    async fn operation_type(&self, name: &OperationName) -> Result<Option<OperationType>, StoreError> {
        Ok(self.shared.read()?.operation_types.get(name).cloned())
    }

    async fn operation_types(&self) -> Result<Vec<OperationType>, StoreError> {
        Ok(self.shared.read()?.operation_types.values().cloned().collect())
    }

    async fn insert_operation_limit(&self, limit: OperationLimit) -> Result<(), StoreError> {
        let mut tables = self.shared.write()?;
        let key = (limit.operation_type.clone(), limit.user_level);
        if tables.operation_limits.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "limit for {} at level {} already exists",
                limit.operation_type, limit.user_level
            )));
        }
        tables.operation_limits.insert(key, limit);
        Ok(())
    }

    async fn operation_limit(
        &self,
        name: &OperationName,
        user_level: u32,
    ) -> Result<Option<OperationLimit>, StoreError> {
        Ok(self
            .shared
            .read()?
            .operation_limits
            .get(&(name.clone(), user_level))
            .cloned())
    }

    async fn operation_limits(&self) -> Result<Vec<OperationLimit>, StoreError> {
        Ok(self.shared.read()?.operation_limits.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn op(name: &str) -> OperationName {
        OperationName::new(name).unwrap()
    }

    fn row_lock_count(store: &InMemoryStore) -> usize {
        store.shared.row_locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = InMemoryStore::new();
        let account = store.open_account(Amount::from_units(10), 1).unwrap();

        let mut unit = store.begin(vec![RowKey::Account(account.id)]).await.unwrap();
        unit.increment_balance(account.id, Amount::from_units(5)).await.unwrap();
        assert_eq!(
            LedgerStore::account(&store, account.id).await.unwrap().unwrap().balance,
            Amount::from_units(10)
        );

        unit.commit().await.unwrap();
        assert_eq!(
            LedgerStore::account(&store, account.id).await.unwrap().unwrap().balance,
            Amount::from_units(15)
        );
    }

    #[tokio::test]
    async fn dropping_a_unit_discards_its_writes() {
        let store = InMemoryStore::new();
        let account = store.open_account(Amount::from_units(10), 1).unwrap();
        let pair = op("DEPOSIT");

        {
            let mut unit = store
                .begin(vec![
                    RowKey::Account(account.id),
                    RowKey::LimitState(account.id, pair.clone()),
                ])
                .await
                .unwrap();
            unit.decrement_balance(account.id, Amount::from_units(3)).await.unwrap();
            unit.load_or_create_limit_state(account.id, &pair).await.unwrap();
        }

        let mut unit = store
            .begin_limits(vec![RowKey::LimitState(account.id, pair.clone())])
            .await
            .unwrap();
        assert!(unit.limit_state(account.id, &pair).await.unwrap().is_none());
        assert_eq!(
            LedgerStore::account(&store, account.id).await.unwrap().unwrap().balance,
            Amount::from_units(10)
        );
    }

    #[tokio::test]
    async fn decrement_refuses_to_go_negative() {
        let store = InMemoryStore::new();
        let account = store.open_account(Amount::from_units(1), 1).unwrap();
        let mut unit = store.begin(vec![RowKey::Account(account.id)]).await.unwrap();

        let err = unit
            .decrement_balance(account.id, Amount::from_units(2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn rows_outside_the_scope_are_refused() {
        let store = InMemoryStore::new();
        let (a, b) = (
            store.open_account(Amount::ZERO, 1).unwrap(),
            store.open_account(Amount::ZERO, 1).unwrap(),
        );
        let mut unit = store.begin(vec![RowKey::Account(a.id)]).await.unwrap();
        assert!(unit.account(b.id).await.is_err());
    }

    #[tokio::test]
    async fn a_committed_unit_cannot_be_reused() {
        let store = InMemoryStore::new();
        let account = store.open_account(Amount::ZERO, 1).unwrap();
        let mut unit = store.begin(vec![RowKey::Account(account.id)]).await.unwrap();
        unit.commit().await.unwrap();
        assert!(unit.account(account.id).await.is_err());
        assert!(unit.commit().await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn a_second_unit_waits_for_the_row() {
        let store = InMemoryStore::new();
        let account = store.open_account(Amount::ZERO, 1).unwrap();

        let mut first = store.begin(vec![RowKey::Account(account.id)]).await.unwrap();

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut unit = store.begin(vec![RowKey::Account(account.id)]).await.unwrap();
                unit.account(account.id).await.unwrap().unwrap().balance
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        first.increment_balance(account.id, Amount::from_units(7)).await.unwrap();
        first.commit().await.unwrap();

        assert_eq!(contender.await.unwrap(), Amount::from_units(7));
        assert_eq!(row_lock_count(&store), 0);
    }

    #[tokio::test]
    async fn row_locks_are_forgotten_with_their_unit() {
        let store = InMemoryStore::new();
        let account = store.open_account(Amount::ZERO, 1).unwrap();

        // Lookups of accounts that do not exist leave nothing behind.
        for _ in 0..10 {
            let missing = AccountId::new();
            let mut unit = store.begin(vec![RowKey::Account(missing)]).await.unwrap();
            assert_eq!(row_lock_count(&store), 1);
            assert!(unit.account(missing).await.unwrap().is_none());
        }
        assert_eq!(row_lock_count(&store), 0);

        let mut unit = store
            .begin(vec![
                RowKey::Account(account.id),
                RowKey::LimitState(account.id, op("DEPOSIT")),
            ])
            .await
            .unwrap();
        assert_eq!(row_lock_count(&store), 2);
        unit.increment_balance(account.id, Amount::from_units(1)).await.unwrap();
        unit.commit().await.unwrap();
        assert_eq!(row_lock_count(&store), 0);

        // A fresh mutex for the same row still excludes.
        let first = store.begin(vec![RowKey::Account(account.id)]).await.unwrap();
        let waiting = {
            let store = store.clone();
            tokio::spawn(async move { store.begin(vec![RowKey::Account(account.id)]).await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());
        drop(first);
        waiting.await.unwrap().unwrap();
        assert_eq!(row_lock_count(&store), 0);
    }

    #[tokio::test]
    async fn history_comes_back_newest_first() {
        let store = InMemoryStore::new();
        let account = store.open_account(Amount::ZERO, 1).unwrap();
        let at = chrono::Utc::now();
        let (a, b) = (
            Transaction::deposit(account.id, Amount::from_units(1), at),
            Transaction::deposit(account.id, Amount::from_units(2), at),
        );
        let later = Transaction::deposit(account.id, Amount::from_units(3), at + chrono::Duration::hours(1));

        let mut unit = store.begin(vec![RowKey::Account(account.id)]).await.unwrap();
        for tx in [&a, &later, &b] {
            unit.append_transaction(tx).await.unwrap();
        }
        unit.commit().await.unwrap();

        let (high, low) = if a.id > b.id { (a, b) } else { (b, a) };
        let records = store.history(account.id, &HistoryFilter::all()).await.unwrap();
        assert_eq!(records, vec![later, high, low]);
    }

    #[tokio::test]
    async fn duplicate_policy_rows_conflict() {
        let store = InMemoryStore::new();
        let kind = OperationType {
            name: op("DEPOSIT"),
            description: "cash in".to_string(),
            created_at: chrono::Utc::now(),
        };
        store.insert_operation_type(kind.clone()).await.unwrap();
        assert!(matches!(
            store.insert_operation_type(kind).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
