//! Postgres-backed store.
//!
//! A unit of work is one database transaction. Locks are taken when the unit begins, in
//! canonical [`RowKey`] order:
//!
//! - account rows with `SELECT ... FOR UPDATE`;
//! - (account, operation type) pairs with a transaction-scoped advisory lock, so a pair
//!   can be serialized before its `limit_states` row exists.
//!
//! Limit state rows are created with `INSERT ... ON CONFLICT DO NOTHING`, which keeps
//! first access idempotent. Dropping a unit without committing rolls the transaction back.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check violation) | `23514` | `Conflict` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | ColumnDecode / Decode | N/A | `Corrupt` |
//! | Other | N/A | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use ledgerguard_core::{AccountId, Amount, OperationName, RowKey, StoreError, TransactionId};
use ledgerguard_ledger::{Account, HistoryFilter, LedgerStore, LedgerUnit, Transaction};
use ledgerguard_limits::{
    LimitState, LimitsStore, LimitsUnit, OperationLimit, OperationType, PolicyStore,
};

const SCHEMA: &str = include_str!("../../migrations/0001_ledger.sql");

const LIMIT_STATE_COLUMNS: &str = "account_id, operation_type, daily_accumulated, monthly_accumulated, \
     last_operation_at, is_blocked, block_expires_at, failed_attempts, last_failed_attempt_at";

const TRANSACTION_COLUMNS: &str =
    "id, account_id, related_account_id, kind, amount, description, created_at";

/// Postgres-backed accounts, policies, limit state and transaction log.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(url), err)]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    /// Seed an account. Account registration lives outside the ledger; this stands in for it.
    #[instrument(skip(self), fields(account_id = %account.id), err)]
    pub async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO accounts (id, balance, level) VALUES ($1, $2, $3)")
            .bind(*account.id.as_uuid())
            .bind(account.balance.minor_units())
            .bind(level_to_sql(account.level)?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_account", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(rows = scope.len()), err)]
    async fn lock_rows(&self, scope: Vec<RowKey>) -> Result<PgUnit, StoreError> {
        let scope = RowKey::canonical(scope);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for key in &scope {
            match key {
                RowKey::Account(id) => {
                    sqlx::query("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
                        .bind(*id.as_uuid())
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("lock_account", e))?;
                }
                RowKey::LimitState(account_id, operation_type) => {
                    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                        .bind(format!("limit_state:{account_id}:{operation_type}"))
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("lock_limit_state", e))?;
                }
            }
        }
        debug!("rows locked");

        Ok(PgUnit {
            tx: Some(tx),
            scope,
        })
    }
}

/// One database transaction holding the rows declared at begin.
struct PgUnit {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
    scope: Vec<RowKey>,
}

impl PgUnit {
    fn conn(&mut self) -> Result<&mut sqlx::Transaction<'static, Postgres>, StoreError> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::storage("unit of work already committed"))
    }

    fn ensure_locked(&self, key: &RowKey) -> Result<(), StoreError> {
        if self.scope.binary_search(key).is_ok() {
            Ok(())
        } else {
            Err(StoreError::storage(format!("row {key:?} is not held by this unit of work")))
        }
    }

    async fn fetch_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.ensure_locked(&RowKey::Account(id))?;
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, AccountRow>("SELECT id, balance, level FROM accounts WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_account", e))?;
        row.map(Account::try_from).transpose()
    }

    async fn adjust_balance(
        &mut self,
        id: AccountId,
        sql: &'static str,
        amount: Amount,
        operation: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.ensure_locked(&RowKey::Account(id))?;
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, AccountRow>(sql)
            .bind(*id.as_uuid())
            .bind(amount.minor_units())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(Account::try_from).transpose()
    }
}

#[async_trait]
impl LimitsUnit for PgUnit {
    async fn operation_type_exists(&mut self, name: &OperationName) -> Result<bool, StoreError> {
        let tx = self.conn()?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM operation_types WHERE name = $1)")
            .bind(name.as_str())
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("operation_type_exists", e))?;
        Ok(exists)
    }

    async fn find_policy(
        &mut self,
        name: &OperationName,
        user_level: u32,
    ) -> Result<Option<OperationLimit>, StoreError> {
        let level = level_to_sql(user_level)?;
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, OperationLimitRow>(
            r#"
            SELECT operation_type, user_level, daily_limit, monthly_limit, updated_at
            FROM operation_limits
            WHERE operation_type = $1 AND user_level = $2
            "#,
        )
        .bind(name.as_str())
        .bind(level)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("find_policy", e))?;
        row.map(OperationLimit::try_from).transpose()
    }

    async fn limit_state(
        &mut self,
        account_id: AccountId,
        operation_type: &OperationName,
    ) -> Result<Option<LimitState>, StoreError> {
        self.ensure_locked(&RowKey::LimitState(account_id, operation_type.clone()))?;
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, LimitStateRow>(&format!(
            "SELECT {LIMIT_STATE_COLUMNS} FROM limit_states WHERE account_id = $1 AND operation_type = $2"
        ))
        .bind(*account_id.as_uuid())
        .bind(operation_type.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("limit_state", e))?;
        row.map(LimitState::try_from).transpose()
    }

    async fn load_or_create_limit_state(
        &mut self,
        account_id: AccountId,
        operation_type: &OperationName,
    ) -> Result<LimitState, StoreError> {
        self.ensure_locked(&RowKey::LimitState(account_id, operation_type.clone()))?;
        {
            let tx = self.conn()?;
            sqlx::query(
                r#"
                INSERT INTO limit_states (account_id, operation_type)
                VALUES ($1, $2)
                ON CONFLICT (account_id, operation_type) DO NOTHING
                "#,
            )
            .bind(*account_id.as_uuid())
            .bind(operation_type.as_str())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("create_limit_state", e))?;
        }
        self.limit_state(account_id, operation_type)
            .await?
            .ok_or_else(|| StoreError::corrupt("limit state vanished after insert"))
    }

    async fn save_limit_state(&mut self, state: &LimitState) -> Result<(), StoreError> {
        self.ensure_locked(&RowKey::LimitState(state.account_id, state.operation_type.clone()))?;
        let failed_attempts = i32::try_from(state.failed_attempts)
            .map_err(|_| StoreError::storage("failed_attempts out of range"))?;
        let tx = self.conn()?;
        sqlx::query(&format!(
            r#"
            INSERT INTO limit_states ({LIMIT_STATE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (account_id, operation_type) DO UPDATE SET
                daily_accumulated = EXCLUDED.daily_accumulated,
                monthly_accumulated = EXCLUDED.monthly_accumulated,
                last_operation_at = EXCLUDED.last_operation_at,
                is_blocked = EXCLUDED.is_blocked,
                block_expires_at = EXCLUDED.block_expires_at,
                failed_attempts = EXCLUDED.failed_attempts,
                last_failed_attempt_at = EXCLUDED.last_failed_attempt_at
            "#
        ))
        .bind(*state.account_id.as_uuid())
        .bind(state.operation_type.as_str())
        .bind(state.daily_accumulated.minor_units())
        .bind(state.monthly_accumulated.minor_units())
        .bind(state.last_operation_at)
        .bind(state.is_blocked)
        .bind(state.block_expires_at)
        .bind(failed_attempts)
        .bind(state.last_failed_attempt_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("save_limit_state", e))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::storage("unit of work already committed"))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait]
impl LedgerUnit for PgUnit {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.fetch_account(id).await
    }

    async fn increment_balance(&mut self, id: AccountId, amount: Amount) -> Result<Account, StoreError> {
        self.adjust_balance(
            id,
            "UPDATE accounts SET balance = balance + $2 WHERE id = $1 RETURNING id, balance, level",
            amount,
            "increment_balance",
        )
        .await?
        .ok_or_else(|| StoreError::storage(format!("account {id} does not exist")))
    }

    async fn decrement_balance(&mut self, id: AccountId, amount: Amount) -> Result<Account, StoreError> {
        self.adjust_balance(
            id,
            "UPDATE accounts SET balance = balance - $2 WHERE id = $1 AND balance >= $2 \
             RETURNING id, balance, level",
            amount,
            "decrement_balance",
        )
        .await?
        .ok_or_else(|| StoreError::Conflict(format!("balance of account {id} would go negative")))
    }

    async fn append_transaction(&mut self, record: &Transaction) -> Result<(), StoreError> {
        self.ensure_locked(&RowKey::Account(record.account_id))?;
        let tx = self.conn()?;
        sqlx::query(&format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(*record.id.as_uuid())
        .bind(*record.account_id.as_uuid())
        .bind(record.related_account_id.map(|id| *id.as_uuid()))
        .bind(record.kind.as_str())
        .bind(record.amount.minor_units())
        .bind(record.description.as_deref())
        .bind(record.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("append_transaction", e))?;
        Ok(())
    }
}

#[async_trait]
impl LimitsStore for PostgresStore {
    async fn begin_limits(&self, scope: Vec<RowKey>) -> Result<Box<dyn LimitsUnit>, StoreError> {
        Ok(Box::new(self.lock_rows(scope).await?))
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn begin(&self, scope: Vec<RowKey>) -> Result<Box<dyn LedgerUnit>, StoreError> {
        Ok(Box::new(self.lock_rows(scope).await?))
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT id, balance, level FROM accounts WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("account", e))?;
        row.map(Account::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(account_id = %id), err)]
    async fn history(&self, id: AccountId, filter: &HistoryFilter) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE account_id = $1
              AND ($2::text IS NULL OR kind = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(*id.as_uuid())
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.start)
        .bind(filter.end)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("history", e))?;
        rows.into_iter().map(Transaction::try_from).collect()
    }
}

#[async_trait]
impl PolicyStore for PostgresStore {
    async fn insert_operation_type(&self, operation_type: OperationType) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO operation_types (name, description, created_at) VALUES ($1, $2, $3)")
            .bind(operation_type.name.as_str())
            .bind(&operation_type.description)
            .bind(operation_type.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_operation_type", e))?;
        Ok(())
    }

    async fn operation_type(&self, name: &OperationName) -> Result<Option<OperationType>, StoreError> {
        let row = sqlx::query_as::<_, OperationTypeRow>(
            "SELECT name, description, created_at FROM operation_types WHERE name = $1",
        )
        .bind(name.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("operation_type", e))?;
        row.map(OperationType::try_from).transpose()
    }

    async fn operation_types(&self) -> Result<Vec<OperationType>, StoreError> {
        let rows = sqlx::query_as::<_, OperationTypeRow>(
            "SELECT name, description, created_at FROM operation_types ORDER BY name",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("operation_types", e))?;
        rows.into_iter().map(OperationType::try_from).collect()
    }

    async fn insert_operation_limit(&self, limit: OperationLimit) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO operation_limits (operation_type, user_level, daily_limit, monthly_limit, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(limit.operation_type.as_str())
        .bind(level_to_sql(limit.user_level)?)
        .bind(limit.daily_limit.minor_units())
        .bind(limit.monthly_limit.minor_units())
        .bind(limit.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_operation_limit", e))?;
        Ok(())
    }

    async fn operation_limit(
        &self,
        name: &OperationName,
        user_level: u32,
    ) -> Result<Option<OperationLimit>, StoreError> {
        let row = sqlx::query_as::<_, OperationLimitRow>(
            r#"
            SELECT operation_type, user_level, daily_limit, monthly_limit, updated_at
            FROM operation_limits
            WHERE operation_type = $1 AND user_level = $2
            "#,
        )
        .bind(name.as_str())
        .bind(level_to_sql(user_level)?)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("operation_limit", e))?;
        row.map(OperationLimit::try_from).transpose()
    }

    async fn operation_limits(&self) -> Result<Vec<OperationLimit>, StoreError> {
        let rows = sqlx::query_as::<_, OperationLimitRow>(
            r#"
            SELECT operation_type, user_level, daily_limit, monthly_limit, updated_at
            FROM operation_limits
            ORDER BY operation_type, user_level
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("operation_limits", e))?;
        rows.into_iter().map(OperationLimit::try_from).collect()
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique / check violation
                Some("23505") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("database unavailable in {}: {}", operation, err))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("undecodable row in {}: {}", operation, err))
        }
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn level_to_sql(level: u32) -> Result<i32, StoreError> {
    i32::try_from(level).map_err(|_| StoreError::storage(format!("user level {level} out of range")))
}

fn level_from_sql(level: i32) -> Result<u32, StoreError> {
    u32::try_from(level).map_err(|_| StoreError::corrupt(format!("negative user level {level}")))
}

fn amount_from_sql(column: &str, minor: i64) -> Result<Amount, StoreError> {
    Amount::from_minor(minor).map_err(|e| StoreError::corrupt(format!("{column}: {e}")))
}

fn name_from_sql(name: String) -> Result<OperationName, StoreError> {
    OperationName::new(name).map_err(|e| StoreError::corrupt(e.to_string()))
}

// SQLx row types

#[derive(Debug)]
struct AccountRow {
    id: Uuid,
    balance: i64,
    level: i32,
}

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            balance: row.try_get("balance")?,
            level: row.try_get("level")?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account::new(
            AccountId::from_uuid(row.id),
            amount_from_sql("balance", row.balance)?,
            level_from_sql(row.level)?,
        ))
    }
}

#[derive(Debug)]
struct OperationTypeRow {
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OperationTypeRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OperationTypeRow {
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<OperationTypeRow> for OperationType {
    type Error = StoreError;

    fn try_from(row: OperationTypeRow) -> Result<Self, Self::Error> {
        Ok(OperationType {
            name: name_from_sql(row.name)?,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct OperationLimitRow {
    operation_type: String,
    user_level: i32,
    daily_limit: i64,
    monthly_limit: i64,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OperationLimitRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OperationLimitRow {
            operation_type: row.try_get("operation_type")?,
            user_level: row.try_get("user_level")?,
            daily_limit: row.try_get("daily_limit")?,
            monthly_limit: row.try_get("monthly_limit")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<OperationLimitRow> for OperationLimit {
    type Error = StoreError;

    fn try_from(row: OperationLimitRow) -> Result<Self, Self::Error> {
        Ok(OperationLimit {
            operation_type: name_from_sql(row.operation_type)?,
            user_level: level_from_sql(row.user_level)?,
            daily_limit: amount_from_sql("daily_limit", row.daily_limit)?,
            monthly_limit: amount_from_sql("monthly_limit", row.monthly_limit)?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug)]
struct LimitStateRow {
    account_id: Uuid,
    operation_type: String,
    daily_accumulated: i64,
    monthly_accumulated: i64,
    last_operation_at: Option<DateTime<Utc>>,
    is_blocked: bool,
    block_expires_at: Option<DateTime<Utc>>,
    failed_attempts: i32,
    last_failed_attempt_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for LimitStateRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LimitStateRow {
            account_id: row.try_get("account_id")?,
            operation_type: row.try_get("operation_type")?,
            daily_accumulated: row.try_get("daily_accumulated")?,
            monthly_accumulated: row.try_get("monthly_accumulated")?,
            last_operation_at: row.try_get("last_operation_at")?,
            is_blocked: row.try_get("is_blocked")?,
            block_expires_at: row.try_get("block_expires_at")?,
            failed_attempts: row.try_get("failed_attempts")?,
            last_failed_attempt_at: row.try_get("last_failed_attempt_at")?,
        })
    }
}

impl TryFrom<LimitStateRow> for LimitState {
    type Error = StoreError;

    fn try_from(row: LimitStateRow) -> Result<Self, Self::Error> {
        Ok(LimitState {
            account_id: AccountId::from_uuid(row.account_id),
            operation_type: name_from_sql(row.operation_type)?,
            daily_accumulated: amount_from_sql("daily_accumulated", row.daily_accumulated)?,
            monthly_accumulated: amount_from_sql("monthly_accumulated", row.monthly_accumulated)?,
            last_operation_at: row.last_operation_at,
            is_blocked: row.is_blocked,
            block_expires_at: row.block_expires_at,
            failed_attempts: u32::try_from(row.failed_attempts)
                .map_err(|_| StoreError::corrupt("negative failed_attempts"))?,
            last_failed_attempt_at: row.last_failed_attempt_at,
        })
    }
}

#[derive(Debug)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    related_account_id: Option<Uuid>,
    kind: String,
    amount: i64,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TransactionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            related_account_id: row.try_get("related_account_id")?,
            kind: row.try_get("kind")?,
            amount: row.try_get("amount")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            amount: amount_from_sql("amount", row.amount)?,
            kind: row
                .kind
                .parse()
                .map_err(|e: ledgerguard_core::DomainError| StoreError::corrupt(e.to_string()))?,
            account_id: AccountId::from_uuid(row.account_id),
            related_account_id: row.related_account_id.map(AccountId::from_uuid),
            description: row.description,
            created_at: row.created_at,
        })
    }
}
