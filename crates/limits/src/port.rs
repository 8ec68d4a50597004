//! Storage ports for limit state.
//!
//! A [`LimitsUnit`] is one atomic unit of work. Stores must guarantee that, for the
//! rows declared when the unit began, no concurrent unit observes or overwrites the
//! unit's reads and writes (serializable isolation scoped to those rows). Writes become
//! visible only on [`LimitsUnit::commit`]; dropping a unit without committing discards
//! them.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerguard_core::{AccountId, OperationName, RowKey, StoreError};

use crate::policy::OperationLimit;
use crate::state::LimitState;

#[async_trait]
pub trait LimitsUnit: Send {
    async fn operation_type_exists(&mut self, name: &OperationName) -> Result<bool, StoreError>;

    async fn find_policy(
        &mut self,
        name: &OperationName,
        user_level: u32,
    ) -> Result<Option<OperationLimit>, StoreError>;

    /// Current state for the pair, if one was ever created.
    async fn limit_state(
        &mut self,
        account_id: AccountId,
        operation_type: &OperationName,
    ) -> Result<Option<LimitState>, StoreError>;

    /// Load the pair's state, creating a fresh one if absent.
    ///
    /// Must be idempotent under concurrent first access: two units racing on the same
    /// pair end up with one row.
    async fn load_or_create_limit_state(
        &mut self,
        account_id: AccountId,
        operation_type: &OperationName,
    ) -> Result<LimitState, StoreError>;

    async fn save_limit_state(&mut self, state: &LimitState) -> Result<(), StoreError>;

    /// Make every write of this unit visible atomically. Calling any method afterwards
    /// is an error.
    async fn commit(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LimitsStore: Send + Sync {
    /// Open a unit of work holding the given rows.
    async fn begin_limits(&self, scope: Vec<RowKey>) -> Result<Box<dyn LimitsUnit>, StoreError>;
}

#[async_trait]
impl<S> LimitsStore for Arc<S>
where
    S: LimitsStore + ?Sized,
{
    async fn begin_limits(&self, scope: Vec<RowKey>) -> Result<Box<dyn LimitsUnit>, StoreError> {
        (**self).begin_limits(scope).await
    }
}
