//! Operation types and the per-level limit policies attached to them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use ledgerguard_core::{Amount, Clock, DomainError, OperationName, StoreError};

use crate::error::LimitsError;

/// Named category of money movement. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationType {
    pub name: OperationName,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// The (daily, monthly) limit pair for an (operation type, user level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLimit {
    pub operation_type: OperationName,
    pub user_level: u32,
    pub daily_limit: Amount,
    pub monthly_limit: Amount,
    pub updated_at: DateTime<Utc>,
}

/// Persistence for operation types and limits.
///
/// Inserts must enforce uniqueness (name; (type, level)) and report a duplicate as
/// [`StoreError::Conflict`], so the registry stays correct when two administrators race.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn insert_operation_type(&self, operation_type: OperationType) -> Result<(), StoreError>;

    async fn operation_type(&self, name: &OperationName) -> Result<Option<OperationType>, StoreError>;

    async fn operation_types(&self) -> Result<Vec<OperationType>, StoreError>;

    async fn insert_operation_limit(&self, limit: OperationLimit) -> Result<(), StoreError>;

    async fn operation_limit(
        &self,
        name: &OperationName,
        user_level: u32,
    ) -> Result<Option<OperationLimit>, StoreError>;

    async fn operation_limits(&self) -> Result<Vec<OperationLimit>, StoreError>;
}

#[async_trait]
impl<S> PolicyStore for Arc<S>
where
    S: PolicyStore + ?Sized,
{
    async fn insert_operation_type(&self, operation_type: OperationType) -> Result<(), StoreError> {
        (**self).insert_operation_type(operation_type).await
    }

    async fn operation_type(&self, name: &OperationName) -> Result<Option<OperationType>, StoreError> {
        (**self).operation_type(name).await
    }

    async fn operation_types(&self) -> Result<Vec<OperationType>, StoreError> {
        (**self).operation_types().await
    }

    async fn insert_operation_limit(&self, limit: OperationLimit) -> Result<(), StoreError> {
        (**self).insert_operation_limit(limit).await
    }

    async fn operation_limit(
        &self,
        name: &OperationName,
        user_level: u32,
    ) -> Result<Option<OperationLimit>, StoreError> {
        (**self).operation_limit(name, user_level).await
    }

    async fn operation_limits(&self) -> Result<Vec<OperationLimit>, StoreError> {
        (**self).operation_limits().await
    }
}

/// Administrative registry of operation types and limit policies.
pub struct OperationPolicyRegistry<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: PolicyStore> OperationPolicyRegistry<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self, description), fields(operation_type = %name), err)]
    pub async fn register_operation_type(
        &self,
        name: OperationName,
        description: impl Into<String> + Send,
    ) -> Result<OperationType, LimitsError> {
        if self.store.operation_type(&name).await?.is_some() {
            return Err(duplicate_type(&name).into());
        }

        let operation_type = OperationType {
            name,
            description: description.into(),
            created_at: self.clock.now(),
        };
        self.store
            .insert_operation_type(operation_type.clone())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => LimitsError::from(duplicate_type(&operation_type.name)),
                other => LimitsError::from(other),
            })?;

        info!("operation type registered");
        Ok(operation_type)
    }

    #[instrument(skip(self), fields(operation_type = %operation_type), err)]
    pub async fn register_limit(
        &self,
        operation_type: OperationName,
        user_level: u32,
        daily_limit: Amount,
        monthly_limit: Amount,
    ) -> Result<OperationLimit, LimitsError> {
        if user_level == 0 {
            return Err(DomainError::invalid("user level must be at least 1").into());
        }
        daily_limit.ensure_positive("daily limit")?;
        monthly_limit.ensure_positive("monthly limit")?;

        if self.store.operation_type(&operation_type).await?.is_none() {
            return Err(DomainError::not_found(format!("operation type {operation_type}")).into());
        }
        if self
            .store
            .operation_limit(&operation_type, user_level)
            .await?
            .is_some()
        {
            return Err(duplicate_limit(&operation_type, user_level).into());
        }

        let limit = OperationLimit {
            operation_type,
            user_level,
            daily_limit,
            monthly_limit,
            updated_at: self.clock.now(),
        };
        self.store
            .insert_operation_limit(limit.clone())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => LimitsError::from(duplicate_limit(&limit.operation_type, user_level)),
                other => LimitsError::from(other),
            })?;

        info!(user_level, %daily_limit, %monthly_limit, "operation limit registered");
        Ok(limit)
    }

    pub async fn find_policy(
        &self,
        operation_type: &OperationName,
        user_level: u32,
    ) -> Result<Option<OperationLimit>, LimitsError> {
        Ok(self.store.operation_limit(operation_type, user_level).await?)
    }

    pub async fn operation_types(&self) -> Result<Vec<OperationType>, LimitsError> {
        Ok(self.store.operation_types().await?)
    }

    pub async fn operation_limits(&self) -> Result<Vec<OperationLimit>, LimitsError> {
        Ok(self.store.operation_limits().await?)
    }
}

fn duplicate_type(name: &OperationName) -> DomainError {
    DomainError::conflict(format!("operation type {name} already exists"))
}

fn duplicate_limit(name: &OperationName, user_level: u32) -> DomainError {
    DomainError::conflict(format!(
        "limit for operation {name} and level {user_level} already exists"
    ))
}
