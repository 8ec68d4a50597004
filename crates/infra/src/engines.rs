//! Start-up composition: one store handle shared by the registry, the limits engine
//! and the ledger engine.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use ledgerguard_core::Clock;
use ledgerguard_ledger::{LedgerEngine, LedgerStore};
use ledgerguard_limits::{LimitsEngine, OperationPolicyRegistry, PolicyStore};

use crate::config::{ConfigError, ENV_DATABASE_URL, EngineConfig};
use crate::store::{InMemoryStore, PostgresStore};

pub struct Engines<S> {
    store: S,
    registry: OperationPolicyRegistry<S>,
    ledger: LedgerEngine<S>,
}

impl<S> Engines<S>
where
    S: LedgerStore + PolicyStore + Clone,
{
    pub fn assemble(store: S, clock: Arc<dyn Clock>, config: &EngineConfig) -> Result<Self, ConfigError> {
        let settings = config.limits_settings()?;
        let operations = config.ledger_operations()?;
        info!(
            max_failed_attempts = settings.max_failed_attempts,
            attempt_window_hours = config.attempt_window_hours,
            calendar = %settings.calendar,
            deposit_operation = %operations.deposit,
            transfer_operation = %operations.transfer,
            "engines configured"
        );

        let limits = LimitsEngine::new(store.clone(), Arc::clone(&clock), settings);
        let ledger = LedgerEngine::new(store.clone(), limits, Arc::clone(&clock), operations);
        let registry = OperationPolicyRegistry::new(store.clone(), clock);
        Ok(Self {
            store,
            registry,
            ledger,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &OperationPolicyRegistry<S> {
        &self.registry
    }

    pub fn limits(&self) -> &LimitsEngine<S> {
        self.ledger.limits()
    }

    pub fn ledger(&self) -> &LedgerEngine<S> {
        &self.ledger
    }
}

impl Engines<InMemoryStore> {
    pub fn in_memory(config: &EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        Self::assemble(InMemoryStore::new(), clock, config)
    }
}

impl Engines<PostgresStore> {
    /// Connect to `database_url`, create the schema if needed and compose the engines.
    pub async fn postgres(config: &EngineConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_DATABASE_URL))?;
        let store = PostgresStore::connect(url, config.db_max_connections)
            .await
            .context("connecting to postgres")?;
        store.migrate().await.context("applying ledger schema")?;
        Ok(Self::assemble(store, clock, config)?)
    }
}
