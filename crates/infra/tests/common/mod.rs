//! Shared fixtures: in-memory engines on a manual clock, UTC calendar.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use ledgerguard_core::{Amount, ManualClock, OperationName};
use ledgerguard_infra::{EngineConfig, Engines, InMemoryStore};
use ledgerguard_ledger::Account;

pub struct Harness {
    pub engines: Engines<InMemoryStore>,
    pub clock: Arc<ManualClock>,
}

/// Wednesday 2024-03-13 09:00 UTC.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 13, 9, 0, 0).unwrap()
}

pub fn units(n: u32) -> Amount {
    Amount::from_units(n)
}

pub fn op(name: &str) -> OperationName {
    OperationName::new(name).unwrap()
}

pub fn harness_with(config: EngineConfig) -> Harness {
    ledgerguard_observability::init_for_tests();
    let clock = Arc::new(ManualClock::new(start()));
    let engines = Engines::in_memory(&config.with_utc_offset_minutes(0), clock.clone()).unwrap();
    Harness { engines, clock }
}

/// DEPOSIT and TRANSFER registered; level 1 limits are daily 1000 / monthly 5000 for both.
pub async fn harness() -> Harness {
    let h = harness_with(EngineConfig::default());
    for name in ["DEPOSIT", "TRANSFER"] {
        h.register(name, 1, 1000, 5000).await;
    }
    h
}

impl Harness {
    pub async fn register(&self, name: &str, level: u32, daily: u32, monthly: u32) {
        let registry = self.engines.registry();
        if registry
            .operation_types()
            .await
            .unwrap()
            .iter()
            .all(|t| t.name.as_str() != name)
        {
            registry
                .register_operation_type(op(name), format!("{name} operations"))
                .await
                .unwrap();
        }
        registry
            .register_limit(op(name), level, units(daily), units(monthly))
            .await
            .unwrap();
    }

    pub fn account(&self, balance: u32) -> Account {
        self.engines.store().open_account(units(balance), 1).unwrap()
    }

    pub async fn balance(&self, account: &Account) -> Amount {
        self.engines.ledger().account(account.id).await.unwrap().balance
    }
}
