use serde::{Deserialize, Serialize};

use ledgerguard_core::{AccountId, Amount, Entity};

/// Balance holder as seen by the ledger.
///
/// Accounts are registered elsewhere; the ledger only reads them and moves their
/// balance inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Amount,
    /// Limit tier (1 = lowest).
    pub level: u32,
}

impl Account {
    pub fn new(id: AccountId, balance: Amount, level: u32) -> Self {
        Self { id, balance, level }
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
