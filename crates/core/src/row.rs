//! Row keys a unit of work declares before it starts.
//!
//! Stores lock exactly the declared rows, in `Ord` order, for the lifetime of the unit.
//! Units over disjoint rows never wait on each other.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::AccountId;

/// Name of an operation type (e.g. `DEPOSIT`, `TRANSFER`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationName(String);

impl OperationName {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid("operation type name must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// For compile-time names known to be non-empty.
    pub fn from_static(name: &'static str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OperationName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OperationName::new(value)
    }
}

impl From<OperationName> for String {
    fn from(value: OperationName) -> Self {
        value.0
    }
}

/// A lockable row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    Account(AccountId),
    LimitState(AccountId, OperationName),
}

impl RowKey {
    /// Sort and deduplicate a lock scope into canonical acquisition order.
    pub fn canonical(mut keys: Vec<RowKey>) -> Vec<RowKey> {
        keys.sort();
        keys.dedup();
        keys
    }
}
