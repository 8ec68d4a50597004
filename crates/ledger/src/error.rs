use chrono::{DateTime, Utc};
use thiserror::Error;

use ledgerguard_core::{AccountId, Amount, DomainError, StoreError};
use ledgerguard_limits::{LimitCheckResult, LimitsError};

/// Why a ledger operation did not happen.
///
/// Whatever the variant, no balance was changed and no transaction was recorded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Amount, requested: Amount },

    /// Soft denial: the failure was counted, the account is not blocked.
    #[error("{reason}")]
    LimitExceeded { reason: String },

    /// Hard denial: a lockout is in force until `next_reset`.
    #[error("{reason} (until {next_reset})")]
    Blocked {
        reason: String,
        next_reset: DateTime<Utc>,
    },

    /// The limits policy needed for this request is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn account_not_found(id: AccountId) -> Self {
        Self::NotFound(format!("account {id}"))
    }

    /// The typed failure for a denied limit check; `None` when it was allowed.
    pub fn from_denial(result: LimitCheckResult) -> Option<Self> {
        match result {
            LimitCheckResult::Allowed => None,
            LimitCheckResult::LimitExceeded { reason } => Some(Self::LimitExceeded { reason }),
            LimitCheckResult::Blocked { reason, next_reset } => Some(Self::Blocked { reason, next_reset }),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound(msg) => LedgerError::NotFound(msg),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
            DomainError::InvalidOperation(msg) => LedgerError::InvalidOperation(msg),
        }
    }
}

impl From<LimitsError> for LedgerError {
    fn from(value: LimitsError) -> Self {
        match value {
            LimitsError::Domain(e) => e.into(),
            e @ LimitsError::MissingPolicy { .. } => LedgerError::Configuration(e.to_string()),
            LimitsError::Store(e) => LedgerError::Store(e),
        }
    }
}
