use thiserror::Error;

use ledgerguard_core::{DomainError, OperationName, StoreError};

/// Failure of a limits or policy operation.
///
/// Denials are *not* errors; they come back as [`crate::LimitCheckResult`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimitsError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// No policy exists for an operation type in active use. The engine cannot guess a
    /// default limit, so this is fatal for the request.
    #[error("no limits configured for operation {operation_type} at level {user_level}")]
    MissingPolicy {
        operation_type: OperationName,
        user_level: u32,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
