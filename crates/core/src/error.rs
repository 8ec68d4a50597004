//! Error model shared by every layer.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business failures (missing records, duplicates,
/// rejected inputs). Storage concerns belong in [`StoreError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced record (account, operation type, policy) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness rule was violated (duplicate operation type or policy).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request can never succeed as given (self-transfer, non-positive amount).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

/// Storage operation error.
///
/// These are **infrastructure errors** raised by a store adapter, as opposed to domain
/// errors. Any of them aborts the enclosing unit of work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was hit or a concurrent writer won a race.
    #[error("store conflict: {0}")]
    Conflict(String),

    /// The backend is unreachable or the pool is closed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A persisted row could not be decoded into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Any other backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}
