//! `ledgerguard-core`: shared building blocks for the ledger and limits engines.
//!
//! This crate contains **pure** primitives (no infrastructure concerns): identifiers,
//! fixed-point money, the clock seam, error types and row-lock keys.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod row;
pub mod value_object;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, StoreError};
pub use id::{AccountId, TransactionId};
pub use money::Amount;
pub use row::{OperationName, RowKey};
pub use value_object::ValueObject;
