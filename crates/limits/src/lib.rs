//! Per-account, per-operation usage limits with progressive lockout.
//!
//! - [`OperationPolicyRegistry`] owns operation types and their (daily, monthly) limits
//!   per user level.
//! - [`LimitsEngine`] runs the Active/Blocked state machine for every
//!   (account, operation type) pair.
//!
//! Storage is reached only through the ports in [`port`]; no IO happens here.

pub mod calendar;
pub mod engine;
pub mod error;
pub mod policy;
pub mod port;
pub mod state;

pub use calendar::{Calendar, end_of_month, next_midnight};
pub use engine::{LimitsEngine, LimitsSettings};
pub use error::LimitsError;
pub use policy::{OperationLimit, OperationPolicyRegistry, OperationType, PolicyStore};
pub use port::{LimitsStore, LimitsUnit};
pub use state::{LimitCheckResult, LimitState, LimitStateView, LimitStatus};

/// Well-known operation type names.
pub mod operations {
    pub const DEPOSIT: &str = "DEPOSIT";
    pub const TRANSFER: &str = "TRANSFER";
    pub const TRANSFER_SENT: &str = "TRANSFER_SENT";
    pub const TRANSFER_RECEIVED: &str = "TRANSFER_RECEIVED";
}
