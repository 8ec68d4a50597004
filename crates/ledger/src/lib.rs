//! Ledger engine: atomic balance mutation plus an append-only transaction log.
//!
//! Every deposit and transfer consults the limits engine inside the same unit of work
//! that moves the money; nothing here performs IO directly.

pub mod account;
pub mod engine;
pub mod error;
pub mod port;
pub mod transaction;

pub use account::Account;
pub use engine::{LedgerEngine, LedgerOperations};
pub use error::LedgerError;
pub use port::{LedgerStore, LedgerUnit};
pub use transaction::{HistoryFilter, Transaction, TransactionKind, TransferReceipt};
