//! Unit-of-work stores backing the registry, the limits engine and the ledger.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
