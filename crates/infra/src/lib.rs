//! Infrastructure layer: stores, configuration and start-up composition.

pub mod config;
pub mod engines;
pub mod store;

pub use config::{ConfigError, EngineConfig};
pub use engines::Engines;
pub use store::{InMemoryStore, PostgresStore};
