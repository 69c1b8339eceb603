//! Configuration management
//!
//! Process-level settings for the ledger, currently just the location of
//! the durable store.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
