//! Utility functions and helpers
//!
//! This module contains the hashing and timestamp helpers and the
//! serialization layer used throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, sha256_digest};
pub use serialization::{deserialize, serialize};
