//! # Ledger Chain - a minimal single-node proof-of-work ledger
//!
//! An append-only, hash-linked sequence of blocks in an embedded sled
//! store. Every block is admitted by a brute-force proof-of-work search,
//! and the transactions inside move value between addresses under the
//! UTXO model: balances are never stored, only derived by walking the
//! chain backwards from the tip.
//!
//! ## How the code is organized
//! - `core/`: blocks, transactions, the persistent chain, proof-of-work
//! - `config/`: process configuration (store location)
//! - `utils/`: hashing and serialization helpers
//! - `cli/`: command-line interface over the core operations
//!
//! ## Key design decisions
//! - Sled embedded database; block insert and tip update share one
//!   transaction so a torn append is never observable
//! - Addresses are opaque authorization tokens behind an explicit
//!   `Authorizer` seam, standing in for signature verification
//! - Difficulty is a fixed compile-time constant; the admission loop is
//!   bounded and reports exhaustion instead of spinning forever
//! - Chain walks surface corrupt blocks as errors rather than silently
//!   ending the scan early

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    Authorizer, Block, Blockchain, BlockchainIterator, ProofOfWork, TXInput, TXOutput,
    TokenAuthorizer, Transaction, SUBSIDY, TARGET_BITS,
};
pub use error::{BlockchainError, Result};
pub use utils::{current_timestamp, deserialize, serialize, sha256_digest};
