//! Core ledger functionality
//!
//! This module contains the fundamental components: blocks, transactions,
//! the persistent chain, and the proof-of-work admission rule.

pub mod authorization;
pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use authorization::{Authorizer, TokenAuthorizer};
pub use block::Block;
pub use blockchain::{Blockchain, BlockchainIterator};
pub use proof_of_work::{ProofOfWork, TARGET_BITS};
pub use transaction::{TXInput, TXOutput, Transaction, SUBSIDY};
