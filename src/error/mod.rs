//! Error handling for the ledger
//!
//! This module provides the error types for all ledger operations.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for ledger operations
#[derive(Debug, Clone)]
pub enum BlockchainError {
    /// A store already exists at the requested path
    StoreAlreadyExists(String),
    /// No store (or no chain inside it) at the requested path
    StoreNotFound(String),
    /// Database-related errors
    Database(String),
    /// The atomic block-append transaction failed; the store is unchanged
    StoreTransaction(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// A stored block could not be read back during a chain walk
    CorruptBlock(String),
    /// Transaction validation errors
    Transaction(String),
    /// Block validation errors
    InvalidBlock(String),
    /// Insufficient funds for transaction
    InsufficientFunds { required: u64, available: u64 },
    /// The nonce space was exhausted without finding an admissible hash
    MiningExhausted,
    /// File I/O errors
    Io(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::StoreAlreadyExists(path) => {
                write!(f, "Blockchain store already exists at {path}")
            }
            BlockchainError::StoreNotFound(path) => {
                write!(f, "No blockchain store found at {path}")
            }
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::StoreTransaction(msg) => {
                write!(f, "Store transaction failed: {msg}")
            }
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::CorruptBlock(msg) => write!(f, "Corrupt block: {msg}"),
            BlockchainError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::MiningExhausted => {
                write!(
                    f,
                    "Mining exhausted the nonce space without an admissible hash"
                )
            }
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}
