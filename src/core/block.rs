use crate::core::{ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use log::info;
use serde::{Deserialize, Serialize};

/// One link of the chain. Constructed once by mining, immutable afterwards,
/// persisted exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    timestamp: i64,
    transactions: Vec<Transaction>,
    pre_block_hash: Vec<u8>, // empty only for the genesis block
    hash: Vec<u8>,
    nonce: i64,
}

impl Block {
    /// Assembles the candidate fields and mines until the proof-of-work
    /// admits the block. Blocks the caller for the whole search.
    pub fn new_block(transactions: &[Transaction], pre_block_hash: &[u8]) -> Result<Block> {
        if transactions.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let mut block = Block {
            timestamp: current_timestamp()?,
            transactions: transactions.to_vec(),
            pre_block_hash: pre_block_hash.to_vec(),
            hash: vec![],
            nonce: 0,
        };

        let pow = ProofOfWork::new_proof_of_work(block.clone());
        let (nonce, hash) = pow.run()?;
        block.nonce = nonce;
        block.hash = hash;
        info!(
            "Proof-of-work completed for block with {} transaction(s)",
            transactions.len()
        );

        Ok(block)
    }

    pub fn generate_genesis_block(coinbase: &Transaction) -> Result<Block> {
        Block::new_block(&[coinbase.clone()], &[])
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    /// Genesis is the only block without a predecessor.
    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    /// Flat digest over the transaction ids in list order. Not a merkle
    /// tree; the whole list re-hashes as one unit.
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut tx_ids = vec![];
        for transaction in &self.transactions {
            tx_ids.extend(transaction.get_id());
        }
        sha256_digest(tx_ids.as_slice())
    }

    /// Tampered copy for tests; mined blocks are never mutated otherwise.
    #[cfg(test)]
    pub fn with_nonce(&self, nonce: i64) -> Block {
        let mut block = self.clone();
        block.nonce = nonce;
        block
    }

    #[cfg(test)]
    pub fn with_transactions(&self, transactions: Vec<Transaction>) -> Block {
        let mut block = self.clone();
        block.transactions = transactions;
        block
    }
}
