// This is the core ledger implementation - the persistent hash-linked chain.
// Sled provides the embedded store: one tree holds every block keyed by its
// hash, plus a single reserved key pointing at the current tip. Balances are
// never stored; they are derived by walking the chain backwards.

use crate::config::GLOBAL_CONFIG;
use crate::core::{authorization, Block, TXOutput, Transaction};
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use log::info;
use sled::{Db, Tree};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

// Durable layout: block hash -> serialized block, and the reserved tip key
// inside the same tree.
const BLOCKS_TREE: &str = "blocksBucket";
const TIP_BLOCK_HASH_KEY: &str = "l";

/// Handle to the durable chain. The tip lives in the handle, so independent
/// instances (and tests) never share state through globals.
#[derive(Clone)]
pub struct Blockchain {
    tip_hash: Arc<RwLock<Vec<u8>>>, // hash of the most recent block
    db: Db,
}

impl Blockchain {
    /// Create a brand new chain with a genesis block at the default path.
    pub fn create_blockchain(genesis_address: &str) -> Result<Blockchain> {
        Self::create_blockchain_with_path(genesis_address, &Self::default_db_path())
    }

    /// Open the existing chain at the default path.
    pub fn open() -> Result<Blockchain> {
        Self::open_with_path(&Self::default_db_path())
    }

    fn default_db_path() -> PathBuf {
        PathBuf::from(GLOBAL_CONFIG.get_data_dir())
    }

    // Creating a chain where one already lives is a lifecycle error, never
    // a silent reopen.
    pub fn create_blockchain_with_path(genesis_address: &str, db_path: &Path) -> Result<Blockchain> {
        if db_path.exists() {
            return Err(BlockchainError::StoreAlreadyExists(
                db_path.display().to_string(),
            ));
        }

        let db = sled::open(db_path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks_tree = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;

        info!("Creating genesis block for address: {genesis_address}");
        let coinbase_tx = Transaction::new_coinbase_tx(genesis_address, "")?;
        let genesis = Block::generate_genesis_block(&coinbase_tx)?;
        Self::update_blocks_tree(&blocks_tree, &genesis)?;

        Ok(Blockchain {
            tip_hash: Arc::new(RwLock::new(genesis.get_hash().to_vec())),
            db,
        })
    }

    pub fn open_with_path(db_path: &Path) -> Result<Blockchain> {
        if !db_path.exists() {
            return Err(BlockchainError::StoreNotFound(
                db_path.display().to_string(),
            ));
        }

        let db = sled::open(db_path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks_tree = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;

        let tip_bytes = blocks_tree
            .get(TIP_BLOCK_HASH_KEY)
            .map_err(|e| BlockchainError::Database(format!("Failed to get tip hash: {e}")))?
            .ok_or_else(|| BlockchainError::StoreNotFound(db_path.display().to_string()))?;

        Ok(Blockchain {
            tip_hash: Arc::new(RwLock::new(tip_bytes.to_vec())),
            db,
        })
    }

    // Both writes land in one sled transaction: a block is never observable
    // without its tip update, and the other way around.
    fn update_blocks_tree(blocks_tree: &Tree, block: &Block) -> Result<()> {
        let block_data = block.serialize()?;

        blocks_tree
            .transaction(|tx_db| {
                tx_db.insert(block.get_hash(), block_data.as_slice())?;
                tx_db.insert(TIP_BLOCK_HASH_KEY, block.get_hash())?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                BlockchainError::StoreTransaction(format!("Failed to append block: {e}"))
            })?;

        Ok(())
    }

    pub fn get_tip_hash(&self) -> Vec<u8> {
        self.tip_hash
            .read()
            .expect("Failed to acquire read lock on tip_hash - this should never happen")
            .clone()
    }

    fn set_tip_hash(&self, new_tip_hash: &[u8]) {
        let mut tip_hash = self
            .tip_hash
            .write()
            .expect("Failed to acquire write lock on tip_hash - this should never happen");
        *tip_hash = new_tip_hash.to_vec();
    }

    // Mining is the only append path: verify the batch against the chain,
    // run the proof-of-work (this blocks), then append atomically.
    pub fn mine_block(&self, transactions: &[Transaction]) -> Result<Block> {
        for (i, transaction) in transactions.iter().enumerate() {
            self.verify_transaction(transaction).map_err(|e| {
                BlockchainError::Transaction(format!("Invalid transaction at index {i}: {e}"))
            })?;
        }
        self.check_for_double_spending(transactions)?;

        let block = Block::new_block(transactions, &self.get_tip_hash())?;

        let blocks_tree = self
            .db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        Self::update_blocks_tree(&blocks_tree, &block)?;
        self.set_tip_hash(block.get_hash());

        info!(
            "Successfully mined block: {}",
            HEXLOWER.encode(block.get_hash())
        );
        Ok(block)
    }

    /// Cursor over the chain from the current tip back to genesis. Each
    /// iterator is single-pass; a new call reflects the tip at that time.
    pub fn iterator(&self) -> BlockchainIterator {
        BlockchainIterator::new(self.get_tip_hash(), self.db.clone())
    }

    /// Look a transaction up by id, newest block first.
    pub fn find_transaction(&self, txid: &[u8]) -> Result<Option<Transaction>> {
        let mut iterator = self.iterator();
        while let Some(block) = iterator.next_block()? {
            for transaction in block.get_transactions() {
                if txid.eq(transaction.get_id()) {
                    return Ok(Some(transaction.clone()));
                }
            }
        }
        Ok(None)
    }

    // Walk tip-to-genesis collecting every transaction that still holds
    // value spendable by `address`. One spent-set accumulates across the
    // whole walk: a newer block's inputs are registered before the older
    // outputs they consume come up for evaluation, so a block's position
    // in the walk is what makes the derivation correct.
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        let mut unspent_txs: Vec<Transaction> = vec![];
        let mut spent_txos: HashMap<String, Vec<i64>> = HashMap::new();

        let mut iterator = self.iterator();
        while let Some(block) = iterator.next_block()? {
            for tx in block.get_transactions() {
                let txid_hex = HEXLOWER.encode(tx.get_id());

                let mut recorded = false;
                'outputs: for (idx, out) in tx.get_vout().iter().enumerate() {
                    if let Some(spent_outs) = spent_txos.get(txid_hex.as_str()) {
                        for spent_out_idx in spent_outs {
                            if *spent_out_idx == idx as i64 {
                                continue 'outputs;
                            }
                        }
                    }
                    if out.can_be_unlocked_with(address) && !recorded {
                        unspent_txs.push(tx.clone());
                        recorded = true;
                    }
                }

                // Coinbase inputs reference nothing, so they never spend.
                if !tx.is_coinbase() {
                    for txin in tx.get_vin() {
                        if txin.can_unlock_output_with(address) {
                            let in_txid_hex = HEXLOWER.encode(txin.get_txid());
                            spent_txos
                                .entry(in_txid_hex)
                                .or_default()
                                .push(txin.get_vout());
                        }
                    }
                }
            }
        }

        Ok(unspent_txs)
    }

    /// All outputs spendable by `address`.
    pub fn find_utxo(&self, address: &str) -> Result<Vec<TXOutput>> {
        let mut utxos = vec![];
        for tx in self.find_unspent_transactions(address)? {
            for out in tx.get_vout() {
                if out.can_be_unlocked_with(address) {
                    utxos.push(out.clone());
                }
            }
        }
        Ok(utxos)
    }

    /// Balance = sum of the values of all spendable outputs.
    pub fn get_balance(&self, address: &str) -> Result<u64> {
        let mut balance = 0u64;
        for utxo in self.find_utxo(address)? {
            balance = balance
                .checked_add(utxo.get_value())
                .ok_or_else(|| BlockchainError::Transaction("Balance overflow".to_string()))?;
        }
        Ok(balance)
    }

    // Greedy selection for a new spend: accumulate unspent outputs owned by
    // `address`, in scan order, until the amount is covered or the outputs
    // run out. The caller decides what an uncovered amount means.
    pub fn find_spendable_outputs(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<(u64, HashMap<String, Vec<usize>>)> {
        let mut unspent_outputs: HashMap<String, Vec<usize>> = HashMap::new();
        let mut accumulated = 0u64;

        for tx in self.find_unspent_transactions(address)? {
            let txid_hex = HEXLOWER.encode(tx.get_id());
            for (idx, out) in tx.get_vout().iter().enumerate() {
                if out.can_be_unlocked_with(address) && accumulated < amount {
                    accumulated += out.get_value();
                    unspent_outputs.entry(txid_hex.clone()).or_default().push(idx);

                    if accumulated >= amount {
                        break;
                    }
                }
            }
        }

        Ok((accumulated, unspent_outputs))
    }

    /// Whether some block already spends output `vout` of transaction `txid`.
    pub fn is_output_spent(&self, txid: &[u8], vout: i64) -> Result<bool> {
        let mut iterator = self.iterator();
        while let Some(block) = iterator.next_block()? {
            for transaction in block.get_transactions() {
                if transaction.is_coinbase() {
                    continue;
                }
                for input in transaction.get_vin() {
                    if input.get_txid() == txid && input.get_vout() == vout {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    // Full chain-level check of one transaction: every input must reference
    // an existing, authorized, still-unspent output, and no value may be
    // created or destroyed.
    pub fn verify_transaction(&self, transaction: &Transaction) -> Result<()> {
        if transaction.is_coinbase() {
            if transaction.get_vout().is_empty() {
                return Err(BlockchainError::Transaction(
                    "Coinbase transaction must have at least one output".to_string(),
                ));
            }
            return Ok(());
        }

        let mut input_value = 0u64;
        for input in transaction.get_vin() {
            if input.get_vout() < 0 {
                return Err(BlockchainError::Transaction(
                    "Negative output index outside a coinbase input".to_string(),
                ));
            }

            let prev_tx = self.find_transaction(input.get_txid())?.ok_or_else(|| {
                BlockchainError::Transaction(format!(
                    "Referenced transaction not found: {}",
                    HEXLOWER.encode(input.get_txid())
                ))
            })?;

            let out_idx = input.get_vout() as usize;
            let prev_out = prev_tx.get_vout().get(out_idx).ok_or_else(|| {
                BlockchainError::Transaction(format!(
                    "Output index {out_idx} out of range for referenced transaction"
                ))
            })?;

            if !authorization::verify(input.get_unlock_proof(), prev_out.get_lock_condition()) {
                return Err(BlockchainError::Transaction(format!(
                    "Input not authorized to spend {}:{}",
                    HEXLOWER.encode(input.get_txid()),
                    out_idx
                )));
            }

            if self.is_output_spent(input.get_txid(), input.get_vout())? {
                return Err(BlockchainError::Transaction(format!(
                    "Input already spent: {}:{}",
                    HEXLOWER.encode(input.get_txid()),
                    out_idx
                )));
            }

            input_value = input_value
                .checked_add(prev_out.get_value())
                .ok_or_else(|| BlockchainError::Transaction("Input value overflow".to_string()))?;
        }

        let output_value = transaction.get_output_value()?;
        if input_value != output_value {
            return Err(BlockchainError::Transaction(format!(
                "Value mismatch: inputs {input_value}, outputs {output_value}"
            )));
        }

        Ok(())
    }

    // The same unspent output must not be consumed twice within one batch;
    // the per-transaction check above cannot see siblings.
    fn check_for_double_spending(&self, transactions: &[Transaction]) -> Result<()> {
        let mut spent_outputs: HashSet<(Vec<u8>, i64)> = HashSet::new();

        for (tx_index, transaction) in transactions.iter().enumerate() {
            if transaction.is_coinbase() {
                continue;
            }

            for input in transaction.get_vin() {
                let output_reference = (input.get_txid().to_vec(), input.get_vout());
                if !spent_outputs.insert(output_reference) {
                    return Err(BlockchainError::Transaction(format!(
                        "Double spend in transaction {}: output {}:{} already consumed in this block",
                        tx_index,
                        HEXLOWER.encode(input.get_txid()),
                        input.get_vout()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Flush and release this handle. Dropping releases the store lock on
    /// every exit path; closing additionally forces the flush.
    pub fn close(self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| BlockchainError::Database(format!("Failed to flush store: {e}")))?;
        Ok(())
    }
}

/// Backward cursor over the chain: newest to oldest, ending after genesis.
pub struct BlockchainIterator {
    db: Db,
    current_hash: Vec<u8>,
}

impl BlockchainIterator {
    fn new(tip_hash: Vec<u8>, db: Db) -> BlockchainIterator {
        BlockchainIterator {
            current_hash: tip_hash,
            db,
        }
    }

    /// Fetch the block at the cursor and step to its predecessor. Returns
    /// `Ok(None)` once genesis has been yielded. A block that is missing or
    /// fails to decode surfaces as `CorruptBlock` - the walk never truncates
    /// silently.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.current_hash.is_empty() {
            return Ok(None);
        }

        let blocks_tree = self
            .db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        let data = blocks_tree
            .get(self.current_hash.as_slice())
            .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?
            .ok_or_else(|| {
                BlockchainError::CorruptBlock(format!(
                    "Chain references missing block {}",
                    HEXLOWER.encode(self.current_hash.as_slice())
                ))
            })?;

        let block = Block::deserialize(data.as_ref()).map_err(|e| {
            BlockchainError::CorruptBlock(format!(
                "Failed to decode block {}: {e}",
                HEXLOWER.encode(self.current_hash.as_slice())
            ))
        })?;

        self.current_hash = block.get_pre_block_hash().to_vec();
        Ok(Some(block))
    }
}

impl Iterator for BlockchainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}
