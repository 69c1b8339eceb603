// This file implements the transaction system - the core of how value moves
// through the ledger. Every transaction consumes previous outputs and creates
// new ones; balances only ever exist as the sum of unspent outputs.

use crate::core::{authorization, Blockchain};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Value minted by every coinbase transaction.
pub const SUBSIDY: u64 = 10;

// Output index carried by the synthetic coinbase input. Never a valid index.
const COINBASE_VOUT: i64 = -1;

// A transaction input references a previous transaction output:
// "spend output #vout of transaction txid".
#[derive(Debug, Clone, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TXInput {
    txid: Vec<u8>,        // id of the transaction containing the referenced output
    vout: i64,            // index of the output in that transaction, -1 for coinbase
    unlock_proof: String, // token proving the right to spend the referenced output
}

impl TXInput {
    pub fn new(txid: &[u8], vout: i64, unlock_proof: &str) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout,
            unlock_proof: unlock_proof.to_string(),
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    pub fn get_unlock_proof(&self) -> &str {
        self.unlock_proof.as_str()
    }

    /// Whether this input was spent by `address`.
    pub fn can_unlock_output_with(&self, address: &str) -> bool {
        authorization::verify(self.unlock_proof.as_str(), address)
    }
}

// A transaction output holds value locked to a token. It stays spendable
// until some later input references it by (txid, index).
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TXOutput {
    value: u64,             // how much value this output is worth
    lock_condition: String, // token that must be presented to spend it
}

impl TXOutput {
    pub fn new(value: u64, to: &str) -> Result<TXOutput> {
        if value == 0 {
            return Err(BlockchainError::Transaction(
                "Output value must be positive".to_string(),
            ));
        }

        Ok(TXOutput {
            value,
            lock_condition: to.to_string(),
        })
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_lock_condition(&self) -> &str {
        self.lock_condition.as_str()
    }

    /// Whether `address` may spend this output.
    pub fn can_be_unlocked_with(&self, address: &str) -> bool {
        authorization::verify(address, self.lock_condition.as_str())
    }
}

// A transfer of value: inputs consume previous outputs, outputs lock the
// value to new owners. The id is the hash of everything but itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    // A coinbase transaction mints SUBSIDY out of nothing: its single input
    // references no output. The note doubles as the unlock proof slot; an
    // empty note gets a random filler so repeated rewards to one address
    // do not hash to the same transaction id.
    pub fn new_coinbase_tx(to: &str, note: &str) -> Result<Transaction> {
        let unlock_proof = if note.is_empty() {
            format!("Reward to '{to}' / {}", Uuid::new_v4())
        } else {
            note.to_string()
        };

        let tx_input = TXInput {
            txid: vec![],
            vout: COINBASE_VOUT,
            unlock_proof,
        };
        let tx_output = TXOutput::new(SUBSIDY, to)?;

        let mut tx = Transaction {
            id: vec![],
            vin: vec![tx_input],
            vout: vec![tx_output],
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    // Builds a transfer of `amount` from one address to another by greedily
    // consuming the sender's unspent outputs. Fails before touching anything
    // if the sender cannot cover the amount.
    pub fn new_utxo_transaction(
        from: &str,
        to: &str,
        amount: u64,
        blockchain: &Blockchain,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::Transaction(
                "Amount must be positive".to_string(),
            ));
        }

        let (accumulated, valid_outputs) = blockchain.find_spendable_outputs(from, amount)?;
        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = vec![];
        for (txid_hex, outs) in valid_outputs {
            let txid = HEXLOWER.decode(txid_hex.as_bytes()).map_err(|e| {
                BlockchainError::Transaction(format!("Invalid transaction ID: {e}"))
            })?;
            for out in outs {
                inputs.push(TXInput::new(txid.as_slice(), out as i64, from));
            }
        }

        let mut outputs = vec![TXOutput::new(amount, to)?];
        if accumulated > amount {
            // Change flows back to the sender as a fresh output.
            outputs.push(TXOutput::new(accumulated - amount, from)?);
        }

        let mut tx = Transaction {
            id: vec![],
            vin: inputs,
            vout: outputs,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// A coinbase transaction has exactly one input carrying the sentinel
    /// reference: empty txid, output index -1.
    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty() && self.vin[0].vout == COINBASE_VOUT
    }

    // The id is computed over a copy whose own id field is empty.
    fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
        };
        let serialized = tx_copy.serialize()?;
        Ok(sha256_digest(&serialized))
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    /// Sum of all output values.
    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for vout in &self.vout {
            total = total
                .checked_add(vout.get_value())
                .ok_or_else(|| BlockchainError::Transaction("Output value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}
