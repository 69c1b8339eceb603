//! Ledger integration tests
//!
//! Exercises the persistent chain end to end: store lifecycle, mining,
//! balance derivation, transfer scenarios, and the reverse iterator.

use ledger_chain::{Blockchain, BlockchainError, ProofOfWork, Transaction, SUBSIDY};
use tempfile::tempdir;

#[test]
fn test_genesis_block_structure() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    let mut iterator = blockchain.iterator();
    let genesis = iterator.next_block().unwrap().unwrap();
    assert!(iterator.next_block().unwrap().is_none());

    assert!(genesis.get_pre_block_hash().is_empty());
    assert_eq!(genesis.get_transactions().len(), 1);
    let coinbase = &genesis.get_transactions()[0];
    assert!(coinbase.is_coinbase());
    assert_eq!(coinbase.get_vout().len(), 1);
    assert_eq!(coinbase.get_vout()[0].get_value(), SUBSIDY);
    assert!(ProofOfWork::validate(&genesis));
}

#[test]
fn test_genesis_balances() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    assert_eq!(blockchain.get_balance("alice").unwrap(), SUBSIDY);
    assert_eq!(blockchain.get_balance("bob").unwrap(), 0);
    assert!(blockchain.find_utxo("bob").unwrap().is_empty());
}

#[test]
fn test_send_updates_balances() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    let amount = 4;
    let tx = Transaction::new_utxo_transaction("alice", "bob", amount, &blockchain).unwrap();
    assert!(!tx.is_coinbase());
    blockchain.mine_block(&[tx]).unwrap();

    assert_eq!(blockchain.get_balance("bob").unwrap(), amount);
    assert_eq!(blockchain.get_balance("alice").unwrap(), SUBSIDY - amount);

    // The genesis output was consumed whole; what alice owns now is the
    // change output, and bob owns exactly the transferred amount.
    let alice_utxos = blockchain.find_utxo("alice").unwrap();
    assert_eq!(alice_utxos.len(), 1);
    assert_eq!(alice_utxos[0].get_value(), SUBSIDY - amount);
    let bob_utxos = blockchain.find_utxo("bob").unwrap();
    assert_eq!(bob_utxos.len(), 1);
    assert_eq!(bob_utxos[0].get_value(), amount);
}

#[test]
fn test_transfer_without_change_output() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    // Spending the full subsidy produces exactly one output and no change.
    let tx = Transaction::new_utxo_transaction("alice", "bob", SUBSIDY, &blockchain).unwrap();
    assert_eq!(tx.get_vout().len(), 1);
    blockchain.mine_block(&[tx]).unwrap();

    assert_eq!(blockchain.get_balance("alice").unwrap(), 0);
    assert_eq!(blockchain.get_balance("bob").unwrap(), SUBSIDY);
}

#[test]
fn test_spend_accumulates_multiple_outputs() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    // Two more coinbase rewards leave alice with three separate outputs.
    for _ in 0..2 {
        let coinbase = Transaction::new_coinbase_tx("alice", "").unwrap();
        blockchain.mine_block(&[coinbase]).unwrap();
    }
    assert_eq!(blockchain.get_balance("alice").unwrap(), 3 * SUBSIDY);

    // An amount above any single output forces the greedy selection to
    // combine several of them.
    let amount = 2 * SUBSIDY + 5;
    let tx = Transaction::new_utxo_transaction("alice", "bob", amount, &blockchain).unwrap();
    assert!(tx.get_vin().len() >= 3);
    blockchain.mine_block(&[tx]).unwrap();

    assert_eq!(blockchain.get_balance("bob").unwrap(), amount);
    assert_eq!(blockchain.get_balance("alice").unwrap(), 3 * SUBSIDY - amount);
}

#[test]
fn test_insufficient_funds_leaves_store_unchanged() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    let result = Transaction::new_utxo_transaction("alice", "bob", SUBSIDY + 1, &blockchain);
    match result {
        Err(BlockchainError::InsufficientFunds {
            required,
            available,
        }) => {
            assert_eq!(required, SUBSIDY + 1);
            assert_eq!(available, SUBSIDY);
        }
        other => panic!("Expected InsufficientFunds, got {other:?}"),
    }

    // No block was appended and no balance moved.
    let mut iterator = blockchain.iterator();
    assert!(iterator.next_block().unwrap().is_some());
    assert!(iterator.next_block().unwrap().is_none());
    assert_eq!(blockchain.get_balance("alice").unwrap(), SUBSIDY);
    assert_eq!(blockchain.get_balance("bob").unwrap(), 0);
}

#[test]
fn test_iterator_order_and_linkage() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    let mined = 3;
    for _ in 0..mined {
        let coinbase = Transaction::new_coinbase_tx("alice", "").unwrap();
        blockchain.mine_block(&[coinbase]).unwrap();
    }

    let mut yielded = Vec::new();
    let mut iterator = blockchain.iterator();
    while let Some(block) = iterator.next_block().unwrap() {
        yielded.push(block);
    }

    assert_eq!(yielded.len(), mined + 1);
    assert_eq!(yielded[0].get_hash(), blockchain.get_tip_hash().as_slice());
    for pair in yielded.windows(2) {
        assert_eq!(pair[0].get_pre_block_hash(), pair[1].get_hash());
    }
    assert!(yielded.last().unwrap().get_pre_block_hash().is_empty());
}

#[test]
fn test_create_existing_store_fails() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();
    blockchain.close().unwrap();

    let result = Blockchain::create_blockchain_with_path("alice", &db_path);
    assert!(matches!(
        result,
        Err(BlockchainError::StoreAlreadyExists(_))
    ));
}

#[test]
fn test_open_missing_store_fails() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("does_not_exist");

    let result = Blockchain::open_with_path(&db_path);
    assert!(matches!(result, Err(BlockchainError::StoreNotFound(_))));
}

#[test]
fn test_store_persists_across_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let tip_before;
    {
        let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();
        let tx = Transaction::new_utxo_transaction("alice", "bob", 3, &blockchain).unwrap();
        blockchain.mine_block(&[tx]).unwrap();
        tip_before = blockchain.get_tip_hash();
        blockchain.close().unwrap();
    }

    let blockchain = Blockchain::open_with_path(&db_path).unwrap();
    assert_eq!(blockchain.get_tip_hash(), tip_before);
    assert_eq!(blockchain.get_balance("alice").unwrap(), SUBSIDY - 3);
    assert_eq!(blockchain.get_balance("bob").unwrap(), 3);

    // The reopened handle keeps working as an append target.
    let coinbase = Transaction::new_coinbase_tx("carol", "").unwrap();
    blockchain.mine_block(&[coinbase]).unwrap();
    assert_eq!(blockchain.get_balance("carol").unwrap(), SUBSIDY);
}

#[test]
fn test_mine_block_rejects_double_spend_within_block() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    // Both transactions were built against the same chain state, so both
    // select the one genesis output.
    let tx1 = Transaction::new_utxo_transaction("alice", "bob", 4, &blockchain).unwrap();
    let tx2 = Transaction::new_utxo_transaction("alice", "carol", 4, &blockchain).unwrap();

    assert!(blockchain.mine_block(&[tx1, tx2]).is_err());

    // The rejected batch must not have touched the chain.
    let mut iterator = blockchain.iterator();
    assert!(iterator.next_block().unwrap().is_some());
    assert!(iterator.next_block().unwrap().is_none());
}

#[test]
fn test_mine_block_rejects_already_spent_input() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();

    let tx = Transaction::new_utxo_transaction("alice", "bob", 4, &blockchain).unwrap();
    blockchain.mine_block(&[tx.clone()]).unwrap();

    // Replaying the same transaction spends an output the chain already
    // consumed.
    assert!(blockchain.mine_block(&[tx]).is_err());
    assert_eq!(blockchain.get_balance("bob").unwrap(), 4);
}

#[test]
fn test_corrupt_block_surfaces_error() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    {
        let blockchain = Blockchain::create_blockchain_with_path("alice", &db_path).unwrap();
        let coinbase = Transaction::new_coinbase_tx("alice", "").unwrap();
        blockchain.mine_block(&[coinbase]).unwrap();
        blockchain.close().unwrap();
    }

    // Clobber the tip block's stored bytes behind the ledger's back.
    {
        let db = sled::open(&db_path).unwrap();
        let tree = db.open_tree("blocksBucket").unwrap();
        let tip = tree.get("l").unwrap().unwrap();
        tree.insert(tip.as_ref(), &b"garbage"[..]).unwrap();
        tree.flush().unwrap();
    }

    let blockchain = Blockchain::open_with_path(&db_path).unwrap();
    let mut iterator = blockchain.iterator();
    match iterator.next_block() {
        Err(BlockchainError::CorruptBlock(_)) => {}
        other => panic!("Expected CorruptBlock, got {other:?}"),
    }
}
