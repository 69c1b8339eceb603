// This is the main entry point for the ledger CLI application.
use clap::Parser;
use data_encoding::HEXLOWER;
use ledger_chain::{Blockchain, Command, Opt, ProofOfWork, Transaction};
use log::{error, LevelFilter};
use std::process;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        // Genesis creation: the address collects the first subsidy.
        Command::Createblockchain { address } => {
            let blockchain = Blockchain::create_blockchain(&address)?;
            blockchain.close()?;
            println!("Done!");
        }
        Command::GetBalance { address } => {
            let blockchain = Blockchain::open()?;
            let balance = blockchain.get_balance(&address)?;
            blockchain.close()?;
            println!("Balance of {address}: {balance}");
        }
        // There is no mempool: a send builds one transaction and mines it
        // into a block on the spot.
        Command::Send { from, to, amount } => {
            let blockchain = Blockchain::open()?;
            let transaction = Transaction::new_utxo_transaction(&from, &to, amount, &blockchain)?;
            blockchain.mine_block(&[transaction])?;
            blockchain.close()?;
            println!("Success!");
        }
        // Walk the chain newest to oldest and dump every block.
        Command::Printchain => {
            let blockchain = Blockchain::open()?;
            let mut block_iterator = blockchain.iterator();
            while let Some(block) = block_iterator.next_block()? {
                println!("Pre block hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
                println!("Cur block hash: {}", HEXLOWER.encode(block.get_hash()));
                println!("Cur block timestamp: {}", block.get_timestamp());
                println!("PoW: {}", ProofOfWork::validate(&block));

                for tx in block.get_transactions() {
                    let cur_txid_hex = HEXLOWER.encode(tx.get_id());
                    println!("- Transaction txid_hex: {cur_txid_hex}");

                    if !tx.is_coinbase() {
                        for input in tx.get_vin() {
                            let txid_hex = HEXLOWER.encode(input.get_txid());
                            println!(
                                "-- Input txid = {}, vout = {}, from = {}",
                                txid_hex,
                                input.get_vout(),
                                input.get_unlock_proof(),
                            );
                        }
                    }
                    for output in tx.get_vout() {
                        println!(
                            "-- Output value = {}, to = {}",
                            output.get_value(),
                            output.get_lock_condition(),
                        );
                    }
                }
                println!();
            }
            blockchain.close()?;
        }
    }
    Ok(())
}
