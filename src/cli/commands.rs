use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ledger-chain")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createblockchain", about = "Create a new blockchain")]
    Createblockchain {
        #[arg(help = "The address to send the genesis block reward to")]
        address: String,
    },
    #[command(
        name = "getbalance",
        about = "Get the balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The address")]
        address: String,
    },
    #[command(name = "send", about = "Send value between addresses and mine the block")]
    Send {
        #[arg(help = "Source address")]
        from: String,
        #[arg(help = "Destination address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
    },
    #[command(name = "printchain", about = "Print all blocks in the blockchain")]
    Printchain,
}
