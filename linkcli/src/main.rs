use clap::{ArgAction, Parser, Subcommand};

mod args;
mod link;
mod sign;
mod tx;

use self::{
    link::{LinkFinalizeCmd, LinkInitiateCmd},
    sign::{ApiCallCmd, SignMessageCmd, SignTypedDataCmd},
    tx::SendTxCmd,
};

/// Link Hyperliquid trading and staking accounts, sign EIP-712 data and
/// send transactions.
///
/// Every option can also be set through the environment or a `.env` file.
#[derive(Parser)]
#[command(author, version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a link from the trading account to the staking account.
    LinkInitiate(LinkInitiateCmd),
    /// Confirm a link from the staking account using the initiator's nonce.
    LinkFinalize(LinkFinalizeCmd),
    /// Sign a personal (EIP-191) message.
    SignMessage(SignMessageCmd),
    /// Sign an EIP-712 typed-data document.
    SignTypedData(SignTypedDataCmd),
    /// POST a payload with address and signature headers.
    ApiCall(ApiCallCmd),
    /// Send a transaction over JSON-RPC and wait for the receipt.
    SendTx(SendTxCmd),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let level = match args.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    let _ = simple_logger::init_with_level(level);

    match args.command {
        Commands::LinkInitiate(cmd) => cmd.run().await,
        Commands::LinkFinalize(cmd) => cmd.run().await,
        Commands::SignMessage(cmd) => cmd.run(),
        Commands::SignTypedData(cmd) => cmd.run(),
        Commands::ApiCall(cmd) => cmd.run().await,
        Commands::SendTx(cmd) => cmd.run().await,
    }
}
