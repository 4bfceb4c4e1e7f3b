//! The two halves of the staking link handshake.
//!
//! ```bash
//! # trading side
//! linkcli link-initiate --staking-address 0x...
//! # staking side, with the nonce printed above
//! linkcli link-finalize --trading-address 0x... --nonce 1690393044548
//! ```

use std::io::{Write, stdout};

use clap::Args;
use hyperlinker::{
    Address,
    hypercore::{Coordinator, LinkOutcome},
};

use crate::args::{NetworkArgs, load_key, spinner};

/// Signs and submits the initiating action with the trading key.
#[derive(Args, derive_more::Deref)]
pub struct LinkInitiateCmd {
    #[deref]
    #[command(flatten)]
    network: NetworkArgs,
    /// Trading account private key (prompted when missing).
    #[arg(long, env = "TRADING_PRIVATE_KEY", hide_env_values = true)]
    trading_private_key: Option<String>,
    /// Staking account to link to.
    #[arg(long, env = "STAKING_ADDRESS")]
    staking_address: Address,
    /// Nonce to use instead of the current time in milliseconds.
    #[arg(long, env = "NONCE")]
    nonce: Option<u64>,
}

impl LinkInitiateCmd {
    pub async fn run(self) -> anyhow::Result<()> {
        let key = load_key(self.trading_private_key.as_deref(), "trading")?;
        let coordinator = Coordinator::new(self.link_config(), self.client()?);

        let pb = spinner(format!("initiating link on {}", self.chain()));
        let outcome = coordinator
            .initiate(&key, self.staking_address, self.nonce)
            .await;
        pb.finish_and_clear();
        let outcome = outcome?;

        print_outcome(&outcome)?;
        println!();
        println!(
            "Run link-finalize from the staking account with --nonce {} (or NONCE={}).",
            outcome.nonce, outcome.nonce
        );
        Ok(())
    }
}

/// Signs and submits the finalizing action with the staking key.
#[derive(Args, derive_more::Deref)]
pub struct LinkFinalizeCmd {
    #[deref]
    #[command(flatten)]
    network: NetworkArgs,
    /// Staking account private key (prompted when missing).
    #[arg(long, env = "STAKING_PRIVATE_KEY", hide_env_values = true)]
    staking_private_key: Option<String>,
    /// Trading account that initiated the link.
    #[arg(long, env = "TRADING_ADDRESS")]
    trading_address: Address,
    /// Nonce reported by link-initiate.
    #[arg(long, env = "NONCE")]
    nonce: Option<u64>,
}

impl LinkFinalizeCmd {
    pub async fn run(self) -> anyhow::Result<()> {
        let coordinator = Coordinator::new(self.link_config(), self.client()?);
        if self.nonce.is_none() {
            // Fail before touching the key.
            anyhow::bail!("--nonce (or NONCE) is required: use the nonce printed by link-initiate");
        }
        let key = load_key(self.staking_private_key.as_deref(), "staking")?;

        let pb = spinner(format!("finalizing link on {}", self.chain()));
        let outcome = coordinator
            .finalize(&key, self.trading_address, self.nonce)
            .await;
        pb.finish_and_clear();

        print_outcome(&outcome?)?;
        Ok(())
    }
}

fn print_outcome(outcome: &LinkOutcome) -> anyhow::Result<()> {
    let mut writer = tabwriter::TabWriter::new(stdout());

    writeln!(&mut writer, "role\tsigner\tuser\tnonce\tfinalize")?;
    writeln!(
        &mut writer,
        "{}\t{}\t{}\t{}\t{}",
        outcome.role,
        outcome.signer,
        outcome.request.action.user,
        outcome.nonce,
        outcome.request.action.is_finalize
    )?;
    writer.flush()?;

    println!();
    println!("signature: {}", outcome.request.signature);
    println!("response: {}", outcome.response);
    Ok(())
}
