use std::{
    io::{Write, stdout},
    time::Duration,
};

use clap::Args;
use hyperlinker::{
    Address, Bytes, U256,
    hyperevm::{self, RECEIPT_TIMEOUT},
};
use url::Url;

use crate::args::{load_key, spinner};

/// Sends value (and optional calldata) to `TO_ADDRESS`.
///
/// Gas is estimated first; fees and the account nonce are filled by the node.
#[derive(Args)]
pub struct SendTxCmd {
    /// JSON-RPC endpoint.
    #[arg(long, env = "RPC_URL")]
    rpc_url: Url,
    /// Expected chain id; the command aborts if the node reports another.
    #[arg(long, env = "CHAIN_ID")]
    chain_id: Option<u64>,
    /// Private key (prompted when missing).
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
    /// Recipient.
    #[arg(long, env = "TO_ADDRESS")]
    to: Address,
    /// Amount in wei.
    #[arg(long, default_value = "0")]
    value: U256,
    /// Hex calldata.
    #[arg(long)]
    data: Option<Bytes>,
    /// Seconds to wait for the receipt.
    #[arg(long, default_value_t = RECEIPT_TIMEOUT.as_secs())]
    receipt_timeout: u64,
}

impl SendTxCmd {
    pub async fn run(self) -> anyhow::Result<()> {
        let key = load_key(self.private_key.as_deref(), "sender")?;
        let client = hyperevm::Client::connect(self.rpc_url, &key)
            .with_receipt_timeout(Duration::from_secs(self.receipt_timeout));

        if let Some(expected) = self.chain_id {
            let actual = client.chain_id().await?;
            anyhow::ensure!(
                actual == expected,
                "node reports chain id {actual}, expected {expected}"
            );
        }

        let tx = hyperevm::transfer_request(self.to, self.value, self.data, self.chain_id);
        let pb = spinner(format!("sending to {}", self.to));
        let receipt = client.submit(tx).await;
        pb.finish_and_clear();
        let receipt = receipt?;

        let mut writer = tabwriter::TabWriter::new(stdout());
        writeln!(&mut writer, "hash\tblock\tgas used\tstatus")?;
        writeln!(
            &mut writer,
            "{}\t{}\t{}\t{}",
            receipt.transaction_hash,
            receipt.block_number.unwrap_or_default(),
            receipt.gas_used,
            if receipt.status() { "success" } else { "reverted" }
        )?;
        writer.flush()?;

        anyhow::ensure!(receipt.status(), "transaction reverted");
        Ok(())
    }
}
