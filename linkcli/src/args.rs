//! Options shared by several commands.

use std::time::Duration;

use anyhow::Context;
use clap::{Args, builder::BoolishValueParser};
use hyperlinker::{
    KeyPair,
    hypercore::{ARBITRUM_TESTNET_CHAIN_ID, Chain, HttpClient, LinkConfig},
};
use indicatif::ProgressBar;
use url::Url;

/// Network selection for HyperCore actions.
#[derive(Args, Debug)]
pub struct NetworkArgs {
    /// Submit to mainnet instead of testnet.
    #[arg(long, env = "IS_MAINNET", value_parser = BoolishValueParser::new())]
    pub mainnet: bool,
    /// Hex chain id the signature is bound to.
    #[arg(long, env = "SIGNATURE_CHAIN_ID", default_value = ARBITRUM_TESTNET_CHAIN_ID)]
    pub signature_chain_id: String,
    /// Override the exchange base url. `API_URL` belongs to `api-call`.
    #[arg(long, env = "EXCHANGE_URL")]
    pub exchange_url: Option<Url>,
}

impl NetworkArgs {
    pub fn chain(&self) -> Chain {
        Chain::from_mainnet_flag(self.mainnet)
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new(self.chain()).with_signature_chain_id(self.signature_chain_id.clone())
    }

    pub fn client(&self) -> anyhow::Result<HttpClient> {
        let client = match &self.exchange_url {
            Some(url) => HttpClient::with_url(url.clone())?,
            None => HttpClient::new(self.chain())?,
        };
        Ok(client)
    }
}

/// Loads a key from the given hex, prompting on the terminal when absent.
pub fn load_key(hex: Option<&str>, label: &str) -> anyhow::Result<KeyPair> {
    let hex = match hex {
        Some(hex) => hex.to_owned(),
        None => rpassword::prompt_password(format!("{label} private key: "))
            .with_context(|| format!("reading {label} private key"))?,
    };
    anyhow::ensure!(!hex.trim().is_empty(), "{label} private key is empty");
    let key = KeyPair::from_hex(hex.trim()).with_context(|| format!("loading {label} key"))?;
    log::debug!("loaded {label} key for {}", key.address());
    Ok(key)
}

/// Reads an inline JSON argument, or a file when prefixed with `@`.
pub fn read_json_arg(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}")),
        None => Ok(value.to_owned()),
    }
}

/// Spinner shown while waiting on the network.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
