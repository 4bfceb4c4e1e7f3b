//! HyperCore staking-link handshake.
//!
//! Linking a trading account to a staking account takes two submissions, one
//! signed by each key:
//!
//! 1. The **initiator** (trading account) signs a `linkStakingUser` action
//!    with `isFinalize = false` naming the staking account, and reports the
//!    nonce it used.
//! 2. The **finalizer** (staking account) signs the same action with
//!    `isFinalize = true`, naming the trading account and reusing that nonce.
//!
//! The nonce is handed from one run to the other by the operator. Nothing
//! here keeps state between the two runs.

use std::{
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use url::Url;

pub mod http;
pub mod link;
pub mod types;

pub use http::Client as HttpClient;
pub use link::{Coordinator, Gateway, LinkOutcome, Role, build_finalizer_action, build_initiator_action};
pub use types::{ActionRequest, ApiResponse, LinkAction};

/// Arbitrum One chain id, as carried in `signatureChainId`.
pub const ARBITRUM_MAINNET_CHAIN_ID: &str = "0xa4b1";
/// Arbitrum Sepolia chain id, as carried in `signatureChainId`.
pub const ARBITRUM_TESTNET_CHAIN_ID: &str = "0x66eee";

/// Name of the domain user-signed actions are signed under.
pub const USER_SIGNED_DOMAIN_NAME: &str = "HyperliquidSignTransaction";
/// Verifying contract of the user-signed action domain.
pub const USER_SIGNED_VERIFYING_CONTRACT: Address = Address::ZERO;

/// Timeout applied to every submission.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hyperliquid network.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
pub enum Chain {
    Mainnet,
    Testnet,
}

impl Chain {
    /// Selects the network from an "is mainnet" flag.
    pub fn from_mainnet_flag(is_mainnet: bool) -> Self {
        if is_mainnet {
            Chain::Mainnet
        } else {
            Chain::Testnet
        }
    }

    /// Base API url of the network.
    pub fn api_url(&self) -> Url {
        let url = match self {
            Chain::Mainnet => "https://api.hyperliquid.xyz",
            Chain::Testnet => "https://api.hyperliquid-testnet.xyz",
        };
        Url::parse(url).expect("static url")
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Chain::Mainnet),
            "testnet" => Ok(Chain::Testnet),
            _ => Err(format!("unknown chain {s:?}, expected mainnet or testnet")),
        }
    }
}

/// Immutable settings shared by both roles of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub chain: Chain,
    /// Hex chain id the signature domain is bound to, e.g. `0x66eee`.
    pub signature_chain_id: String,
}

impl LinkConfig {
    /// Settings for `chain` with the default signature chain id.
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            signature_chain_id: ARBITRUM_TESTNET_CHAIN_ID.to_owned(),
        }
    }

    /// Overrides the signature chain id.
    pub fn with_signature_chain_id(mut self, signature_chain_id: impl Into<String>) -> Self {
        self.signature_chain_id = signature_chain_id.into();
        self
    }
}

/// Hands out millisecond timestamps as nonces.
///
/// Successive calls on the same handler never return the same value.
#[derive(Clone, Default)]
pub struct NonceHandler {
    last: Arc<AtomicU64>,
}

impl NonceHandler {
    /// Returns the current time in milliseconds, bumped past the previous nonce if needed.
    pub fn next(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis() as u64;
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_default();
        now.max(prev + 1)
    }
}

impl fmt::Debug for NonceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceHandler")
            .field("last", &self.last.load(Ordering::Relaxed))
            .finish()
    }
}
