//! # hyperlinker
//!
//! EIP-712 signing engine and the Hyperliquid staking-link handshake.
//!
//! Linking a trading account to a staking account is done with two
//! `linkStakingUser` actions, each signed by one of the two keys and bound
//! together by a shared nonce. This crate computes the typed-data digests
//! itself, signs them, checks every signature locally by recovering the
//! signer, and only then submits.
//!
//! ## Modules
//!
//! - [`eip712`]: domain separator, type encoding, struct hashing and JSON typed-data documents
//! - [`signing`]: secp256k1 keys, signatures, recovery and personal messages
//! - [`hypercore`]: the link coordinator and the HTTP submission gateway
//! - [`hyperevm`]: gas estimation, broadcast and receipts over JSON-RPC
//!
//! ## Linking two accounts
//!
//! ```no_run
//! use hyperlinker::{
//!     KeyPair,
//!     hypercore::{Chain, Coordinator, HttpClient, LinkConfig},
//! };
//!
//! # async fn example() -> hyperlinker::Result<()> {
//! let trading = KeyPair::from_hex("0x...")?;
//! let staking = KeyPair::from_hex("0x...")?;
//! let coordinator = Coordinator::new(
//!     LinkConfig::new(Chain::Testnet),
//!     HttpClient::new(Chain::Testnet)?,
//! );
//!
//! // Usually run by two different operators.
//! let opened = coordinator.initiate(&trading, staking.address(), None).await?;
//! coordinator
//!     .finalize(&staking, trading.address(), Some(opened.nonce))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod eip712;
pub mod error;
pub mod hypercore;
pub mod hyperevm;
pub mod signing;

/// Re-exported primitives from Alloy.
pub use alloy::primitives::{Address, B256, Bytes, U256, address};
pub use error::{Error, Result};
pub use signing::{KeyPair, Signature};
