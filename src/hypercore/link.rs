//! Two-phase `linkStakingUser` coordinator.

use std::future::Future;

use alloy::primitives::{Address, B256};

use super::{
    LinkConfig, NonceHandler, USER_SIGNED_DOMAIN_NAME, USER_SIGNED_VERIFYING_CONTRACT,
    types::{ActionRequest, ApiResponse, LinkAction, LinkActionType},
};
use crate::{
    eip712::{self, Domain, StructValue, TypeSchema},
    error::{Error, Result},
    signing::{KeyPair, sign_verified},
};

/// EIP-712 primary type of the link action.
pub const LINK_STAKING_USER_TYPE: &str = "HyperliquidTransaction:LinkStakingUser";

const LINK_STAKING_USER_FIELDS: [(&str, &str); 4] = [
    ("hyperliquidChain", "string"),
    ("user", "address"),
    ("isFinalize", "bool"),
    ("nonce", "uint64"),
];

/// Side of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum Role {
    /// The trading account; opens the link.
    #[display("initiator")]
    Initiator,
    /// The staking account; confirms the link with the initiator's nonce.
    #[display("finalizer")]
    Finalizer,
}

/// Action the initiator signs: names the finalizer, `isFinalize = false`.
pub fn build_initiator_action(config: &LinkConfig, finalizer: Address, nonce: u64) -> LinkAction {
    LinkAction {
        hyperliquid_chain: config.chain,
        is_finalize: false,
        nonce,
        signature_chain_id: config.signature_chain_id.clone(),
        kind: LinkActionType::LinkStakingUser,
        user: finalizer,
    }
}

/// Action the finalizer signs: names the initiator, `isFinalize = true`.
///
/// The nonce must be the one the initiator used. It is never generated here,
/// since a fresh nonce could not match.
pub fn build_finalizer_action(
    config: &LinkConfig,
    initiator: Address,
    nonce: Option<u64>,
) -> Result<LinkAction> {
    let nonce = nonce.ok_or_else(|| {
        Error::Config("finalizing a link requires the nonce used by the initiator".into())
    })?;
    Ok(LinkAction {
        hyperliquid_chain: config.chain,
        is_finalize: true,
        nonce,
        signature_chain_id: config.signature_chain_id.clone(),
        kind: LinkActionType::LinkStakingUser,
        user: initiator,
    })
}

impl LinkAction {
    /// Signing domain, bound to `signatureChainId`.
    pub fn domain(&self) -> Result<Domain> {
        let chain_id = eip712::parse_chain_id(&self.signature_chain_id).map_err(Error::Config)?;
        Ok(Domain::new(
            USER_SIGNED_DOMAIN_NAME,
            "1",
            chain_id,
            USER_SIGNED_VERIFYING_CONTRACT,
        ))
    }

    /// Schema with the single `LinkStakingUser` type.
    pub fn schema() -> Result<TypeSchema> {
        TypeSchema::new().with_type(LINK_STAKING_USER_TYPE, LINK_STAKING_USER_FIELDS)
    }

    /// The action as an EIP-712 value.
    pub fn typed_value(&self) -> StructValue {
        StructValue::new(LINK_STAKING_USER_TYPE)
            .with("hyperliquidChain", self.hyperliquid_chain.to_string())
            .with("user", self.user)
            .with("isFinalize", self.is_finalize)
            .with("nonce", self.nonce)
    }

    /// Digest the action is signed over.
    pub fn signing_hash(&self) -> Result<B256> {
        eip712::signing_hash(
            &self.domain()?,
            &Self::schema()?,
            LINK_STAKING_USER_TYPE,
            &self.typed_value().into(),
        )
    }

    /// Signs the action and checks the signature locally.
    pub fn sign(self, key: &KeyPair) -> Result<ActionRequest> {
        let digest = self.signing_hash()?;
        let signature = sign_verified(key, &digest)?;
        Ok(ActionRequest::new(self, signature))
    }
}

/// Delivers signed requests to the exchange.
pub trait Gateway {
    /// Posts `request` and returns the raw JSON response.
    fn submit(
        &self,
        request: &ActionRequest,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;
}

/// Result of one side of the handshake.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub role: Role,
    /// Nonce used; the initiator's must be handed to the finalizer.
    pub nonce: u64,
    pub signer: Address,
    pub request: ActionRequest,
    /// Response from the exchange, unmodified.
    pub response: serde_json::Value,
}

/// Runs either side of the handshake against a [`Gateway`].
#[derive(Debug)]
pub struct Coordinator<G> {
    config: LinkConfig,
    gateway: G,
    nonces: NonceHandler,
}

impl<G: Gateway> Coordinator<G> {
    pub fn new(config: LinkConfig, gateway: G) -> Self {
        Self {
            config,
            gateway,
            nonces: NonceHandler::default(),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Opens a link from `key` (trading) to `finalizer` (staking).
    ///
    /// Uses `nonce` when given, the current time in milliseconds otherwise.
    pub async fn initiate(
        &self,
        key: &KeyPair,
        finalizer: Address,
        nonce: Option<u64>,
    ) -> Result<LinkOutcome> {
        let nonce = nonce.unwrap_or_else(|| self.nonces.next());
        let action = build_initiator_action(&self.config, finalizer, nonce);
        self.run(Role::Initiator, key, action).await
    }

    /// Confirms a link from `initiator` using the initiator's nonce.
    pub async fn finalize(
        &self,
        key: &KeyPair,
        initiator: Address,
        nonce: Option<u64>,
    ) -> Result<LinkOutcome> {
        let action = build_finalizer_action(&self.config, initiator, nonce)?;
        self.run(Role::Finalizer, key, action).await
    }

    async fn run(&self, role: Role, key: &KeyPair, action: LinkAction) -> Result<LinkOutcome> {
        if action.user == key.address() {
            return Err(Error::Config(format!(
                "{role} cannot link {} to itself",
                action.user
            )));
        }

        let nonce = action.nonce;
        log::info!(
            "{role} {} linking {} on {} with nonce {nonce}",
            key.address(),
            action.user,
            action.hyperliquid_chain
        );

        let request = action.sign(key)?;
        let response = self.gateway.submit(&request).await?;
        log::debug!("{role} response: {response}");

        if let Some(detail) = ApiResponse::rejection(&response) {
            return Err(Error::Protocol(detail));
        }

        Ok(LinkOutcome {
            role,
            nonce,
            signer: key.address(),
            request,
            response,
        })
    }
}
