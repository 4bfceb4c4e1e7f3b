//! Wire types for the `/exchange` endpoint.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize, Serializer};

use super::Chain;
use crate::signing::Signature;

/// Tag carried in the `type` field of a link action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkActionType {
    #[serde(rename = "linkStakingUser")]
    LinkStakingUser,
}

/// A `linkStakingUser` action.
///
/// Field order matches the JSON the exchange expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAction {
    pub hyperliquid_chain: Chain,
    pub is_finalize: bool,
    pub nonce: u64,
    pub signature_chain_id: String,
    #[serde(rename = "type")]
    pub kind: LinkActionType,
    /// The other party's address.
    #[serde(serialize_with = "lowercase_address")]
    pub user: Address,
}

/// Signed request body posted to `/exchange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: LinkAction,
    pub expires_after: Option<u64>,
    pub is_frontend: bool,
    pub nonce: u64,
    pub signature: Signature,
    pub vault_address: Option<Address>,
}

impl ActionRequest {
    /// Wraps a signed action; the outer nonce is the action's.
    pub fn new(action: LinkAction, signature: Signature) -> Self {
        Self {
            nonce: action.nonce,
            action,
            expires_after: None,
            is_frontend: true,
            signature,
            vault_address: None,
        }
    }
}

/// Exchange response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(tag = "status", content = "response")]
pub enum ApiResponse {
    Ok(serde_json::Value),
    /// Rejection detail; usually a message, sometimes an object.
    Err(serde_json::Value),
}

impl ApiResponse {
    /// Rejection detail carried by a `{"status": "err"}` envelope, whatever
    /// the shape of its `response`.
    pub fn rejection(response: &serde_json::Value) -> Option<String> {
        if response.get("status").and_then(serde_json::Value::as_str) != Some("err") {
            return None;
        }
        Some(match response.get("response") {
            Some(serde_json::Value::String(msg)) => msg.clone(),
            Some(detail) => detail.to_string(),
            None => response.to_string(),
        })
    }
}

fn lowercase_address<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_string().to_lowercase())
}
