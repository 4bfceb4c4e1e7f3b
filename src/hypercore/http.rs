use std::time::Duration;

use alloy::primitives::Address;
use reqwest::header;
use serde::Serialize;
use url::Url;

use super::{Chain, SUBMIT_TIMEOUT, link::Gateway, types::ActionRequest};
use crate::{
    error::{Error, Result},
    signing::{AuthMessage, KeyPair, sign_verified},
};

/// Header carrying the signer's address on authenticated calls.
pub const ADDRESS_HEADER: &str = "X-Eth-Address";
/// Header carrying the 65-byte signature on authenticated calls.
pub const SIGNATURE_HEADER: &str = "X-Eth-Signature";

/// HTTP client.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Creates a client for the exchange API of `chain`.
    pub fn new(chain: Chain) -> Result<Self> {
        Self::with_url(chain.api_url())
    }

    /// Creates a client against an arbitrary base url.
    pub fn with_url(base_url: Url) -> Result<Self> {
        Self::with_timeout(base_url, SUBMIT_TIMEOUT)
    }

    /// Creates a client whose requests expire after `timeout`.
    pub fn with_timeout(base_url: Url, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Posts a signed action to `/exchange` and returns the response as is.
    pub async fn send_action(&self, req: &ActionRequest) -> Result<serde_json::Value> {
        let mut url = self.base_url.clone();
        url.set_path("/exchange");

        let text = serde_json::to_string(req)?;
        log::debug!("POST {url} {text}");

        let res = self
            .http_client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(text)
            .send()
            .await?;
        let body = read_body(res).await?;
        serde_json::from_str(&body)
            .map_err(|_| Error::Protocol(format!("unexpected response: {body}")))
    }

    /// Signs `message` with `key` and posts `payload` to `url` with the
    /// address and signature headers. Returns the raw response body.
    ///
    /// The signature is verified locally before anything is sent.
    pub async fn authenticated_post<T: Serialize + ?Sized>(
        &self,
        url: Url,
        key: &KeyPair,
        message: &AuthMessage,
        payload: &T,
    ) -> Result<String> {
        let digest = message.digest()?;
        let signature = sign_verified(key, &digest)?;
        let text = serde_json::to_string(payload)?;
        log::debug!("POST {url} as {}", key.address());

        let res = self
            .http_client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(ADDRESS_HEADER, address_header(key.address()))
            .header(SIGNATURE_HEADER, signature.to_string())
            .body(text)
            .send()
            .await?;
        read_body(res).await
    }
}

/// Returns the body, or the status and body as a [`Error::Protocol`] when the
/// request was not successful.
async fn read_body(res: reqwest::Response) -> Result<String> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
        log::warn!("remote answered {status}: {body}");
        return Err(Error::Protocol(format!("{status}: {body}")));
    }
    Ok(body)
}

impl Gateway for Client {
    async fn submit(&self, request: &ActionRequest) -> Result<serde_json::Value> {
        self.send_action(request).await
    }
}

fn address_header(address: Address) -> String {
    address.to_checksum(None)
}
