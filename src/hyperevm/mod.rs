//! HyperEVM (and any EVM chain) RPC access.
//!
//! A thin wrapper over an alloy provider that signs with a [`KeyPair`]:
//! estimate gas, broadcast, wait for the receipt. Fee and nonce filling is
//! left to the provider.

use std::time::Duration;

use alloy::{
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use url::Url;

use crate::{
    error::{Error, Result},
    signing::KeyPair,
};

/// Default bound on waiting for a receipt.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Signing RPC client.
#[derive(Clone)]
pub struct Client {
    provider: DynProvider<Ethereum>,
    from: Address,
    receipt_timeout: Duration,
}

impl Client {
    /// Connects to `rpc_url`, signing transactions with `key`.
    pub fn connect(rpc_url: Url, key: &KeyPair) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(key.signer().clone())
            .connect_http(rpc_url)
            .erased();

        Self {
            provider,
            from: key.address(),
            receipt_timeout: RECEIPT_TIMEOUT,
        }
    }

    /// Sets how long [`Client::submit`] waits for a receipt.
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Address transactions are sent from.
    pub fn from(&self) -> Address {
        self.from
    }

    /// Chain id reported by the node.
    pub async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    /// Estimates gas for `tx`.
    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64> {
        self.provider
            .estimate_gas(tx.clone())
            .await
            .map_err(|err| Error::GasEstimation(err.to_string()))
    }

    /// Estimates gas, broadcasts `tx` and waits for its receipt.
    pub async fn submit(&self, tx: TransactionRequest) -> Result<TransactionReceipt> {
        let tx = tx.with_from(self.from);
        let gas = self.estimate_gas(&tx).await?;
        log::debug!("estimated gas {gas}");

        let pending = self
            .provider
            .send_transaction(tx.with_gas_limit(gas))
            .await?;
        let hash: TxHash = *pending.tx_hash();
        log::info!("sent transaction {hash}");

        let receipt = tokio::time::timeout(self.receipt_timeout, pending.get_receipt())
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "no receipt for {hash} after {:?}",
                    self.receipt_timeout
                ))
            })?
            .map_err(|err| Error::Rpc(err.to_string()))?;

        log::info!(
            "transaction {hash} mined in block {:?}, status {}",
            receipt.block_number,
            receipt.status()
        );
        Ok(receipt)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("from", &self.from)
            .field("receipt_timeout", &self.receipt_timeout)
            .finish_non_exhaustive()
    }
}

/// Builds a request transferring `value` wei to `to` with optional calldata.
pub fn transfer_request(
    to: Address,
    value: U256,
    data: Option<Bytes>,
    chain_id: Option<u64>,
) -> TransactionRequest {
    let mut tx = TransactionRequest::default().with_to(to).with_value(value);
    if let Some(data) = data {
        tx = tx.with_input(data);
    }
    if let Some(chain_id) = chain_id {
        tx = tx.with_chain_id(chain_id);
    }
    tx
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, bytes};

    use super::*;

    #[test]
    fn test_transfer_request() {
        let to = address!("0x0D1d9635D0640821d15e323ac8AdADfA9c111414");
        let tx = transfer_request(to, U256::from(1_000u64), Some(bytes!("deadbeef")), Some(998));
        assert_eq!(tx.to, Some(to.into()));
        assert_eq!(tx.value, Some(U256::from(1_000u64)));
        assert_eq!(tx.input.input(), Some(&bytes!("deadbeef")));
        assert_eq!(tx.chain_id, Some(998));

        let bare = transfer_request(to, U256::ZERO, None, None);
        assert!(bare.input.input().is_none());
        assert!(bare.chain_id.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_node_fails_estimation() {
        let key = KeyPair::random();
        let client = Client::connect("http://127.0.0.1:1".parse().unwrap(), &key)
            .with_receipt_timeout(Duration::from_secs(1));
        assert_eq!(client.from(), key.address());

        let tx = transfer_request(Address::ZERO, U256::from(1u64), None, Some(1));
        let err = client.submit(tx).await.unwrap_err();
        assert!(matches!(err, Error::GasEstimation(_)));
    }
}
