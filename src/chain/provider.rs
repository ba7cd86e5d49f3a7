//! Chain provider backed by an ethers HTTP client

use super::{ChainTransport, TransactionReceipt};
use crate::config::NetworkConfig;
use crate::error::{DeployerError, DeployerResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::time::Duration;
use tracing::debug;

/// HTTP JSON-RPC client for one network
pub struct ChainProvider {
    /// Network configuration
    config: NetworkConfig,
    /// HTTP provider
    http: Provider<Http>,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(config: NetworkConfig) -> DeployerResult<Self> {
        let http = Provider::<Http>::try_from(config.endpoint_url.as_str())
            .map_err(|e| DeployerError::ChainConnection {
                chain_id: config.chain_id,
                message: format!("Invalid endpoint URL: {}", e),
            })?
            .interval(Duration::from_millis(100));

        debug!(
            "Added HTTP provider for chain {}: {}",
            config.chain_id, config.endpoint_url
        );

        Ok(Self { config, http })
    }

    fn connection_error(&self, e: impl std::fmt::Display) -> DeployerError {
        DeployerError::ChainConnection {
            chain_id: self.config.chain_id,
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl ChainTransport for ChainProvider {
    async fn chain_id(&self) -> DeployerResult<u64> {
        self.http
            .get_chainid()
            .await
            .map(|id| id.as_u64())
            .map_err(|e| self.connection_error(e))
    }

    async fn get_transaction_count(&self, address: Address) -> DeployerResult<u64> {
        self.http
            .get_transaction_count(address, None)
            .await
            .map(|count| count.as_u64())
            .map_err(|e| self.connection_error(e))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> DeployerResult<H256> {
        let pending = self.http.send_raw_transaction(raw).await.map_err(|e| {
            DeployerError::Broadcast {
                chain_id: self.config.chain_id,
                message: e.to_string(),
            }
        })?;

        Ok(pending.tx_hash())
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> DeployerResult<Option<TransactionReceipt>> {
        self.http
            .get_transaction_receipt(tx_hash)
            .await
            .map(|receipt| receipt.map(TransactionReceipt::from))
            .map_err(|e| self.connection_error(e))
    }

    async fn call(&self, from: Address, to: Address, data: Bytes) -> DeployerResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().from(from).to(to).data(data).into();

        self.http
            .call(&tx, None)
            .await
            .map_err(|e| self.connection_error(e))
    }

    async fn gas_price(&self) -> DeployerResult<U256> {
        self.http
            .get_gas_price()
            .await
            .map_err(|e| self.connection_error(e))
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        data: Bytes,
    ) -> DeployerResult<U256> {
        let mut request = TransactionRequest::new().from(from).data(data);
        if let Some(to) = to {
            request = request.to(to);
        }
        let tx: TypedTransaction = request.into();

        self.http
            .estimate_gas(&tx, None)
            .await
            .map_err(|e| self.connection_error(e))
    }
}
