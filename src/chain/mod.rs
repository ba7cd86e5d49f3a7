//! Chain module - the JSON-RPC seam the deployer talks through
//!
//! This module provides:
//! - The `ChainTransport` trait, the only way the rest of the crate reaches a node
//! - An ethers HTTP implementation (`ChainProvider`)
//! - The receipt shape the transaction lifecycle works with

pub mod provider;

pub use provider::ChainProvider;

use crate::error::DeployerResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// Node operations needed to drive a transaction from intent to receipt
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// Chain id reported by the node
    async fn chain_id(&self) -> DeployerResult<u64>;

    /// Number of transactions sent from `address` (the next on-chain nonce)
    async fn get_transaction_count(&self, address: Address) -> DeployerResult<u64>;

    /// Broadcast a signed transaction, returning the hash the node assigned
    async fn send_raw_transaction(&self, raw: Bytes) -> DeployerResult<H256>;

    /// Receipt for a transaction, `None` while it is not mined
    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> DeployerResult<Option<TransactionReceipt>>;

    /// Execute a read-only call against the latest block
    async fn call(&self, from: Address, to: Address, data: Bytes) -> DeployerResult<Bytes>;

    /// Current gas price quoted by the node
    async fn gas_price(&self) -> DeployerResult<U256>;

    /// Gas estimate for a transaction; `to == None` estimates a deployment
    async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        data: Bytes,
    ) -> DeployerResult<U256>;
}

/// Confirmed on-chain result of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub block_hash: Option<H256>,
    /// Set when the transaction created a contract
    pub contract_address: Option<Address>,
    pub gas_used: Option<U256>,
    pub success: bool,
}

impl From<ethers::types::TransactionReceipt> for TransactionReceipt {
    fn from(receipt: ethers::types::TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()),
            block_hash: receipt.block_hash,
            contract_address: receipt.contract_address,
            gas_used: receipt.gas_used,
            // Receipts without a status field carry no success indicator
            success: receipt.status == Some(1u64.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U64;

    #[test]
    fn test_receipt_status_mapping() {
        let mut raw = ethers::types::TransactionReceipt {
            transaction_hash: H256::repeat_byte(1),
            block_number: Some(U64::from(42)),
            contract_address: Some(Address::repeat_byte(7)),
            status: Some(U64::from(1)),
            ..Default::default()
        };

        let receipt = TransactionReceipt::from(raw.clone());
        assert!(receipt.success);
        assert_eq!(receipt.block_number, Some(42));
        assert_eq!(receipt.contract_address, Some(Address::repeat_byte(7)));

        raw.status = Some(U64::zero());
        assert!(!TransactionReceipt::from(raw.clone()).success);

        raw.status = None;
        assert!(!TransactionReceipt::from(raw).success);
    }
}
