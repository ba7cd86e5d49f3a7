//! Unsigned transaction intents

use crate::error::{DeployerError, DeployerResult};

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};

/// Caller-supplied fields for a new intent
///
/// Missing gas fields are filled from the node at build time; a missing nonce
/// is allocated by the submitter.
#[derive(Debug, Clone, Default)]
pub struct IntentRequest {
    pub chain_id: Option<u64>,
    pub sender: Option<Address>,
    /// Absent for contract deployment
    pub to: Option<Address>,
    pub data: Bytes,
    pub nonce: Option<u64>,
    pub gas_limit: Option<U256>,
    pub gas_price: Option<U256>,
}

impl IntentRequest {
    /// Request that deploys `bytecode` (with constructor arguments appended)
    pub fn deployment(bytecode: Bytes) -> Self {
        Self {
            data: bytecode,
            ..Default::default()
        }
    }

    /// Request that calls `to` with ABI-encoded `data`
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            to: Some(to),
            data,
            ..Default::default()
        }
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Chain id and sender, or `InvalidIntent` naming what is missing
    pub(crate) fn identity(&self) -> DeployerResult<(u64, Address)> {
        let chain_id = self
            .chain_id
            .ok_or_else(|| DeployerError::InvalidIntent("chain id is missing".to_string()))?;
        let sender = self
            .sender
            .ok_or_else(|| DeployerError::InvalidIntent("sender is missing".to_string()))?;

        if chain_id == 0 {
            return Err(DeployerError::InvalidIntent("chain id must be non-zero".to_string()));
        }
        if sender.is_zero() {
            return Err(DeployerError::InvalidIntent("sender is the zero address".to_string()));
        }

        Ok((chain_id, sender))
    }
}

/// A fully specified, unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub chain_id: u64,
    pub sender: Address,
    /// `None` deploys a contract
    pub to: Option<Address>,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_limit: U256,
    pub gas_price: U256,
}

impl TransactionIntent {
    pub fn is_deployment(&self) -> bool {
        self.to.is_none()
    }

    /// Legacy EIP-155 transaction carrying this intent
    pub fn to_typed_transaction(&self) -> TypedTransaction {
        let mut tx = TransactionRequest::new()
            .from(self.sender)
            .data(self.data.clone())
            .nonce(self.nonce)
            .gas(self.gas_limit)
            .gas_price(self.gas_price)
            .chain_id(self.chain_id);

        if let Some(to) = self.to {
            tx = tx.to(to);
        }

        TypedTransaction::Legacy(tx)
    }
}
