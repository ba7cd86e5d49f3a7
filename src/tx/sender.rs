//! Transaction submitter: build, sign, broadcast and confirm
//!
//! One submitter drives one sender on one chain through
//! `Built -> Signed -> Submitted -> {Confirmed | Reverted | TimedOut}`.
//! Nothing is retried automatically; a caller that wants another attempt
//! builds a new intent.

use super::confirmation::wait_for_receipt;
use super::intent::{IntentRequest, TransactionIntent};
use super::nonce::NonceManager;
use super::signer::{self, SignedTransaction, SigningCredential};
use crate::chain::{ChainTransport, TransactionReceipt};
use crate::config::{ConfirmationConfig, NetworkConfig};
use crate::error::{DeployerError, DeployerResult};

use ethers::types::{Address, H256};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Transaction lifecycle driver for one sender
pub struct TransactionSubmitter {
    /// Node access, shared with spawned confirmation tasks
    transport: Arc<dyn ChainTransport>,
    /// Local nonce counter
    nonce_manager: NonceManager,
    /// Chain every intent must target
    chain_id: u64,
    /// Receipt polling settings
    confirmation: ConfirmationConfig,
}

impl TransactionSubmitter {
    /// Create a new submitter for the configured network and sender
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        network: &NetworkConfig,
        confirmation: ConfirmationConfig,
    ) -> Self {
        info!(
            "Transaction submitter initialized for {:?} on chain {}",
            network.sender_address, network.chain_id
        );

        Self {
            transport,
            nonce_manager: NonceManager::new(network.sender_address, network.chain_id),
            chain_id: network.chain_id,
            confirmation,
        }
    }

    /// Sender address
    pub fn sender(&self) -> Address {
        self.nonce_manager.address()
    }

    /// Chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Shared transport
    pub fn transport(&self) -> Arc<dyn ChainTransport> {
        self.transport.clone()
    }

    /// Request pre-filled with this submitter's chain and sender
    pub fn request(&self) -> IntentRequest {
        IntentRequest::default()
            .chain_id(self.chain_id)
            .sender(self.sender())
    }

    /// Next nonce for the sender: fetched for the first transaction, then
    /// counted locally
    pub async fn next_nonce(&mut self) -> DeployerResult<u64> {
        self.nonce_manager.next_nonce(self.transport.as_ref()).await
    }

    /// Assemble a canonical intent from `request`
    pub async fn build(&mut self, request: IntentRequest) -> DeployerResult<TransactionIntent> {
        let (chain_id, sender) = request.identity()?;

        if chain_id != self.chain_id {
            return Err(DeployerError::InvalidIntent(format!(
                "intent targets chain {} but submitter is bound to chain {}",
                chain_id, self.chain_id
            )));
        }
        if sender != self.sender() {
            return Err(DeployerError::InvalidIntent(format!(
                "intent sender {:?} does not match submitter sender {:?}",
                sender,
                self.sender()
            )));
        }

        let gas_price = match request.gas_price {
            Some(price) => price,
            None => self.transport.gas_price().await?,
        };
        let gas_limit = match request.gas_limit {
            Some(limit) => limit,
            None => {
                self.transport
                    .estimate_gas(sender, request.to, request.data.clone())
                    .await?
            }
        };

        // Allocated last so a failed gas lookup does not burn a nonce
        let nonce = match request.nonce {
            Some(nonce) => {
                self.nonce_manager.observe(nonce);
                nonce
            }
            None => self.next_nonce().await?,
        };

        let intent = TransactionIntent {
            chain_id,
            sender,
            to: request.to,
            data: request.data,
            nonce,
            gas_limit,
            gas_price,
        };

        debug!(
            "Built {} intent with nonce {} (gas {} @ {})",
            if intent.is_deployment() { "deployment" } else { "call" },
            intent.nonce,
            intent.gas_limit,
            intent.gas_price
        );
        Ok(intent)
    }

    /// Sign an intent; never touches the network
    ///
    /// A failed signature hands the intent's nonce back, so the next intent
    /// reuses it instead of leaving a gap the node would never fill.
    pub fn sign(
        &mut self,
        intent: &TransactionIntent,
        credential: &SigningCredential,
    ) -> DeployerResult<SignedTransaction> {
        signer::sign(intent, credential).map_err(|e| {
            self.nonce_manager.release(intent.nonce);
            e
        })
    }

    /// Broadcast a signed transaction
    ///
    /// On rejection the local nonce state is dropped so the next intent is
    /// built from the node's count again.
    pub async fn submit(&mut self, signed: SignedTransaction) -> DeployerResult<H256> {
        match self.transport.send_raw_transaction(signed.raw).await {
            Ok(tx_hash) => {
                if tx_hash != signed.hash {
                    warn!(
                        "Node returned hash {:?} for locally signed {:?}",
                        tx_hash, signed.hash
                    );
                }
                info!(
                    "Transaction sent: {:?} (nonce {}, chain {})",
                    tx_hash, signed.nonce, signed.chain_id
                );
                Ok(tx_hash)
            }
            Err(e) => {
                warn!("Broadcast of nonce {} failed: {}", signed.nonce, e);
                self.nonce_manager.reset();
                Err(e)
            }
        }
    }

    /// Poll for a receipt until it appears, reverts, or `wait` elapses
    pub async fn await_confirmation(
        &self,
        tx_hash: H256,
        poll_interval: Duration,
        wait: Duration,
    ) -> DeployerResult<TransactionReceipt> {
        wait_for_receipt(self.transport.as_ref(), tx_hash, poll_interval, wait).await
    }

    /// Poll for a receipt on a background task using the configured settings
    pub fn spawn_confirmation(
        &self,
        tx_hash: H256,
    ) -> JoinHandle<DeployerResult<TransactionReceipt>> {
        let transport = self.transport.clone();
        let poll_interval = self.confirmation.poll_interval();
        let wait = self.confirmation.timeout();

        tokio::spawn(async move {
            wait_for_receipt(transport.as_ref(), tx_hash, poll_interval, wait).await
        })
    }

    /// Build, sign, submit and wait for one transaction
    pub async fn execute(
        &mut self,
        request: IntentRequest,
        credential: &SigningCredential,
    ) -> DeployerResult<TransactionReceipt> {
        let intent = self.build(request).await?;
        let signed = self.sign(&intent, credential)?;
        let tx_hash = self.submit(signed).await?;

        self.await_confirmation(
            tx_hash,
            self.confirmation.poll_interval(),
            self.confirmation.timeout(),
        )
        .await
    }
}
