//! Nonce management for sequential transaction submission
//!
//! The first nonce of a sequence comes from the node. Every later nonce is
//! derived locally from the last one handed out, so transactions that are
//! broadcast but not yet mined are never counted twice.

use crate::chain::ChainTransport;
use crate::error::DeployerResult;

use ethers::types::Address;
use tracing::{debug, warn};

/// Local nonce counter for one sender on one chain
pub struct NonceManager {
    /// Sender address
    address: Address,
    /// Chain ID, for logging
    chain_id: u64,
    /// Next nonce to hand out, `None` until fetched from the node
    next: Option<u64>,
}

impl NonceManager {
    /// Create a new nonce manager
    pub fn new(address: Address, chain_id: u64) -> Self {
        Self {
            address,
            chain_id,
            next: None,
        }
    }

    /// Allocate the next nonce, querying the node only for the first one
    pub async fn next_nonce(&mut self, transport: &dyn ChainTransport) -> DeployerResult<u64> {
        let nonce = match self.next {
            Some(nonce) => nonce,
            None => {
                let on_chain = transport.get_transaction_count(self.address).await?;
                debug!(
                    "Initialized nonce for {:?} on chain {}: {}",
                    self.address, self.chain_id, on_chain
                );
                on_chain
            }
        };

        self.next = Some(nonce + 1);
        debug!("Allocated nonce {} for chain {}", nonce, self.chain_id);
        Ok(nonce)
    }

    /// Record an externally chosen nonce so the counter moves past it
    pub fn observe(&mut self, nonce: u64) {
        match self.next {
            Some(next) if nonce < next => {
                warn!(
                    "Explicit nonce {} on chain {} is behind the local counter ({})",
                    nonce, self.chain_id, next
                );
            }
            _ => self.next = Some(nonce + 1),
        }
    }

    /// Hand back a nonce that never reached the node
    ///
    /// Only the most recently allocated nonce can be returned; anything older
    /// is left alone.
    pub fn release(&mut self, nonce: u64) {
        if self.next == Some(nonce + 1) {
            self.next = Some(nonce);
            debug!("Released nonce {} for chain {}", nonce, self.chain_id);
        }
    }

    /// Forget local state; the next allocation re-queries the node
    pub fn reset(&mut self) {
        if let Some(next) = self.next.take() {
            debug!(
                "Dropped local nonce {} for chain {}, will re-sync",
                next, self.chain_id
            );
        }
    }

    /// Next nonce that would be handed out without a network call
    pub fn peek(&self) -> Option<u64> {
        self.next
    }

    /// Sender this counter belongs to
    pub fn address(&self) -> Address {
        self.address
    }
}
