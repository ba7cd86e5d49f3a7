//! Signing credential and signed transactions
//!
//! The private key is kept as loaded and only parsed when a transaction is
//! signed, so a missing or malformed secret surfaces as a signing failure
//! before anything is sent to the node. The key is never logged.

use super::intent::TransactionIntent;
use crate::error::{DeployerError, DeployerResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Bytes, H256};
use ethers::utils::keccak256;
use std::fmt;
use tracing::debug;

/// Private key held in memory for the duration of the run
#[derive(Clone, Default)]
pub struct SigningCredential {
    key: Option<String>,
}

impl SigningCredential {
    /// Credential from a hex private key (with or without `0x`)
    pub fn from_hex(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    /// Credential read from an environment variable; absent if unset or empty
    pub fn from_env(var: &str) -> Self {
        let key = std::env::var(var).ok().filter(|k| !k.trim().is_empty());
        if key.is_none() {
            debug!("No private key found in {}", var);
        }
        Self { key }
    }

    /// Credential with no key at all
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_present(&self) -> bool {
        self.key.is_some()
    }

    /// Parse the key into a wallet bound to `chain_id`
    pub fn wallet(&self, chain_id: u64) -> DeployerResult<LocalWallet> {
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| DeployerError::Signing("no private key configured".to_string()))?;
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);

        key.parse::<LocalWallet>()
            .map(|wallet| wallet.with_chain_id(chain_id))
            .map_err(|e| DeployerError::Signing(format!("Invalid private key: {}", e)))
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Intent plus signature, ready to broadcast once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
    pub nonce: u64,
    pub chain_id: u64,
}

/// Sign `intent` with `credential`.
///
/// Signatures are deterministic (RFC 6979), so the same intent and key always
/// produce the same bytes.
pub fn sign(
    intent: &TransactionIntent,
    credential: &SigningCredential,
) -> DeployerResult<SignedTransaction> {
    let wallet = credential.wallet(intent.chain_id)?;

    if wallet.address() != intent.sender {
        return Err(DeployerError::Signing(format!(
            "key controls {:?} but intent is sent from {:?}",
            wallet.address(),
            intent.sender
        )));
    }

    let tx = intent.to_typed_transaction();
    let signature = wallet
        .sign_transaction_sync(&tx)
        .map_err(|e| DeployerError::Signing(e.to_string()))?;

    let raw = tx.rlp_signed(&signature);
    let hash = H256::from(keccak256(&raw));

    debug!(
        "Signed tx {:?} (nonce {}, chain {})",
        hash, intent.nonce, intent.chain_id
    );

    Ok(SignedTransaction {
        raw,
        hash,
        nonce: intent.nonce,
        chain_id: intent.chain_id,
    })
}
