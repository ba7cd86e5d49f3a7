//! Error types for the deployer

use ethers::types::H256;
use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Compilation error: {0}")]
    Compilation(String),

    #[error("Chain connection error for chain {chain_id}: {message}")]
    ChainConnection { chain_id: u64, message: String },

    #[error("Invalid transaction intent: {0}")]
    InvalidIntent(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Broadcast rejected on chain {chain_id}: {message}")]
    Broadcast { chain_id: u64, message: String },

    #[error("No receipt for transaction {tx_hash:?} after {waited_ms} ms")]
    ConfirmationTimeout { tx_hash: H256, waited_ms: u64 },

    #[error("Transaction {tx_hash:?} reverted in block {block_number:?}")]
    Reverted {
        tx_hash: H256,
        block_number: Option<u64>,
    },

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployerError {
    /// Name of the lifecycle stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            DeployerError::Config(_) => "config",
            DeployerError::Compilation(_) => "compile",
            DeployerError::ChainConnection { .. } => "transport",
            DeployerError::InvalidIntent(_) => "build",
            DeployerError::Signing(_) => "sign",
            DeployerError::Broadcast { .. } => "broadcast",
            DeployerError::ConfirmationTimeout { .. } | DeployerError::Reverted { .. } => {
                "confirm"
            }
            DeployerError::Contract(_) => "contract",
            DeployerError::Io(_) | DeployerError::Json(_) => "io",
        }
    }

    /// Check if the caller may rebuild the intent and try again.
    ///
    /// A timed out transaction may still be mined; re-query its receipt
    /// rather than resubmitting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeployerError::ChainConnection { .. } | DeployerError::Broadcast { .. }
        )
    }
}

/// Result type for deployer operations
pub type DeployerResult<T> = Result<T, DeployerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(DeployerError::InvalidIntent("x".into()).stage(), "build");
        assert_eq!(DeployerError::Signing("x".into()).stage(), "sign");
        assert_eq!(
            DeployerError::Broadcast {
                chain_id: 4,
                message: "nonce too low".into()
            }
            .stage(),
            "broadcast"
        );
        assert_eq!(
            DeployerError::Reverted {
                tx_hash: H256::zero(),
                block_number: Some(1)
            }
            .stage(),
            "confirm"
        );
    }

    #[test]
    fn test_timeout_is_not_retryable() {
        let err = DeployerError::ConfirmationTimeout {
            tx_hash: H256::repeat_byte(0xab),
            waited_ms: 0,
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("0xabab"));

        let err = DeployerError::Broadcast {
            chain_id: 1337,
            message: "insufficient funds".into(),
        };
        assert!(err.is_retryable());
    }
}
