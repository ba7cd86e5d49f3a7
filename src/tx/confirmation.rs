//! Receipt polling
//!
//! Blocks are the natural pacing mechanism, so the wait is a plain fixed
//! interval poll bounded by a timeout.

use crate::chain::{ChainTransport, TransactionReceipt};
use crate::error::{DeployerError, DeployerResult};

use ethers::types::H256;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Poll until `tx_hash` has a receipt, it reverts, or `wait` elapses.
///
/// The node is always asked at least once, so a zero timeout still returns a
/// receipt that is already available.
pub async fn wait_for_receipt(
    transport: &dyn ChainTransport,
    tx_hash: H256,
    poll_interval: Duration,
    wait: Duration,
) -> DeployerResult<TransactionReceipt> {
    let poll = async {
        loop {
            match transport.get_transaction_receipt(tx_hash).await? {
                Some(receipt) => return Ok::<_, DeployerError>(receipt),
                None => {
                    debug!("Transaction {:?} pending", tx_hash);
                    sleep(poll_interval).await;
                }
            }
        }
    };

    let receipt = match timeout(wait, poll).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(
                "No receipt for {:?} after {:?}; it may still be mined",
                tx_hash, wait
            );
            return Err(DeployerError::ConfirmationTimeout {
                tx_hash,
                waited_ms: wait.as_millis() as u64,
            });
        }
    };

    if !receipt.success {
        warn!(
            "Transaction {:?} reverted in block {:?}",
            tx_hash, receipt.block_number
        );
        return Err(DeployerError::Reverted {
            tx_hash,
            block_number: receipt.block_number,
        });
    }

    info!(
        "Transaction {:?} confirmed in block {:?}",
        tx_hash, receipt.block_number
    );
    Ok(receipt)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chain::MockChainTransport;
    use ethers::types::Address;
    use mockall::predicate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) fn receipt(tx_hash: H256, success: bool) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: Some(12),
            block_hash: Some(H256::repeat_byte(0xbb)),
            contract_address: Some(Address::repeat_byte(0xcc)),
            gas_used: None,
            success,
        }
    }

    #[tokio::test]
    async fn test_zero_timeout_on_unmined_tx() {
        let hash = H256::repeat_byte(0xab);
        let mut transport = MockChainTransport::new();
        transport
            .expect_get_transaction_receipt()
            .returning(|_| Ok(None));

        let err = wait_for_receipt(&transport, hash, Duration::from_millis(10), Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployerError::ConfirmationTimeout { tx_hash, waited_ms: 0 } if tx_hash == hash
        ));
    }

    #[tokio::test]
    async fn test_reverted_receipt() {
        let hash = H256::repeat_byte(0xab);
        let mut transport = MockChainTransport::new();
        transport
            .expect_get_transaction_receipt()
            .with(predicate::eq(hash))
            .times(1)
            .returning(move |h| Ok(Some(receipt(h, false))));

        let err = wait_for_receipt(
            &transport,
            hash,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        match err {
            DeployerError::Reverted { tx_hash, block_number } => {
                assert_eq!(tx_hash, hash);
                assert_eq!(block_number, Some(12));
            }
            other => panic!("expected revert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_polls_until_mined() {
        let hash = H256::repeat_byte(0x01);
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();

        let mut transport = MockChainTransport::new();
        transport
            .expect_get_transaction_receipt()
            .returning(move |h| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Ok(None)
                } else {
                    Ok(Some(receipt(h, true)))
                }
            });

        let mined = wait_for_receipt(
            &transport,
            hash,
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(mined.success);
        assert_eq!(mined.transaction_hash, hash);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let mut transport = MockChainTransport::new();
        transport.expect_get_transaction_receipt().returning(|_| {
            Err(DeployerError::ChainConnection {
                chain_id: 4,
                message: "connection refused".to_string(),
            })
        });

        let err = wait_for_receipt(
            &transport,
            H256::zero(),
            Duration::from_millis(1),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert_eq!(err.stage(), "transport");
    }
}
