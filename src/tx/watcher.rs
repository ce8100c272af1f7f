//! Transaction confirmation watcher
//!
//! Drives a submitted transaction from `Pending` to a terminal status:
//! the receipt wait is bounded by a configured timeout, and every lookup
//! failure lands in `Failed` - a transaction is never left pending
//! indefinitely.

use super::TxStatus;
use crate::chain::ChainClient;
use crate::error::{WalletError, WalletResult};
use crate::provider::ReceiptSummary;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct TransactionWatcher {
    chain: Arc<ChainClient>,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl TransactionWatcher {
    pub fn new(
        chain: Arc<ChainClient>,
        receipt_poll_interval: Duration,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            receipt_poll_interval,
            receipt_timeout,
        }
    }

    /// Watch a pending transaction until it reaches a terminal status
    pub async fn settle(&self, hash: &str) -> TxStatus {
        match self.outcome(hash).await {
            Ok(true) => {
                debug!("transaction {} confirmed", hash);
                TxStatus::Confirmed
            }
            Ok(false) => {
                warn!("transaction {} failed", hash);
                TxStatus::Failed
            }
            Err(e) => {
                warn!("watch for {} aborted: {}", hash, e);
                TxStatus::Failed
            }
        }
    }

    async fn outcome(&self, hash: &str) -> WalletResult<bool> {
        // A transaction the provider cannot find goes straight to failed.
        if !self.chain.transaction_exists(hash).await? {
            return Ok(false);
        }

        let receipt = timeout(self.receipt_timeout, self.wait_mined(hash))
            .await
            .map_err(|_| {
                WalletError::LookupFailed(format!(
                    "no receipt for {} within {:?}",
                    hash, self.receipt_timeout
                ))
            })??;

        Ok(receipt.succeeded)
    }

    async fn wait_mined(&self, hash: &str) -> WalletResult<ReceiptSummary> {
        let mut ticks = interval(self.receipt_poll_interval);
        loop {
            ticks.tick().await;
            if let Some(receipt) = self.chain.receipt(hash).await? {
                return Ok(receipt);
            }
        }
    }
}
