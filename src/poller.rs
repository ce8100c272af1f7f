//! Balance poller - periodic balance and network refresh
//!
//! One poller runs per connected account. The first fetch happens
//! immediately, then on a fixed cadence. A failed fetch is reported and the
//! cadence keeps going - the next tick is the retry policy - so the last
//! good value stays visible until it is replaced.

use crate::chain::{Account, ChainClient};
use crate::events::Notification;
use crate::metrics;
use crate::session::WalletSnapshot;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, warn};

/// Handle tying the polling task to the connected state
///
/// Dropping the guard stops the task, so a poller cannot outlive the
/// view or account that started it.
pub struct PollerGuard {
    handle: JoinHandle<()>,
}

impl PollerGuard {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for PollerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct BalancePoller;

impl BalancePoller {
    /// Start polling balance and network identity for an account
    pub fn start(
        chain: Arc<ChainClient>,
        account: Account,
        cadence: Duration,
        snapshot: Arc<RwLock<WalletSnapshot>>,
        notices: broadcast::Sender<Notification>,
    ) -> PollerGuard {
        let handle = tokio::spawn(async move {
            let mut ticks = interval(cadence);
            loop {
                ticks.tick().await;

                match chain.balance(&account).await {
                    Ok(balance) => {
                        debug!("balance of {}: {}", account.short(), balance);
                        metrics::record_balance_fetch();
                        metrics::record_balance(balance.as_eth());
                        snapshot.write().await.balance = Some(balance);
                    }
                    Err(e) => {
                        if e.is_transient() {
                            warn!("balance refresh failed for {}: {}", account.short(), e);
                        } else {
                            error!("balance refresh failed for {}: {}", account.short(), e);
                        }
                        metrics::record_balance_fetch_error();
                        let _ = notices.send(Notification::BalanceRefreshFailed {
                            reason: e.to_string(),
                        });
                    }
                }

                let label = chain.network_label().await;
                snapshot.write().await.network = Some(label);
            }
        });

        PollerGuard { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;
    use crate::provider::MockWalletProvider;
    use ethers::types::U256;

    const ACCOUNT: &str = "0x0000000000000000000000000000000000000005";

    #[tokio::test(start_paused = true)]
    async fn errors_do_not_stop_the_cadence() {
        let mut provider = MockWalletProvider::new();
        let mut fetches = 0;
        provider.expect_balance_of().returning(move |_| {
            fetches += 1;
            match fetches {
                1 => Ok(U256::exp10(18)),
                2 => Err(WalletError::Provider("rpc down".to_string())),
                _ => Ok(U256::exp10(18) * 2),
            }
        });
        provider.expect_chain_id().returning(|| Ok(1));

        let chain = Arc::new(ChainClient::new(Some(Arc::new(provider))));
        let snapshot = Arc::new(RwLock::new(WalletSnapshot::default()));
        let (notices, mut feed) = broadcast::channel(16);

        let guard = BalancePoller::start(
            chain,
            Account::new(ACCOUNT),
            Duration::from_secs(15),
            snapshot.clone(),
            notices,
        );

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            snapshot.read().await.balance.map(|b| b.to_string()),
            Some("1.0000".to_string())
        );
        assert_eq!(
            snapshot.read().await.network.as_deref(),
            Some("Ethereum Mainnet")
        );

        // Second tick fails: value is stale but kept, and a notice goes out.
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(
            snapshot.read().await.balance.map(|b| b.to_string()),
            Some("1.0000".to_string())
        );
        assert!(matches!(
            feed.recv().await.unwrap(),
            Notification::BalanceRefreshFailed { .. }
        ));

        // Third tick recovers.
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(
            snapshot.read().await.balance.map(|b| b.to_string()),
            Some("2.0000".to_string())
        );

        guard.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_guard_stops_polling() {
        let mut provider = MockWalletProvider::new();
        // At most the immediate fetch may land before the guard drops.
        provider
            .expect_balance_of()
            .times(0..=1)
            .returning(|_| Ok(U256::zero()));
        provider.expect_chain_id().times(0..=1).returning(|| Ok(1));

        let chain = Arc::new(ChainClient::new(Some(Arc::new(provider))));
        let snapshot = Arc::new(RwLock::new(WalletSnapshot::default()));
        let (notices, _feed) = broadcast::channel(16);

        let guard = BalancePoller::start(
            chain,
            Account::new(ACCOUNT),
            Duration::from_secs(15),
            snapshot,
            notices,
        );
        drop(guard);

        // Well past several cadences: the aborted task must not fetch again.
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
}
