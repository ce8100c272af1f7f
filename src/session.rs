//! Dashboard session - page-level orchestration
//!
//! Owns the wallet snapshot and sequences the flows: connect adopts an
//! account and starts the balance poller; a send pauses the poller, tracks
//! the single in-flight transaction, and hands its hash to the watcher; a
//! confirmed transaction holds the screen for a fixed delay and then clears
//! itself, while a failed one waits for an explicit dismissal. Provider
//! change events are consumed here so an external account or network switch
//! is reflected without waiting for the next manual action.

use crate::chain::{network, Account, Balance, ChainClient};
use crate::config::Settings;
use crate::connection::{ConnectOutcome, ConnectionController};
use crate::error::{WalletError, WalletResult};
use crate::events::{Notification, ProviderEvent};
use crate::metrics;
use crate::poller::{BalancePoller, PollerGuard};
use crate::tx::{SendFlow, TransactionRecord, TransactionWatcher, TransferRequest, TxStatus};

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// How many notifications the snapshot retains for the dashboard
const NOTIFICATION_RING: usize = 20;

/// Point-in-time view of the dashboard state
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalletSnapshot {
    pub account: Option<Account>,
    pub network: Option<String>,
    pub balance: Option<Balance>,
    pub transaction: Option<TransactionRecord>,
    pub notifications: VecDeque<Notification>,
}

pub struct Session {
    chain: Arc<ChainClient>,
    connection: ConnectionController,
    flow: SendFlow,
    watcher: TransactionWatcher,
    snapshot: Arc<RwLock<WalletSnapshot>>,
    notices: broadcast::Sender<Notification>,
    poller: Mutex<Option<PollerGuard>>,
    poll_interval: Duration,
    confirm_display_delay: Duration,
    done_tx: mpsc::Sender<String>,
    done_rx: Mutex<Option<mpsc::Receiver<String>>>,
    ring_rx: Mutex<Option<broadcast::Receiver<Notification>>>,
}

impl Session {
    pub fn new(chain: Arc<ChainClient>, settings: &Settings) -> Self {
        let (notices, ring_rx) = broadcast::channel(256);
        let (done_tx, done_rx) = mpsc::channel(8);

        let connection = ConnectionController::new(
            chain.clone(),
            settings.wallet.install_url.clone(),
            notices.clone(),
        );
        let watcher = TransactionWatcher::new(
            chain.clone(),
            settings.receipt_poll_interval(),
            settings.receipt_timeout(),
        );
        let flow = SendFlow::new(chain.clone());

        Self {
            chain,
            connection,
            flow,
            watcher,
            snapshot: Arc::new(RwLock::new(WalletSnapshot::default())),
            notices,
            poller: Mutex::new(None),
            poll_interval: settings.poll_interval(),
            confirm_display_delay: settings.confirm_display_delay(),
            done_tx,
            done_rx: Mutex::new(Some(done_rx)),
            ring_rx: Mutex::new(Some(ring_rx)),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.chain.has_provider()
    }

    pub async fn snapshot(&self) -> WalletSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Subscribe to the notification feed
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notices.subscribe()
    }

    /// Silent reconnection on startup
    pub async fn restore(&self) {
        if let Some(account) = self.connection.restore().await {
            self.snapshot.write().await.account = Some(account.clone());
            self.start_poller(account).await;
            metrics::record_connected(true);
        }
    }

    /// Explicit connect action
    pub async fn connect(&self) -> WalletResult<ConnectOutcome> {
        let outcome = self.connection.connect().await?;

        if let ConnectOutcome::Connected(account) = &outcome {
            self.snapshot.write().await.account = Some(account.clone());
            self.start_poller(account.clone()).await;
            metrics::record_connected(true);
        }

        Ok(outcome)
    }

    /// Validate and submit a transfer, then track it to completion
    pub async fn send(&self, request: TransferRequest) -> WalletResult<TransactionRecord> {
        if self.snapshot.read().await.transaction.is_some() {
            return Err(WalletError::InFlight);
        }

        let record = self.flow.send(&request).await?;

        // The balance view yields to the transaction view while one is
        // tracked; the poller resumes when the record clears.
        self.stop_poller().await;
        self.snapshot.write().await.transaction = Some(record.clone());
        let _ = self.notices.send(Notification::TransactionSubmitted {
            hash: record.hash.clone(),
        });
        metrics::record_tx_submitted();

        self.spawn_watch(record.hash.clone());
        Ok(record)
    }

    /// Explicitly clear a terminal transaction
    pub async fn dismiss(&self) -> WalletResult<()> {
        let cleared = {
            let mut snap = self.snapshot.write().await;
            match &snap.transaction {
                Some(record) if record.is_terminal() => snap.transaction.take(),
                Some(_) => return Err(WalletError::InFlight),
                None => {
                    return Err(WalletError::LookupFailed(
                        "no transaction to dismiss".to_string(),
                    ))
                }
            }
        };

        if let Some(record) = cleared {
            let _ = self.notices.send(Notification::TransactionCleared {
                hash: record.hash,
            });
            self.resume_poller().await;
        }
        Ok(())
    }

    /// Stop background work on shutdown
    pub async fn stop(&self) {
        self.stop_poller().await;
        info!("session stopped");
    }

    /// Event loop: watcher completions, provider changes, notification ring
    pub async fn run(self: Arc<Self>) {
        let mut done_rx = match self.done_rx.lock().await.take() {
            Some(rx) => rx,
            None => return,
        };
        let mut ring_rx = match self.ring_rx.lock().await.take() {
            Some(rx) => rx,
            None => return,
        };
        let mut events = self.chain.subscribe();

        loop {
            tokio::select! {
                maybe_hash = done_rx.recv() => match maybe_hash {
                    Some(hash) => self.finish_transaction(&hash).await,
                    None => break,
                },
                event = next_event(&mut events) => {
                    self.handle_provider_event(event).await;
                }
                result = ring_rx.recv() => {
                    if let Ok(notification) = result {
                        self.remember(notification).await;
                    }
                }
            }
        }
    }

    fn spawn_watch(&self, hash: String) {
        let watcher = self.watcher.clone();
        let snapshot = self.snapshot.clone();
        let notices = self.notices.clone();
        let done = self.done_tx.clone();
        let display_delay = self.confirm_display_delay;

        tokio::spawn(async move {
            let status = watcher.settle(&hash).await;

            {
                let mut snap = snapshot.write().await;
                match &mut snap.transaction {
                    Some(record) if record.hash == hash => record.status = status,
                    // Dismissed while settling; nothing left to report.
                    _ => return,
                }
            }

            match status {
                TxStatus::Confirmed => {
                    metrics::record_tx_confirmed();
                    let _ = notices.send(Notification::TransactionConfirmed {
                        hash: hash.clone(),
                    });
                    // Hold the confirmation on screen, then hand control back.
                    tokio::time::sleep(display_delay).await;
                    let _ = done.send(hash).await;
                }
                TxStatus::Failed => {
                    metrics::record_tx_failed();
                    let _ = notices.send(Notification::TransactionFailed { hash });
                    // Stays visible until the user dismisses it.
                }
                TxStatus::Pending => {}
            }
        });
    }

    /// Watcher completion: clear the record and resume the balance view
    async fn finish_transaction(&self, hash: &str) {
        let cleared = {
            let mut snap = self.snapshot.write().await;
            match &snap.transaction {
                Some(record) if record.hash == hash => snap.transaction.take(),
                // Already dismissed by the user; completion stays single-fire.
                _ => None,
            }
        };

        if let Some(record) = cleared {
            debug!("transaction {} cleared", record.hash);
            let _ = self.notices.send(Notification::TransactionCleared {
                hash: record.hash,
            });
            self.resume_poller().await;
        }
    }

    async fn handle_provider_event(&self, event: ProviderEvent) {
        debug!("provider event: {}", event.name());

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
                Some(account) => {
                    if self.connection.account().await.as_ref() == Some(&account) {
                        return;
                    }
                    self.connection.adopt(account.clone()).await;
                    self.snapshot.write().await.account = Some(account.clone());
                    self.start_poller(account).await;
                    metrics::record_connected(true);
                }
                None => {
                    warn!("wallet access revoked");
                    self.connection.clear().await;
                    self.stop_poller().await;
                    let mut snap = self.snapshot.write().await;
                    snap.account = None;
                    snap.balance = None;
                    metrics::record_connected(false);
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                let label = network::label(chain_id);
                self.snapshot.write().await.network = Some(label.clone());
                let _ = self.notices.send(Notification::NetworkChanged { label });
            }
        }
    }

    async fn start_poller(&self, account: Account) {
        let guard = BalancePoller::start(
            self.chain.clone(),
            account,
            self.poll_interval,
            self.snapshot.clone(),
            self.notices.clone(),
        );
        if let Some(previous) = self.poller.lock().await.replace(guard) {
            previous.stop();
        }
    }

    async fn stop_poller(&self) {
        if let Some(guard) = self.poller.lock().await.take() {
            guard.stop();
        }
    }

    async fn resume_poller(&self) {
        if self.poller.lock().await.is_some() {
            return;
        }
        if let Some(account) = self.connection.account().await {
            self.start_poller(account).await;
        }
    }

    async fn remember(&self, notification: Notification) {
        if notification.is_error() {
            warn!("dashboard notice: {}", notification.name());
        }
        let mut snap = self.snapshot.write().await;
        snap.notifications.push_back(notification);
        while snap.notifications.len() > NOTIFICATION_RING {
            snap.notifications.pop_front();
        }
    }
}

/// Next provider event, or park forever when no provider is present
async fn next_event(
    events: &mut Option<broadcast::Receiver<ProviderEvent>>,
) -> ProviderEvent {
    match events {
        Some(rx) => loop {
            match rx.recv().await {
                Ok(event) => return event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("dropped {} provider events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return std::future::pending().await;
                }
            }
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockWalletProvider, ReceiptSummary, WalletProvider};

    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const HASH: &str = "0xfeed000000000000000000000000000000000000000000000000000000000001";

    fn settings() -> Settings {
        toml::from_str(
            r#"
            [node]
            rpc_url = "http://localhost:8545"
            request_timeout_secs = 30

            [wallet]
            private_key_env = "WALLETDECK_PRIVATE_KEY"
            install_url = "https://metamask.io/download/"

            [poller]
            interval_secs = 15

            [watcher]
            receipt_poll_interval_ms = 1000
            receipt_timeout_secs = 120
            confirm_display_secs = 5

            [api]
            host = "127.0.0.1"
            port = 8080

            [metrics]
            enabled = false
            port = 9090

            [explorer]
            tx_url = "https://etherscan.io/tx/"
        "#,
        )
        .unwrap()
    }

    fn session_over(provider: MockWalletProvider) -> Arc<Session> {
        let chain = Arc::new(ChainClient::new(Some(
            Arc::new(provider) as Arc<dyn WalletProvider>
        )));
        Arc::new(Session::new(chain, &settings()))
    }

    fn transfer() -> TransferRequest {
        TransferRequest {
            recipient: RECIPIENT.to_string(),
            amount: "0.1".to_string(),
        }
    }

    fn drain(feed: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
        let mut seen = Vec::new();
        while let Ok(notification) = feed.try_recv() {
            seen.push(notification);
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_transfer_clears_once_after_display_delay() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_send_transfer()
            .returning(|_, _| Ok(HASH.to_string()));
        provider.expect_find_transaction().returning(|_| Ok(true));
        provider
            .expect_transaction_receipt()
            .returning(|_| Ok(Some(ReceiptSummary { succeeded: true })));
        provider
            .expect_subscribe()
            .returning(|| broadcast::channel(4).1);

        let session = session_over(provider);
        let mut feed = session.subscribe();
        tokio::spawn(session.clone().run());

        let record = session.send(transfer()).await.unwrap();
        assert_eq!(record.status, TxStatus::Pending);
        assert!(session.snapshot().await.transaction.is_some());

        // Settled but still inside the display window.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            session.snapshot().await.transaction.map(|r| r.status),
            Some(TxStatus::Confirmed)
        );

        // Past the display delay the record clears itself.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(session.snapshot().await.transaction.is_none());

        let cleared: Vec<_> = drain(&mut feed)
            .into_iter()
            .filter(|n| matches!(n, Notification::TransactionCleared { .. }))
            .collect();
        assert_eq!(cleared.len(), 1);

        // And it stays cleared exactly once.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(drain(&mut feed)
            .iter()
            .all(|n| !matches!(n, Notification::TransactionCleared { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_transfer_waits_for_dismissal() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_send_transfer()
            .returning(|_, _| Ok(HASH.to_string()));
        provider.expect_find_transaction().returning(|_| Ok(true));
        provider
            .expect_transaction_receipt()
            .returning(|_| Ok(Some(ReceiptSummary { succeeded: false })));
        provider
            .expect_subscribe()
            .returning(|| broadcast::channel(4).1);

        let session = session_over(provider);
        tokio::spawn(session.clone().run());

        session.send(transfer()).await.unwrap();

        // Long past every delay: a failed record never clears itself.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(
            session.snapshot().await.transaction.map(|r| r.status),
            Some(TxStatus::Failed)
        );

        session.dismiss().await.unwrap();
        assert!(session.snapshot().await.transaction.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn one_transaction_at_a_time() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_send_transfer()
            .times(1)
            .returning(|_, _| Ok(HASH.to_string()));
        provider.expect_find_transaction().returning(|_| Ok(true));
        // Never mined within the test horizon.
        provider
            .expect_transaction_receipt()
            .returning(|_| Ok(None));
        provider
            .expect_subscribe()
            .returning(|| broadcast::channel(4).1);

        let session = session_over(provider);
        tokio::spawn(session.clone().run());

        session.send(transfer()).await.unwrap();

        assert!(matches!(
            session.send(transfer()).await,
            Err(WalletError::InFlight)
        ));
        // A pending record cannot be dismissed either.
        assert!(matches!(session.dismiss().await, Err(WalletError::InFlight)));
    }

    #[tokio::test(start_paused = true)]
    async fn chain_change_refreshes_the_network_label() {
        let (provider_events, _) = broadcast::channel(4);
        let events_handle = provider_events.clone();

        let mut provider = MockWalletProvider::new();
        provider
            .expect_subscribe()
            .returning(move || events_handle.subscribe());

        let session = session_over(provider);
        let mut feed = session.subscribe();
        tokio::spawn(session.clone().run());
        tokio::time::sleep(Duration::from_millis(10)).await;

        provider_events
            .send(ProviderEvent::ChainChanged(137))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            session.snapshot().await.network.as_deref(),
            Some("Polygon Mainnet")
        );
        assert!(drain(&mut feed).iter().any(|n| matches!(
            n,
            Notification::NetworkChanged { label } if label == "Polygon Mainnet"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn revoked_access_disconnects() {
        let (provider_events, _) = broadcast::channel(4);
        let events_handle = provider_events.clone();

        let mut provider = MockWalletProvider::new();
        provider.expect_accounts().returning(|| {
            Ok(vec![Account::new("0x0000000000000000000000000000000000000006")])
        });
        provider
            .expect_balance_of()
            .returning(|_| Ok(ethers::types::U256::exp10(18)));
        provider.expect_chain_id().returning(|| Ok(1));
        provider
            .expect_subscribe()
            .returning(move || events_handle.subscribe());

        let session = session_over(provider);
        tokio::spawn(session.clone().run());

        session.restore().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(session.snapshot().await.account.is_some());
        assert!(session.snapshot().await.balance.is_some());

        provider_events
            .send(ProviderEvent::AccountsChanged(Vec::new()))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let snapshot = session.snapshot().await;
        assert!(snapshot.account.is_none());
        assert!(snapshot.balance.is_none());
    }
}
