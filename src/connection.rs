//! Connection controller - owns the active account
//!
//! Reconnection is silent (no prompt); an explicit connect either prompts
//! through the provider or, when none is present, points the user at an
//! installation resource. A failed connect leaves the state untouched so
//! retrying is always safe.

use crate::chain::{Account, ChainClient};
use crate::error::{WalletError, WalletResult};
use crate::events::Notification;

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

/// Result of an explicit connect action
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    Connected(Account),
    /// No provider present; the user is redirected to an installer.
    /// A terminal affordance, not an error.
    InstallRequired { url: String },
}

pub struct ConnectionController {
    chain: Arc<ChainClient>,
    install_url: String,
    account: RwLock<Option<Account>>,
    notices: broadcast::Sender<Notification>,
}

impl ConnectionController {
    pub fn new(
        chain: Arc<ChainClient>,
        install_url: String,
        notices: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            chain,
            install_url,
            account: RwLock::new(None),
            notices,
        }
    }

    /// Adopt an already-authorized account without prompting
    pub async fn restore(&self) -> Option<Account> {
        let account = self.chain.current_account().await?;
        info!("restored connection to {}", account.short());
        self.adopt(account.clone()).await;
        Some(account)
    }

    /// Explicit user-initiated connect
    pub async fn connect(&self) -> WalletResult<ConnectOutcome> {
        if !self.chain.has_provider() {
            return Ok(ConnectOutcome::InstallRequired {
                url: self.install_url.clone(),
            });
        }

        match self.chain.request_accounts().await {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(account) => {
                    self.adopt(account.clone()).await;
                    Ok(ConnectOutcome::Connected(account))
                }
                None => Err(WalletError::UserRejected(
                    "no account authorized".to_string(),
                )),
            },
            Err(e) => {
                let _ = self.notices.send(Notification::ConnectionFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Set the active account and notify listeners at most once per adoption
    pub async fn adopt(&self, account: Account) {
        let mut active = self.account.write().await;
        if active.as_ref() == Some(&account) {
            return;
        }
        info!("connected account {}", account.short());
        *active = Some(account.clone());
        drop(active);

        let _ = self.notices.send(Notification::Connected { account });
    }

    pub async fn clear(&self) {
        *self.account.write().await = None;
    }

    pub async fn account(&self) -> Option<Account> {
        self.account.read().await.clone()
    }
}
