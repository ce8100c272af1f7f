//! Provider change events and user-facing notifications
//!
//! Providers emit `ProviderEvent`s when the authorized account set or the
//! connected network changes; the session loop consumes them. `Notification`s
//! are the dashboard-facing feed (the toast stream of a browser frontend).

use crate::chain::Account;

use serde::Serialize;

/// Out-of-band changes reported by a wallet provider
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// The authorized account set changed; empty means access was revoked
    AccountsChanged(Vec<Account>),
    /// The provider is now on a different network
    ChainChanged(u64),
}

impl ProviderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderEvent::AccountsChanged(_) => "accounts_changed",
            ProviderEvent::ChainChanged(_) => "chain_changed",
        }
    }
}

/// User-facing notifications surfaced by the dashboard
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Connected { account: Account },
    ConnectionFailed { reason: String },
    BalanceRefreshFailed { reason: String },
    NetworkChanged { label: String },
    TransactionSubmitted { hash: String },
    TransactionConfirmed { hash: String },
    TransactionFailed { hash: String },
    TransactionCleared { hash: String },
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Connected { .. } => "connected",
            Notification::ConnectionFailed { .. } => "connection_failed",
            Notification::BalanceRefreshFailed { .. } => "balance_refresh_failed",
            Notification::NetworkChanged { .. } => "network_changed",
            Notification::TransactionSubmitted { .. } => "transaction_submitted",
            Notification::TransactionConfirmed { .. } => "transaction_confirmed",
            Notification::TransactionFailed { .. } => "transaction_failed",
            Notification::TransactionCleared { .. } => "transaction_cleared",
        }
    }

    /// Whether the notification reports a problem
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notification::ConnectionFailed { .. }
                | Notification::BalanceRefreshFailed { .. }
                | Notification::TransactionFailed { .. }
        )
    }
}
