//! Chain module - the client adapter over a wallet provider
//!
//! This module provides:
//! - The account type and its display forms
//! - The `ChainClient` adapter exposing the five wallet operations
//! - The network label table and explorer links
//! - Base-unit / display-unit conversions

pub mod network;
pub mod units;

pub use units::Balance;

use crate::error::{WalletError, WalletResult};
use crate::events::ProviderEvent;
use crate::provider::{ReceiptSummary, WalletProvider};
use crate::tx::{TransactionRecord, TransferRequest};

use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// A wallet account in its textual address form
///
/// The text is kept exactly as the provider handed it out (checksummed or
/// lowercase); it is only parsed into a binary address at the RPC boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn from_address(address: Address) -> Self {
        Self(to_checksum(&address, None))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a binary address for RPC calls
    pub fn address(&self) -> WalletResult<Address> {
        self.0
            .parse::<Address>()
            .map_err(|e| WalletError::Validation(format!("invalid address {}: {}", self.0, e)))
    }

    /// Abbreviated form for logs and notifications, e.g. `0x1234...abcd`
    pub fn short(&self) -> String {
        if self.0.len() <= 10 {
            return self.0.clone();
        }
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Adapter over an optional wallet provider
///
/// Absence of a provider is a first-class state: presence is a pure boolean
/// test, and every operation that needs the provider fails with
/// `ProviderUnavailable` rather than anything environment-specific.
pub struct ChainClient {
    provider: Option<Arc<dyn WalletProvider>>,
}

impl ChainClient {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self { provider }
    }

    /// Whether a wallet provider is available at all
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> WalletResult<&Arc<dyn WalletProvider>> {
        self.provider.as_ref().ok_or(WalletError::ProviderUnavailable)
    }

    /// Currently authorized account, if any; never prompts and never fails
    pub async fn current_account(&self) -> Option<Account> {
        let provider = self.provider.as_ref()?;
        match provider.accounts().await {
            Ok(accounts) => accounts.into_iter().next(),
            Err(e) => {
                debug!("account query failed: {}", e);
                None
            }
        }
    }

    /// Prompt the provider for account authorization
    ///
    /// Provider-raised errors propagate unchanged.
    pub async fn request_accounts(&self) -> WalletResult<Vec<Account>> {
        self.provider()?.request_accounts().await
    }

    /// Display-unit balance of an account
    pub async fn balance(&self, account: &Account) -> WalletResult<Balance> {
        let wei = self.provider()?.balance_of(account).await?;
        Ok(Balance::from_wei(wei))
    }

    /// Human-readable network label; never fails
    pub async fn network_label(&self) -> String {
        let Some(provider) = self.provider.as_ref() else {
            return network::UNKNOWN_LABEL.to_string();
        };

        match provider.chain_id().await {
            Ok(id) => network::label(id),
            Err(e) => {
                debug!("network query failed: {}", e);
                network::UNKNOWN_LABEL.to_string()
            }
        }
    }

    /// Submit a validated transfer; returns the pending record
    ///
    /// Any provider-level failure surfaces as `SubmissionFailed` with the
    /// provider's reason.
    pub async fn submit(&self, request: &TransferRequest) -> WalletResult<TransactionRecord> {
        let provider = self.provider()?;

        let recipient = Account::new(request.recipient.clone());
        let value = units::parse_amount(&request.amount)?;

        let hash = provider
            .send_transfer(&recipient, value)
            .await
            .map_err(|e| match e {
                WalletError::SubmissionFailed(reason) => WalletError::SubmissionFailed(reason),
                other => WalletError::SubmissionFailed(other.to_string()),
            })?;

        Ok(TransactionRecord::pending(hash))
    }

    /// Whether the network knows the transaction
    pub async fn transaction_exists(&self, hash: &str) -> WalletResult<bool> {
        self.provider()?.find_transaction(hash).await
    }

    /// Receipt for a transaction, `None` while unmined
    pub async fn receipt(&self, hash: &str) -> WalletResult<Option<ReceiptSummary>> {
        self.provider()?.transaction_receipt(hash).await
    }

    /// Provider change events, `None` without a provider
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        self.provider.as_ref().map(|p| p.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockWalletProvider;
    use ethers::types::U256;

    fn bare_client() -> ChainClient {
        ChainClient::new(None)
    }

    #[tokio::test]
    async fn no_provider_is_provider_unavailable() {
        let client = bare_client();
        assert!(!client.has_provider());

        assert!(matches!(
            client.request_accounts().await,
            Err(WalletError::ProviderUnavailable)
        ));
        assert!(matches!(
            client.balance(&Account::new("0x0000000000000000000000000000000000000001")).await,
            Err(WalletError::ProviderUnavailable)
        ));
        let request = TransferRequest {
            recipient: "0x0000000000000000000000000000000000000001".to_string(),
            amount: "1".to_string(),
        };
        assert!(matches!(
            client.submit(&request).await,
            Err(WalletError::ProviderUnavailable)
        ));
    }

    #[tokio::test]
    async fn no_provider_account_and_label_degrade_quietly() {
        let client = bare_client();
        assert_eq!(client.current_account().await, None);
        assert_eq!(client.network_label().await, "Unknown");
        assert!(client.subscribe().is_none());
    }

    #[tokio::test]
    async fn current_account_swallows_provider_errors() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_accounts()
            .returning(|| Err(WalletError::Provider("rpc down".to_string())));

        let client = ChainClient::new(Some(Arc::new(provider)));
        assert_eq!(client.current_account().await, None);
    }

    #[tokio::test]
    async fn network_label_swallows_provider_errors() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_chain_id()
            .returning(|| Err(WalletError::Provider("rpc down".to_string())));

        let client = ChainClient::new(Some(Arc::new(provider)));
        assert_eq!(client.network_label().await, "Unknown");
    }

    #[tokio::test]
    async fn submit_wraps_provider_failures() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_send_transfer()
            .returning(|_, _| Err(WalletError::Provider("connection reset".to_string())));

        let client = ChainClient::new(Some(Arc::new(provider)));
        let request = TransferRequest {
            recipient: "0x0000000000000000000000000000000000000001".to_string(),
            amount: "0.5".to_string(),
        };

        match client.submit(&request).await {
            Err(WalletError::SubmissionFailed(reason)) => {
                assert!(reason.contains("connection reset"))
            }
            other => panic!("expected SubmissionFailed, got {:?}", other.map(|r| r.hash)),
        }
    }

    #[tokio::test]
    async fn submit_returns_pending_record() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_send_transfer()
            .withf(|_, value| *value == U256::exp10(17) * 5)
            .returning(|_, _| Ok("0xabc123".to_string()));

        let client = ChainClient::new(Some(Arc::new(provider)));
        let request = TransferRequest {
            recipient: "0x0000000000000000000000000000000000000001".to_string(),
            amount: "0.5".to_string(),
        };

        let record = client.submit(&request).await.unwrap();
        assert_eq!(record.hash, "0xabc123");
        assert_eq!(record.status, crate::tx::TxStatus::Pending);
    }

    #[test]
    fn short_form_keeps_ends() {
        let account = Account::new("0xAbCd000000000000000000000000000000001234");
        assert_eq!(account.short(), "0xAbCd...1234");
    }
}
