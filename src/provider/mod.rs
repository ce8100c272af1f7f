//! Wallet provider boundary
//!
//! The provider is the external interface that authorizes account access and
//! relays signed transactions to the network. It is always constructed and
//! injected explicitly - components never reach for ambient state - so the
//! test suite can substitute a double.

mod rpc;

pub use rpc::RpcProvider;

use crate::chain::Account;
use crate::error::WalletResult;
use crate::events::ProviderEvent;

use async_trait::async_trait;
use ethers::types::U256;
use tokio::sync::broadcast;

/// Outcome carried by the receipt of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub succeeded: bool,
}

/// Interface to an external wallet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts currently authorized for this session; never prompts.
    async fn accounts(&self) -> WalletResult<Vec<Account>>;

    /// Prompt for account authorization.
    async fn request_accounts(&self) -> WalletResult<Vec<Account>>;

    /// Base-unit balance of an account.
    async fn balance_of(&self, account: &Account) -> WalletResult<U256>;

    /// Numeric identity of the connected network.
    async fn chain_id(&self) -> WalletResult<u64>;

    /// Sign and submit a native-currency transfer; returns the transaction hash.
    async fn send_transfer(&self, to: &Account, value_wei: U256) -> WalletResult<String>;

    /// Whether the network knows the transaction at all.
    async fn find_transaction(&self, hash: &str) -> WalletResult<bool>;

    /// Receipt for a mined transaction, `None` while still pending.
    async fn transaction_receipt(&self, hash: &str) -> WalletResult<Option<ReceiptSummary>>;

    /// Subscribe to account and network change events.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
