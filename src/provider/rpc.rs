//! JSON-RPC wallet provider backed by a local signer

use super::{ReceiptSummary, WalletProvider};
use crate::chain::Account;
use crate::error::{WalletError, WalletResult};
use crate::events::ProviderEvent;

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{TransactionRequest, H256, U256};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Gas limit of a plain native-currency transfer
const TRANSFER_GAS: u64 = 21_000;

/// Wallet provider over an HTTP JSON-RPC endpoint
///
/// Authorization mirrors the `eth_accounts` / `eth_requestAccounts` split:
/// the signer's account is not visible until access has been granted once
/// for the session.
pub struct RpcProvider {
    rpc: Provider<Http>,
    wallet: LocalWallet,
    request_timeout: Duration,
    authorized: RwLock<bool>,
    known_chain_id: RwLock<Option<u64>>,
    event_tx: broadcast::Sender<ProviderEvent>,
}

impl RpcProvider {
    /// Create a provider for an RPC endpoint and a hex-encoded signer key
    pub fn connect(url: &str, key: &str, request_timeout: Duration) -> WalletResult<Self> {
        let rpc = Provider::<Http>::try_from(url)
            .map_err(|e| WalletError::Config(format!("invalid RPC endpoint {}: {}", url, e)))?
            .interval(Duration::from_millis(100));

        let wallet = key
            .parse::<LocalWallet>()
            .map_err(|e| WalletError::Config(format!("invalid signer key: {}", e)))?;

        let (event_tx, _) = broadcast::channel(64);

        debug!("RPC provider created for {}", url);

        Ok(Self {
            rpc,
            wallet,
            request_timeout,
            authorized: RwLock::new(false),
            known_chain_id: RwLock::new(None),
            event_tx,
        })
    }

    fn account(&self) -> Account {
        Account::from_address(self.wallet.address())
    }

    fn classify_send_error(message: String) -> WalletError {
        if message.contains("insufficient funds") {
            warn!("transfer rejected: insufficient funds");
        } else if message.contains("nonce too low") {
            warn!("transfer rejected: stale nonce");
        }
        WalletError::SubmissionFailed(message)
    }
}

fn parse_hash(hash: &str) -> WalletResult<H256> {
    hash.parse::<H256>()
        .map_err(|e| WalletError::LookupFailed(format!("invalid transaction hash {}: {}", hash, e)))
}

#[async_trait]
impl WalletProvider for RpcProvider {
    async fn accounts(&self) -> WalletResult<Vec<Account>> {
        if *self.authorized.read().await {
            Ok(vec![self.account()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_accounts(&self) -> WalletResult<Vec<Account>> {
        let account = self.account();

        let mut authorized = self.authorized.write().await;
        if !*authorized {
            *authorized = true;
            info!("authorized account {}", account.short());
            let _ = self
                .event_tx
                .send(ProviderEvent::AccountsChanged(vec![account.clone()]));
        }

        Ok(vec![account])
    }

    async fn balance_of(&self, account: &Account) -> WalletResult<U256> {
        let address = account.address()?;
        self.rpc
            .get_balance(address, None)
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))
    }

    async fn chain_id(&self) -> WalletResult<u64> {
        let id = self
            .rpc
            .get_chainid()
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))?
            .as_u64();

        let mut known = self.known_chain_id.write().await;
        if let Some(previous) = *known {
            if previous != id {
                info!("network changed from chain {} to chain {}", previous, id);
                let _ = self.event_tx.send(ProviderEvent::ChainChanged(id));
            }
        }
        *known = Some(id);

        Ok(id)
    }

    async fn send_transfer(&self, to: &Account, value_wei: U256) -> WalletResult<String> {
        let recipient = to.address()?;
        let sender = self.wallet.address();

        let nonce = self
            .rpc
            .get_transaction_count(sender, None)
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))?;
        let gas_price = self
            .rpc
            .get_gas_price()
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))?;
        let chain_id = self.chain_id().await?;

        let tx = TransactionRequest::new()
            .from(sender)
            .to(recipient)
            .value(value_wei)
            .nonce(nonce)
            .gas(TRANSFER_GAS)
            .gas_price(gas_price);
        let tx = TypedTransaction::Legacy(tx);

        let wallet = self.wallet.clone().with_chain_id(chain_id);
        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| WalletError::SubmissionFailed(e.to_string()))?;
        let raw = tx.rlp_signed(&signature);

        let pending = tokio::time::timeout(self.request_timeout, self.rpc.send_raw_transaction(raw))
            .await
            .map_err(|_| WalletError::Timeout {
                operation: "send transaction".to_string(),
            })?
            .map_err(|e| Self::classify_send_error(e.to_string()))?;

        let hash = format!("{:?}", pending.tx_hash());
        info!("transfer submitted: {}", hash);
        Ok(hash)
    }

    async fn find_transaction(&self, hash: &str) -> WalletResult<bool> {
        let hash = parse_hash(hash)?;
        let tx = self
            .rpc
            .get_transaction(hash)
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))?;
        Ok(tx.is_some())
    }

    async fn transaction_receipt(&self, hash: &str) -> WalletResult<Option<ReceiptSummary>> {
        let hash = parse_hash(hash)?;
        let receipt = self
            .rpc
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))?;

        Ok(receipt.map(|r| ReceiptSummary {
            succeeded: r.status == Some(1.into()),
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.event_tx.subscribe()
    }
}
