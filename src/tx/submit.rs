//! Transfer validation and submission
//!
//! Validation is synchronous and runs before any network call; a failure
//! surfaces an inline message and the provider is never contacted.

use super::{TransactionRecord, TransferRequest};
use crate::chain::ChainClient;
use crate::error::{WalletError, WalletResult};

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

lazy_static! {
    static ref RECIPIENT_RE: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
}

/// Validate a transfer request locally
pub fn validate(request: &TransferRequest) -> WalletResult<()> {
    if !RECIPIENT_RE.is_match(&request.recipient) {
        return Err(WalletError::Validation(
            "recipient must be a 0x-prefixed 40-character hex address".to_string(),
        ));
    }

    match request.amount.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(()),
        _ => Err(WalletError::Validation(
            "amount must be a number greater than zero".to_string(),
        )),
    }
}

/// Validated transfer submission
pub struct SendFlow {
    chain: Arc<ChainClient>,
}

impl SendFlow {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }

    /// Validate, then submit through the provider
    ///
    /// On failure the caller's inputs are untouched; the provider's reason is
    /// carried verbatim so the user can correct and resubmit.
    pub async fn send(&self, request: &TransferRequest) -> WalletResult<TransactionRecord> {
        validate(request)?;
        debug!("submitting transfer of {} to {}", request.amount, request.recipient);
        self.chain.submit(request).await
    }
}
