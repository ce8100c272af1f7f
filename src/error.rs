//! Error types for walletdeck

use thiserror::Error;

/// Main error type for wallet operations
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("no wallet provider is available")]
    ProviderUnavailable,

    #[error("authorization rejected: {0}")]
    UserRejected(String),

    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),

    #[error("{0}")]
    Validation(String),

    #[error("transaction lookup failed: {0}")]
    LookupFailed(String),

    #[error("timed out waiting for {operation}")]
    Timeout { operation: String },

    #[error("a transaction is already being tracked")]
    InFlight,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl WalletError {
    /// Check if the error is transient (the next poll tick retries)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WalletError::Provider(_)
                | WalletError::Timeout { .. }
                | WalletError::LookupFailed(_)
        )
    }

}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
