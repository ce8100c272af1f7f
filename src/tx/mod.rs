//! Transaction submission and confirmation tracking

mod submit;
mod watcher;

pub use submit::{validate, SendFlow};
pub use watcher::TransactionWatcher;

use serde::{Deserialize, Serialize};

/// A native-currency transfer as entered by the user
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub recipient: String,
    /// Display-unit amount, e.g. "0.25"
    pub amount: String,
}

/// Lifecycle of a tracked transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// The single transaction a session tracks at a time
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransactionRecord {
    pub hash: String,
    pub status: TxStatus,
}

impl TransactionRecord {
    pub fn pending(hash: String) -> Self {
        Self {
            hash,
            status: TxStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != TxStatus::Pending
    }
}
