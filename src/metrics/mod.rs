//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Connection state and balance
//! - Balance fetch outcomes
//! - Transaction outcomes

use crate::error::{WalletError, WalletResult};

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_int_counter, Encoder, Gauge, IntCounter, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Connection metrics
    pub static ref WALLET_CONNECTED: Gauge = register_gauge!(
        "walletdeck_connected",
        "Wallet connection status (1=connected, 0=disconnected)"
    ).unwrap();

    pub static ref WALLET_BALANCE: Gauge = register_gauge!(
        "walletdeck_balance_eth",
        "Last fetched balance of the active account in ether"
    ).unwrap();

    // Balance fetch metrics
    pub static ref BALANCE_FETCHES: IntCounter = register_int_counter!(
        "walletdeck_balance_fetches_total",
        "Total successful balance fetches"
    ).unwrap();

    pub static ref BALANCE_FETCH_ERRORS: IntCounter = register_int_counter!(
        "walletdeck_balance_fetch_errors_total",
        "Total failed balance fetches"
    ).unwrap();

    // Transaction metrics
    pub static ref TX_SUBMITTED: IntCounter = register_int_counter!(
        "walletdeck_transactions_submitted_total",
        "Total transactions submitted"
    ).unwrap();

    pub static ref TX_CONFIRMED: IntCounter = register_int_counter!(
        "walletdeck_transactions_confirmed_total",
        "Total transactions confirmed"
    ).unwrap();

    pub static ref TX_FAILED: IntCounter = register_int_counter!(
        "walletdeck_transactions_failed_total",
        "Total transactions failed"
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> WalletResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| WalletError::Config(format!("failed to bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| WalletError::Config(e.to_string()))?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

// Helper functions to record metrics

pub fn record_connected(connected: bool) {
    WALLET_CONNECTED.set(if connected { 1.0 } else { 0.0 });
}

pub fn record_balance(balance_eth: f64) {
    WALLET_BALANCE.set(balance_eth);
}

pub fn record_balance_fetch() {
    BALANCE_FETCHES.inc();
}

pub fn record_balance_fetch_error() {
    BALANCE_FETCH_ERRORS.inc();
}

pub fn record_tx_submitted() {
    TX_SUBMITTED.inc();
}

pub fn record_tx_confirmed() {
    TX_CONFIRMED.inc();
}

pub fn record_tx_failed() {
    TX_FAILED.inc();
}
