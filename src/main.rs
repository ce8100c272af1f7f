//! walletdeck - wallet dashboard service
//!
//! Connects a wallet provider, tracks the active account's balance and
//! network identity, and submits native-currency transfers with
//! confirmation tracking, all exposed through a small HTTP API.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

mod api;
mod chain;
mod config;
mod connection;
mod error;
mod events;
mod metrics;
mod poller;
mod provider;
mod session;
mod tx;

use chain::ChainClient;
use config::Settings;
use metrics::MetricsServer;
use provider::{RpcProvider, WalletProvider};
use session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting walletdeck v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;

    // Build the wallet provider. A missing endpoint or signer key is not
    // fatal: the dashboard runs and serves the install affordance instead.
    let provider = build_provider(&settings);
    let chain = Arc::new(ChainClient::new(provider));
    if chain.has_provider() {
        info!("Wallet provider connected to {}", settings.node.rpc_url);
    } else {
        warn!(
            "No wallet provider available; connect requests will point at {}",
            settings.wallet.install_url
        );
    }

    let session = Arc::new(Session::new(chain, &settings));

    // Silent reconnection path: adopt an already-authorized account.
    session.restore().await;

    // Start the session event loop
    let session_handle = tokio::spawn(session.clone().run());

    // Start API server
    let api_handle = tokio::spawn({
        let session = session.clone();
        let api_config = settings.api.clone();
        let explorer = settings.explorer.tx_url.clone();
        async move {
            if let Err(e) = api::run_server(api_config, session, explorer).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("walletdeck is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Graceful shutdown
    session.stop().await;

    // Abort background tasks
    api_handle.abort();
    session_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("walletdeck stopped");
    Ok(())
}

fn build_provider(settings: &Settings) -> Option<Arc<dyn WalletProvider>> {
    if !settings.has_node() {
        return None;
    }

    let key = match std::env::var(&settings.wallet.private_key_env) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            warn!(
                "Signer key env {} not set; running without a provider",
                settings.wallet.private_key_env
            );
            return None;
        }
    };

    match RpcProvider::connect(&settings.node.rpc_url, &key, settings.request_timeout()) {
        Ok(provider) => Some(Arc::new(provider) as Arc<dyn WalletProvider>),
        Err(e) => {
            warn!("Wallet provider unavailable: {}", e);
            None
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,walletdeck=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
