//! HTTP API for the dashboard frontend
//!
//! The browser page drives the session through these endpoints and polls
//! `/status` for the snapshot. CORS is open because the frontend is served
//! from its own origin.

use crate::chain::network;
use crate::config::ApiConfig;
use crate::connection::ConnectOutcome;
use crate::error::{WalletError, WalletResult};
use crate::events::Notification;
use crate::session::Session;
use crate::tx::{TransactionRecord, TransferRequest};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub explorer_tx_url: String,
}

/// Run the HTTP API server
pub async fn run_server(
    config: ApiConfig,
    session: Arc<Session>,
    explorer_tx_url: String,
) -> WalletResult<()> {
    let state = AppState {
        session,
        explorer_tx_url,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/connect", post(connect))
        .route("/send", post(send))
        .route("/transaction", get(get_transaction))
        .route("/transaction/dismiss", post(dismiss))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WalletError::Config(format!("failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| WalletError::Config(e.to_string()))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Full dashboard snapshot
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.session.snapshot().await;

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.session.has_provider(),
        account: snapshot.account.map(|a| a.as_str().to_string()),
        network: snapshot.network,
        balance: snapshot.balance.map(|b| b.to_string()),
        transaction: snapshot.transaction,
        notifications: snapshot.notifications.into_iter().collect(),
    })
}

/// Connect the wallet, or report where to install one
async fn connect(State(state): State<AppState>) -> Response {
    match state.session.connect().await {
        Ok(ConnectOutcome::Connected(account)) => (
            StatusCode::OK,
            Json(ConnectResponse {
                connected: true,
                account: Some(account.as_str().to_string()),
                install_url: None,
            }),
        )
            .into_response(),
        Ok(ConnectOutcome::InstallRequired { url }) => (
            StatusCode::OK,
            Json(ConnectResponse {
                connected: false,
                account: None,
                install_url: Some(url),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Submit a transfer
async fn send(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Response {
    match state.session.send(request).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Currently tracked transaction with its explorer link
async fn get_transaction(State(state): State<AppState>) -> Response {
    let snapshot = state.session.snapshot().await;

    match snapshot.transaction {
        Some(record) => {
            let explorer_url = network::explorer_tx_url(&state.explorer_tx_url, &record.hash);
            (
                StatusCode::OK,
                Json(TransactionResponse {
                    record,
                    explorer_url,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no transaction is being tracked".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Dismiss a terminal transaction
async fn dismiss(State(state): State<AppState>) -> Response {
    match state.session.dismiss().await {
        Ok(()) => (StatusCode::OK, Json(DismissResponse { dismissed: true })).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(error: WalletError) -> Response {
    let status = match &error {
        WalletError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WalletError::InFlight => StatusCode::CONFLICT,
        WalletError::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        WalletError::UserRejected(_) => StatusCode::FORBIDDEN,
        WalletError::SubmissionFailed(_) => StatusCode::BAD_GATEWAY,
        WalletError::LookupFailed(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(ErrorResponse {
        error: error.to_string(),
    }))
        .into_response()
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    provider: bool,
    account: Option<String>,
    network: Option<String>,
    balance: Option<String>,
    transaction: Option<TransactionRecord>,
    notifications: Vec<Notification>,
}

#[derive(Serialize)]
struct ConnectResponse {
    connected: bool,
    account: Option<String>,
    install_url: Option<String>,
}

#[derive(Serialize)]
struct TransactionResponse {
    record: TransactionRecord,
    explorer_url: String,
}

#[derive(Serialize)]
struct DismissResponse {
    dismissed: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}
