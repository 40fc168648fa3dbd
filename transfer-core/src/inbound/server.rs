//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use transfer_types::{LedgerRepository, WalletStore};

use super::handlers::{self, AppState};
use crate::TransferCoordinator;

/// HTTP server for the transfer API.
pub struct HttpServer<W: WalletStore, L: LedgerRepository> {
    state: Arc<AppState<W, L>>,
}

impl<W: WalletStore, L: LedgerRepository> HttpServer<W, L> {
    /// Creates a new HTTP server around the given coordinator.
    pub fn new(coordinator: TransferCoordinator<W, L>) -> Self {
        Self {
            state: Arc::new(AppState { coordinator }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/wallets", post(handlers::create_wallet::<W, L>))
            .route("/api/wallets/{id}", get(handlers::get_wallet::<W, L>))
            .route("/api/transfers", post(handlers::create_transfer::<W, L>))
            .route("/api/transfers", get(handlers::list_transfers::<W, L>))
            .route("/api/transfers/{id}", get(handlers::get_transfer::<W, L>))
            .route(
                "/api/transfers/{id}/cancel",
                post(handlers::cancel_transfer::<W, L>),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
