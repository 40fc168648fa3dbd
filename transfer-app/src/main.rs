//! # Transfer Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Select wallet store, ledger, and side-channel adapters
//! - Create the transfer coordinator
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transfer_core::{CoordinatorConfig, TransferCoordinator, inbound::HttpServer};
use transfer_stores::{
    HttpChainAnnouncer, HttpWalletStore, InMemoryLedger, InMemoryWalletStore, SqliteLedger,
};
use transfer_types::{LedgerRepository, WalletStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,transfer_app=debug,transfer_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting transfer server on port {}", config.port);

    let wallets: Arc<dyn WalletStore> = match &config.wallet_service_url {
        Some(url) => {
            tracing::info!("Using remote wallet service at {url}");
            Arc::new(HttpWalletStore::new(url.clone()))
        }
        None => {
            tracing::info!("Using in-memory wallet store");
            Arc::new(InMemoryWalletStore::new())
        }
    };

    let ledger: Arc<dyn LedgerRepository> = match &config.ledger_database_url {
        Some(url) => {
            tracing::info!("Using SQLite ledger at {url}");
            Arc::new(SqliteLedger::new(url).await?)
        }
        None => {
            tracing::info!("Using in-memory ledger");
            Arc::new(InMemoryLedger::new())
        }
    };

    let coordinator_config = CoordinatorConfig {
        lock_timeout: config.lock_timeout,
        ..CoordinatorConfig::default()
    };

    let mut coordinator = TransferCoordinator::with_config(wallets, ledger, coordinator_config);
    if let Some(url) = &config.chain_service_url {
        tracing::info!("Announcing transfers to {url}");
        coordinator = coordinator.with_announcer(Arc::new(HttpChainAnnouncer::new(url.clone())));
    }

    // Create and run the HTTP server
    let server = HttpServer::new(coordinator);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    Ok(())
}
