//! Configuration loading from environment.

use std::env;
use std::time::Duration;

/// Application configuration.
///
/// The optional URLs select adapters: absent means the in-process
/// implementation, present means the remote / on-disk one.
pub struct Config {
    pub port: u16,
    /// Base URL of a remote wallet service; in-memory store when unset.
    pub wallet_service_url: Option<String>,
    /// SQLite URL for the ledger; in-memory ledger when unset.
    pub ledger_database_url: Option<String>,
    /// Endpoint of the blockchain side channel; disabled when unset.
    pub chain_service_url: Option<String>,
    pub lock_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let lock_timeout_ms: u64 = env::var("LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()?;

        Ok(Self {
            port,
            wallet_service_url: env::var("WALLET_SERVICE_URL").ok(),
            ledger_database_url: env::var("LEDGER_DATABASE_URL").ok(),
            chain_service_url: env::var("CHAIN_SERVICE_URL").ok(),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
        })
    }
}
