//! # Transfer Stores
//!
//! Concrete adapters for the wallet-store, ledger, and side-channel ports:
//!
//! - [`InMemoryWalletStore`] / [`InMemoryLedger`] - local deployment and tests
//! - [`HttpWalletStore`] - remote wallet/account collaborator over HTTP
//! - [`SqliteLedger`] - durable append-only transfer ledger
//! - [`HttpChainAnnouncer`] - fire-and-forget blockchain side channel

mod chain;
mod http;
mod memory;
mod sqlite;
mod types;


pub use chain::HttpChainAnnouncer;
pub use http::HttpWalletStore;
pub use memory::{InMemoryLedger, InMemoryWalletStore};
pub use sqlite::SqliteLedger;
