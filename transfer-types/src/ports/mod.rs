//! Port traits (interfaces for adapters).
//!
//! The coordinator depends on these traits, never on concrete stores, so
//! local-vs-remote wallet storage stays a deployment detail.

mod chain;
mod ledger;
mod wallet_store;

pub use chain::ChainAnnouncer;
pub use ledger::LedgerRepository;
pub use wallet_store::WalletStore;
