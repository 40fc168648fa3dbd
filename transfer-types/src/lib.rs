//! # Transfer Types
//!
//! Domain types and port traits for the wallet transfer engine.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate is the innermost core of the hexagonal layout:
//! - `domain/` - Pure domain types (Money, Wallet, TransferRecord)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Layered error taxonomy

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Currency, Money, TransferId, TransferRecord, TransferStatus, Wallet, WalletId,
};
pub use dto::*;
pub use error::{DomainError, LedgerError, StoreError, TransferError};
pub use ports::{ChainAnnouncer, LedgerRepository, WalletStore};
