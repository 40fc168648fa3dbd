//! # Transfer Core
//!
//! The cross-service funds-transfer and compensation engine:
//!
//! - [`TransferCoordinator`] - the validate/debit/credit/record state
//!   machine and its cancellation path
//! - [`ConsistencyGuard`] - ordered per-wallet locking and idempotency-key
//!   tracking
//! - [`inbound`] - the axum HTTP adapter exposing the coordinator

mod coordinator;
mod guard;
pub mod inbound;

#[cfg(test)]
mod coordinator_tests;

pub use coordinator::{CoordinatorConfig, TransferCoordinator};
pub use guard::{ConsistencyGuard, PairGuard};
