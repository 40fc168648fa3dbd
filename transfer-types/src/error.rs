//! Error types for the transfer engine.
//!
//! Layered like the rest of the workspace: `DomainError` for business-rule
//! violations, `StoreError` for the wallet store port, `LedgerError` for the
//! ledger port, and `TransferError` as the coordinator's caller-facing
//! taxonomy. Every `TransferError` carries a stable machine-readable
//! [`TransferError::kind`] so callers can tell "retry safely" from "do not
//! retry".

use crate::domain::{Currency, TransferId, TransferStatus, WalletId};

/// Domain-level errors (business logic violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Balance overflow")]
    Overflow,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Wallet store port errors.
///
/// `Unavailable` covers transport failures (timeout, 5xx, connection
/// refused) of a remote store; callers treat it as retryable, unlike the
/// functional rejections.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Rejected by wallet store: {0}")]
    Rejected(String),

    #[error("Wallet store unavailable: {0}")]
    Unavailable(String),
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                available,
                requested,
            } => StoreError::InsufficientFunds {
                available,
                requested,
            },
            DomainError::CurrencyMismatch { expected, got } => {
                StoreError::CurrencyMismatch { expected, got }
            }
            other => StoreError::Rejected(other.to_string()),
        }
    }
}

/// Ledger repository port errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Transfer record not found")]
    NotFound,

    #[error("A record already exists for idempotency key {0}")]
    DuplicateKey(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("Ledger storage error: {0}")]
    Storage(String),
}

/// Coordinator-level errors surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error(
        "Cannot reverse transfer: receiver balance {available} is below refund amount {requested}"
    )]
    InsufficientFundsOnReversal { available: i64, requested: i64 },

    #[error("Transfer not found: {0}")]
    TransferNotFound(TransferId),

    #[error("Transfer is {0}, only COMPLETED transfers can be cancelled")]
    InvalidState(TransferStatus),

    #[error("Wallets are busy, retry with the same idempotency key")]
    Busy,

    #[error("Temporarily unavailable: {0}")]
    Unavailable(String),

    #[error(
        "Reconciliation failure: wallet {wallet} may be inconsistent by {amount} minor units: {detail}"
    )]
    Reconciliation {
        wallet: WalletId,
        amount: i64,
        detail: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Stable taxonomy kind included in every rejection payload.
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::WalletNotFound(_) | TransferError::TransferNotFound(_) => "not_found",
            TransferError::InvalidAmount(_)
            | TransferError::CurrencyMismatch { .. }
            | TransferError::Validation(_) => "validation",
            TransferError::InsufficientFunds { .. } => "insufficient_funds",
            TransferError::InsufficientFundsOnReversal { .. } => "insufficient_funds_on_reversal",
            TransferError::InvalidState(_) => "invalid_state",
            TransferError::Busy => "busy",
            TransferError::Unavailable(_) => "unavailable",
            TransferError::Reconciliation { .. } => "reconciliation_failure",
            TransferError::Internal(_) => "internal",
        }
    }

    /// True if the caller may retry with the same idempotency key.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Busy | TransferError::Unavailable(_))
    }
}

impl From<StoreError> for TransferError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WalletNotFound(id) => TransferError::WalletNotFound(id),
            StoreError::InsufficientFunds {
                available,
                requested,
            } => TransferError::InsufficientFunds {
                available,
                requested,
            },
            StoreError::CurrencyMismatch { expected, got } => {
                TransferError::CurrencyMismatch { expected, got }
            }
            StoreError::Rejected(msg) => TransferError::Validation(msg),
            StoreError::Unavailable(msg) => TransferError::Unavailable(msg),
        }
    }
}

impl From<LedgerError> for TransferError {
    fn from(err: LedgerError) -> Self {
        match err {
            // Store/network hiccups are retryable; the rest indicate a bug
            // in the coordinator's own sequencing.
            LedgerError::Storage(msg) => TransferError::Unavailable(msg),
            other => TransferError::Internal(other.to_string()),
        }
    }
}

impl From<DomainError> for TransferError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NegativeAmount => TransferError::InvalidAmount(-1),
            DomainError::InvalidAmount(v) => TransferError::InvalidAmount(v),
            DomainError::Overflow => TransferError::Validation("Balance overflow".into()),
            DomainError::CurrencyMismatch { expected, got } => {
                TransferError::CurrencyMismatch { expected, got }
            }
            DomainError::InsufficientFunds {
                available,
                requested,
            } => TransferError::InsufficientFunds {
                available,
                requested,
            },
            DomainError::Validation(msg) => TransferError::Validation(msg),
        }
    }
}
