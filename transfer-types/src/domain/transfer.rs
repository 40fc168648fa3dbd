//! Transfer record domain model.
//!
//! A [`TransferRecord`] is the durable, append-only truth about one completed
//! funds movement. Cancellation is a status transition plus a compensating
//! balance mutation, never a deletion, so audit history survives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;
use super::wallet::WalletId;
use crate::error::DomainError;

/// Unique identifier for a TransferRecord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Creates a new random TransferId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransferId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransferId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle status of a transfer record.
///
/// Records are only ever written COMPLETED: a transfer that fails before
/// its ledger write leaves no record at all. PENDING and FAILED round out
/// the status set for ledgers populated by staged writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl TransferStatus {
    /// The status state machine.
    ///
    /// COMPLETED moves to CANCELLED at most once; CANCELLED and FAILED are
    /// terminal. Repeating the current status is never a valid transition.
    pub fn can_transition_to(self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Failed) | (Pending, Cancelled) | (Completed, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Cancelled | TransferStatus::Failed)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
            TransferStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransferStatus::Pending),
            "COMPLETED" => Ok(TransferStatus::Completed),
            "CANCELLED" => Ok(TransferStatus::Cancelled),
            "FAILED" => Ok(TransferStatus::Failed),
            other => Err(DomainError::Validation(format!(
                "Unknown transfer status: {other}"
            ))),
        }
    }
}

/// The durable record of one funds transfer between two wallets.
///
/// Carries the full before/after snapshot quadruple so that cancellation can
/// reverse the exact deltas without re-deriving them from current (possibly
/// already-mutated) balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Unique identifier
    pub id: TransferId,
    /// Caller-supplied key making the transfer at-most-once under retries
    pub idempotency_key: String,
    pub sender_wallet_id: WalletId,
    pub receiver_wallet_id: WalletId,
    /// Amount moved (always > 0)
    pub amount: Money,
    pub status: TransferStatus,
    /// Sender balance before the debit, in minor units
    pub sender_balance_before: i64,
    /// Receiver balance before the credit, in minor units
    pub receiver_balance_before: i64,
    pub sender_balance_after: i64,
    pub receiver_balance_after: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TransferRecord {
    /// Creates a COMPLETED record from the balances observed at apply time.
    ///
    /// The after-balances are derived, not passed in, so the snapshot
    /// invariant (`after = before -/+ amount`) holds by construction. Both
    /// derivations are checked: a receiver balance that would overflow `i64`
    /// is rejected instead of wrapping.
    pub fn completed(
        idempotency_key: String,
        sender_wallet_id: WalletId,
        receiver_wallet_id: WalletId,
        amount: Money,
        sender_balance_before: i64,
        receiver_balance_before: i64,
        description: Option<String>,
    ) -> Result<Self, DomainError> {
        if amount.amount() <= 0 {
            return Err(DomainError::InvalidAmount(amount.amount()));
        }
        if sender_wallet_id == receiver_wallet_id {
            return Err(DomainError::Validation(
                "Sender and receiver wallet must differ".into(),
            ));
        }

        let sender_balance_after = sender_balance_before
            .checked_sub(amount.amount())
            .ok_or(DomainError::Overflow)?;
        let receiver_balance_after = receiver_balance_before
            .checked_add(amount.amount())
            .ok_or(DomainError::Overflow)?;

        Ok(Self {
            id: TransferId::new(),
            idempotency_key,
            sender_wallet_id,
            receiver_wallet_id,
            amount,
            status: TransferStatus::Completed,
            sender_balance_before,
            receiver_balance_before,
            sender_balance_after,
            receiver_balance_after,
            description,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a record from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransferId,
        idempotency_key: String,
        sender_wallet_id: WalletId,
        receiver_wallet_id: WalletId,
        amount: Money,
        status: TransferStatus,
        sender_balance_before: i64,
        receiver_balance_before: i64,
        sender_balance_after: i64,
        receiver_balance_after: i64,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            idempotency_key,
            sender_wallet_id,
            receiver_wallet_id,
            amount,
            status,
            sender_balance_before,
            receiver_balance_before,
            sender_balance_after,
            receiver_balance_after,
            description,
            created_at,
        }
    }
}
