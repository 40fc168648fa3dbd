//! Database row structs for the SQLite ledger.
//!
//! Ids, currency, status, and timestamps are stored as TEXT and parsed back
//! into domain types on the way out; a row that fails to parse is a storage
//! corruption, surfaced as `LedgerError::Storage`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use transfer_types::{
    Currency, LedgerError, Money, TransferId, TransferRecord, TransferStatus, WalletId,
};

/// Transfer row from the database.
#[derive(FromRow)]
pub struct DbTransferRecord {
    pub id: String,
    pub idempotency_key: String,
    pub sender_wallet_id: String,
    pub receiver_wallet_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub sender_balance_before: i64,
    pub receiver_balance_before: i64,
    pub sender_balance_after: i64,
    pub receiver_balance_after: i64,
    pub description: Option<String>,
    pub created_at: String,
}

fn corrupt(field: &str, err: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(format!("corrupt {field} column: {err}"))
}

impl DbTransferRecord {
    pub fn into_domain(self) -> Result<TransferRecord, LedgerError> {
        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt("id", e))?;
        let sender = Uuid::parse_str(&self.sender_wallet_id)
            .map_err(|e| corrupt("sender_wallet_id", e))?;
        let receiver = Uuid::parse_str(&self.receiver_wallet_id)
            .map_err(|e| corrupt("receiver_wallet_id", e))?;
        let currency =
            Currency::from_str(&self.currency).map_err(|e| corrupt("currency", e))?;
        let status =
            TransferStatus::from_str(&self.status).map_err(|e| corrupt("status", e))?;
        let amount = Money::new(self.amount, currency).map_err(|e| corrupt("amount", e))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt("created_at", e))?
            .with_timezone(&Utc);

        Ok(TransferRecord::from_parts(
            TransferId::from_uuid(id),
            self.idempotency_key,
            WalletId::from_uuid(sender),
            WalletId::from_uuid(receiver),
            amount,
            status,
            self.sender_balance_before,
            self.receiver_balance_before,
            self.sender_balance_after,
            self.receiver_balance_after,
            self.description,
            created_at,
        ))
    }
}

/// Status-only row used by `update_status` before applying a transition.
#[derive(FromRow)]
pub struct DbTransferStatus {
    pub status: String,
}
