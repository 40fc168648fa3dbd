//! Data Transfer Objects for the inbound API and the wallet-store wire
//! format shared with the remote wallet collaborator.

use serde::{Deserialize, Serialize};

use crate::domain::{Currency, Wallet, WalletId};

// ─────────────────────────────────────────────────────────────────────────────
// Wallet DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a new wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWalletRequest {
    /// Identifier of the owning user
    pub owner: String,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    /// Opening balance in minor units
    #[serde(default)]
    pub opening_balance: i64,
}

fn default_currency() -> Currency {
    Currency::USD
}

/// Wallet as serialized on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletResponse {
    pub id: WalletId,
    pub owner: String,
    /// Balance in minor units
    pub balance: i64,
    pub currency: Currency,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Wallet> for WalletResponse {
    fn from(wallet: &Wallet) -> Self {
        Self {
            id: wallet.id,
            owner: wallet.owner.clone(),
            balance: wallet.balance.amount(),
            currency: wallet.currency(),
            created_at: wallet.created_at,
        }
    }
}

/// Body of a debit/credit call against a wallet store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceAdjustment {
    /// Amount in minor units (always positive; direction is in the path)
    pub amount: i64,
    pub currency: Currency,
}

/// Balance returned by the wallet store after an adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub wallet_id: WalletId,
    pub balance: i64,
    pub currency: Currency,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfer DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to transfer money between two wallets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    /// Caller-supplied key; resubmitting with the same key is safe
    pub idempotency_key: String,
    pub sender_wallet_id: WalletId,
    pub receiver_wallet_id: WalletId,
    /// Amount to transfer in minor units
    pub amount: i64,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Error payload returned on any rejection.
///
/// `available`/`requested` are populated for insufficient-funds rejections
/// so a remote caller can report exact figures without parsing the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Taxonomy kind, e.g. `insufficient_funds` or `busy`
    pub kind: String,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<i64>,
}
