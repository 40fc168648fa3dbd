//! Wallet domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{Currency, Money};
use crate::error::DomainError;

/// Unique identifier for a Wallet.
///
/// `Ord` matters here: the coordinator acquires per-wallet locks in ascending
/// id order, which is what makes deadlock between concurrent transfer pairs
/// structurally impossible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    /// Creates a new random WalletId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a WalletId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WalletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WalletId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A balance-bearing account in one currency, owned by one user.
///
/// The balance is only ever mutated through [`Wallet::credit`] and
/// [`Wallet::debit`]; both keep the `balance >= 0` invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique identifier
    pub id: WalletId,
    /// Identifier of the owning user
    pub owner: String,
    /// Current balance (includes currency information)
    pub balance: Money,
    /// When the wallet was created
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Creates a new wallet with the given opening balance.
    pub fn new(owner: String, currency: Currency, opening_balance: i64) -> Result<Self, DomainError> {
        if owner.trim().is_empty() {
            return Err(DomainError::Validation(
                "Wallet owner cannot be empty".into(),
            ));
        }

        Ok(Self {
            id: WalletId::new(),
            owner,
            balance: Money::new(opening_balance, currency)?,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a wallet from stored fields.
    pub fn from_parts(
        id: WalletId,
        owner: String,
        balance: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            balance,
            created_at,
        }
    }

    /// Returns the currency of this wallet.
    pub fn currency(&self) -> Currency {
        self.balance.currency()
    }

    /// Credits (adds) money to the wallet.
    pub fn credit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.balance = self.balance.checked_add(amount)?;
        Ok(())
    }

    /// Debits (subtracts) money from the wallet; rejects overdraw.
    pub fn debit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.balance = self.balance.checked_sub(amount)?;
        Ok(())
    }

    /// Checks whether a debit of `amount` would succeed.
    pub fn has_sufficient_funds(&self, amount: &Money) -> bool {
        self.balance.covers(amount)
    }
}
