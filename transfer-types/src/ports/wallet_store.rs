//! Wallet store port.
//!
//! The store owns balances and nothing else; the *why* of every mutation
//! lives in the ledger. `debit` must be atomic relative to concurrent
//! `debit`/`credit` on the same wallet, and must reject an overdraw without
//! mutating anything.

use crate::domain::{Currency, Money, Wallet, WalletId};
use crate::error::StoreError;

#[async_trait::async_trait]
pub trait WalletStore: Send + Sync + 'static {
    /// Creates a wallet with the given opening balance.
    async fn create_wallet(
        &self,
        owner: &str,
        currency: Currency,
        opening_balance: i64,
    ) -> Result<Wallet, StoreError>;

    /// Fetches a wallet; `Ok(None)` means the wallet does not exist, while
    /// `Err(Unavailable)` means the store could not answer at all.
    async fn get_wallet(&self, id: WalletId) -> Result<Option<Wallet>, StoreError>;

    /// Conditionally debits the wallet, returning the new balance.
    async fn debit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError>;

    /// Credits the wallet, returning the new balance.
    async fn credit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError>;
}

#[async_trait::async_trait]
impl<T: WalletStore + ?Sized> WalletStore for std::sync::Arc<T> {
    async fn create_wallet(
        &self,
        owner: &str,
        currency: Currency,
        opening_balance: i64,
    ) -> Result<Wallet, StoreError> {
        (**self).create_wallet(owner, currency, opening_balance).await
    }

    async fn get_wallet(&self, id: WalletId) -> Result<Option<Wallet>, StoreError> {
        (**self).get_wallet(id).await
    }

    async fn debit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError> {
        (**self).debit(id, amount).await
    }

    async fn credit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError> {
        (**self).credit(id, amount).await
    }
}
