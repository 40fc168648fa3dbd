//! In-memory adapters.
//!
//! `InMemoryWalletStore` backs the local deployment and the test suites.
//! Atomicity of `debit` relative to concurrent `debit`/`credit` on the same
//! wallet comes from dashmap's per-entry exclusive reference: the check and
//! the mutation happen under one shard lock.

use async_trait::async_trait;
use dashmap::DashMap;

use transfer_types::{
    Currency, LedgerError, LedgerRepository, Money, StoreError, TransferId, TransferRecord,
    TransferStatus, Wallet, WalletId, WalletStore,
};

// ─────────────────────────────────────────────────────────────────────────────
// Wallet store
// ─────────────────────────────────────────────────────────────────────────────

/// Wallet store holding balances in process memory.
#[derive(Default)]
pub struct InMemoryWalletStore {
    wallets: DashMap<WalletId, Wallet>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn create_wallet(
        &self,
        owner: &str,
        currency: Currency,
        opening_balance: i64,
    ) -> Result<Wallet, StoreError> {
        let wallet = Wallet::new(owner.to_string(), currency, opening_balance)?;
        self.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn get_wallet(&self, id: WalletId) -> Result<Option<Wallet>, StoreError> {
        Ok(self.wallets.get(&id).map(|w| w.clone()))
    }

    async fn debit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError> {
        let mut wallet = self
            .wallets
            .get_mut(&id)
            .ok_or(StoreError::WalletNotFound(id))?;
        wallet.debit(amount)?;
        Ok(wallet.balance)
    }

    async fn credit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError> {
        let mut wallet = self
            .wallets
            .get_mut(&id)
            .ok_or(StoreError::WalletNotFound(id))?;
        wallet.credit(amount)?;
        Ok(wallet.balance)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────────────────────────

/// Transfer ledger held in process memory, with an idempotency-key index.
#[derive(Default)]
pub struct InMemoryLedger {
    records: DashMap<TransferId, TransferRecord>,
    by_key: DashMap<String, TransferId>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn create(&self, record: TransferRecord) -> Result<TransferRecord, LedgerError> {
        // Claim the key first; the entry API makes the claim atomic.
        match self.by_key.entry(record.idempotency_key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(LedgerError::DuplicateKey(record.idempotency_key));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.id);
            }
        }
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: TransferId) -> Result<Option<TransferRecord>, LedgerError> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransferRecord>, LedgerError> {
        let Some(id) = self.by_key.get(key).map(|id| *id) else {
            return Ok(None);
        };
        self.get_by_id(id).await
    }

    async fn list_all(&self) -> Result<Vec<TransferRecord>, LedgerError> {
        let mut records: Vec<TransferRecord> =
            self.records.iter().map(|r| r.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
    ) -> Result<TransferRecord, LedgerError> {
        let mut record = self.records.get_mut(&id).ok_or(LedgerError::NotFound)?;
        if !record.status.can_transition_to(status) {
            return Err(LedgerError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        Ok(record.clone())
    }
}
