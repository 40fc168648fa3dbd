//! Ledger repository port.
//!
//! Records are append-only truth: `create`, reads, and exactly one status
//! mutation. Implementations enforce the [`TransferStatus`] state machine in
//! `update_status` and index records by idempotency key.

use crate::domain::{TransferId, TransferRecord, TransferStatus};
use crate::error::LedgerError;

#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    /// Persists a new record. Fails with `DuplicateKey` if a record already
    /// exists for the same idempotency key.
    async fn create(&self, record: TransferRecord) -> Result<TransferRecord, LedgerError>;

    async fn get_by_id(&self, id: TransferId) -> Result<Option<TransferRecord>, LedgerError>;

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransferRecord>, LedgerError>;

    /// All records, newest first.
    async fn list_all(&self) -> Result<Vec<TransferRecord>, LedgerError>;

    /// Applies a status transition, rejecting anything the state machine
    /// forbids with `InvalidTransition`. Returns the updated record.
    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
    ) -> Result<TransferRecord, LedgerError>;
}

#[async_trait::async_trait]
impl<T: LedgerRepository + ?Sized> LedgerRepository for std::sync::Arc<T> {
    async fn create(&self, record: TransferRecord) -> Result<TransferRecord, LedgerError> {
        (**self).create(record).await
    }

    async fn get_by_id(&self, id: TransferId) -> Result<Option<TransferRecord>, LedgerError> {
        (**self).get_by_id(id).await
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransferRecord>, LedgerError> {
        (**self).find_by_idempotency_key(key).await
    }

    async fn list_all(&self) -> Result<Vec<TransferRecord>, LedgerError> {
        (**self).list_all().await
    }

    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
    ) -> Result<TransferRecord, LedgerError> {
        (**self).update_status(id, status).await
    }
}
