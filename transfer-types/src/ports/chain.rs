//! Blockchain side-channel port.
//!
//! One-way, fire-and-forget: announcements have no bearing on ledger
//! consistency and must never be awaited while wallet locks are held.
//! Implementations log delivery failures instead of surfacing them.

use crate::domain::TransferRecord;

#[async_trait::async_trait]
pub trait ChainAnnouncer: Send + Sync + 'static {
    /// Announces a completed or cancelled transfer. Infallible by contract;
    /// delivery is best-effort.
    async fn announce(&self, record: &TransferRecord);
}
