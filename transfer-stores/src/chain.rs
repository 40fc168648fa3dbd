//! Blockchain side-channel announcer.
//!
//! Mirrors the transfer onto the blockchain payment service. Strictly
//! one-way: each announcement is spawned onto the runtime and the caller
//! returns immediately, so unbounded side-channel latency can never stall a
//! transfer or extend the time a wallet lock is held. Delivery failures are
//! logged and dropped.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use transfer_types::{ChainAnnouncer, TransferRecord};

/// Announcer posting transfer events to a blockchain payment service.
pub struct HttpChainAnnouncer {
    target_url: String,
    client: Client,
}

impl HttpChainAnnouncer {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ChainAnnouncer for HttpChainAnnouncer {
    async fn announce(&self, record: &TransferRecord) {
        let payload = serde_json::json!({
            "transfer_id": record.id,
            "status": record.status,
            "amount": record.amount.amount(),
            "currency": record.amount.currency(),
            "sender_wallet_id": record.sender_wallet_id,
            "receiver_wallet_id": record.receiver_wallet_id,
        });

        let client = self.client.clone();
        let url = self.target_url.clone();
        let transfer_id = record.id;

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(%transfer_id, "announced transfer to chain service");
                }
                Ok(resp) => {
                    warn!(%transfer_id, status = %resp.status(), "chain service rejected announcement");
                }
                Err(e) => {
                    warn!(%transfer_id, error = %e, "failed to reach chain service");
                }
            }
        });
    }
}
