//! Transfer coordinator.
//!
//! Orchestrates validate -> debit -> credit -> record across two stores of
//! truth that share no transaction context, plus the reverse (cancellation)
//! path. Generic over the wallet store and ledger ports, so local and remote
//! deployments run the identical protocol.
//!
//! The protocol approximates atomicity with three disciplines:
//! - all validation happens before any mutation;
//! - the consistency guard's ordered pair lock is held across the whole
//!   debit+credit+record sequence;
//! - any failure after a partial application is compensated with bounded
//!   retries, and a compensation that itself fails is escalated as a
//!   reconciliation failure instead of being swallowed.
//!
//! Success is only reported once the ledger record is durably written.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use transfer_types::{
    ChainAnnouncer, CreateTransferRequest, CreateWalletRequest, LedgerRepository, Money,
    StoreError, TransferError, TransferId, TransferRecord, TransferStatus, Wallet, WalletId,
    WalletStore,
};

use crate::guard::ConsistencyGuard;

/// Tuning knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Bound on waiting for a wallet-pair lock before failing `Busy`.
    pub lock_timeout: Duration,
    /// Attempts for a compensating mutation before escalating.
    pub compensation_attempts: u32,
    /// Pause between compensation attempts.
    pub compensation_backoff: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            compensation_attempts: 3,
            compensation_backoff: Duration::from_millis(50),
        }
    }
}

/// The cross-service funds-transfer and compensation engine.
pub struct TransferCoordinator<W: WalletStore, L: LedgerRepository> {
    wallets: W,
    ledger: L,
    guard: ConsistencyGuard,
    chain: Option<Arc<dyn ChainAnnouncer>>,
    config: CoordinatorConfig,
}

impl<W: WalletStore, L: LedgerRepository> TransferCoordinator<W, L> {
    /// Creates a coordinator with default tuning.
    pub fn new(wallets: W, ledger: L) -> Self {
        Self::with_config(wallets, ledger, CoordinatorConfig::default())
    }

    pub fn with_config(wallets: W, ledger: L, config: CoordinatorConfig) -> Self {
        Self {
            wallets,
            ledger,
            guard: ConsistencyGuard::new(config.lock_timeout),
            chain: None,
            config,
        }
    }

    /// Attaches the fire-and-forget blockchain side channel.
    pub fn with_announcer(mut self, chain: Arc<dyn ChainAnnouncer>) -> Self {
        self.chain = Some(chain);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Wallet passthrough (onboarding / reads)
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_wallet(&self, req: CreateWalletRequest) -> Result<Wallet, TransferError> {
        if req.owner.trim().is_empty() {
            return Err(TransferError::Validation(
                "Wallet owner cannot be empty".into(),
            ));
        }
        if req.opening_balance < 0 {
            return Err(TransferError::InvalidAmount(req.opening_balance));
        }

        self.wallets
            .create_wallet(&req.owner, req.currency, req.opening_balance)
            .await
            .map_err(Into::into)
    }

    pub async fn get_wallet(&self, id: WalletId) -> Result<Wallet, TransferError> {
        self.wallets
            .get_wallet(id)
            .await?
            .ok_or(TransferError::WalletNotFound(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Forward path
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a transfer: validate, debit, credit, record.
    ///
    /// At-most-once per idempotency key: a resubmission returns the existing
    /// record unchanged. Returns only after the COMPLETED record is durably
    /// written; every earlier failure leaves both balances as they were (or
    /// fails loudly as a reconciliation error when compensation itself
    /// failed).
    pub async fn create_transfer(
        &self,
        req: CreateTransferRequest,
    ) -> Result<TransferRecord, TransferError> {
        if req.idempotency_key.trim().is_empty() {
            return Err(TransferError::Validation(
                "Idempotency key cannot be empty".into(),
            ));
        }
        if req.amount <= 0 {
            return Err(TransferError::InvalidAmount(req.amount));
        }
        if req.sender_wallet_id == req.receiver_wallet_id {
            return Err(TransferError::Validation(
                "Cannot transfer to the same wallet".into(),
            ));
        }
        let amount = Money::new(req.amount, req.currency)?;

        // Fast path: already applied.
        if let Some(existing) = self
            .ledger
            .find_by_idempotency_key(&req.idempotency_key)
            .await?
        {
            return Ok(existing);
        }

        // A concurrent submission of the same key is already past this
        // point; turn the duplicate away, retrying is safe.
        let Some(_key) = self.guard.reserve_key(&req.idempotency_key) else {
            return Err(TransferError::Busy);
        };

        let locks = self
            .guard
            .lock_pair(req.sender_wallet_id, req.receiver_wallet_id)
            .await?;

        // Authoritative re-check now that the pair is serialized: the fast
        // path races against a submission that completed in between.
        if let Some(existing) = self
            .ledger
            .find_by_idempotency_key(&req.idempotency_key)
            .await?
        {
            return Ok(existing);
        }

        // Validate everything before mutating anything.
        let sender = self.get_wallet(req.sender_wallet_id).await?;
        let receiver = self.get_wallet(req.receiver_wallet_id).await?;

        if sender.currency() != receiver.currency() {
            return Err(TransferError::CurrencyMismatch {
                expected: sender.currency(),
                got: receiver.currency(),
            });
        }
        if req.currency != sender.currency() {
            return Err(TransferError::CurrencyMismatch {
                expected: sender.currency(),
                got: req.currency,
            });
        }
        if !sender.has_sufficient_funds(&amount) {
            return Err(TransferError::InsufficientFunds {
                available: sender.balance.amount(),
                requested: amount.amount(),
            });
        }

        // Build the record from the balances observed under the lock, before
        // anything moves: an after-balance that would overflow aborts here
        // with nothing to compensate.
        let record = TransferRecord::completed(
            req.idempotency_key.clone(),
            sender.id,
            receiver.id,
            amount,
            sender.balance.amount(),
            receiver.balance.amount(),
            req.description.clone(),
        )?;

        // Apply. The debit is conditional at the store, so a racing external
        // mutation still cannot overdraw.
        self.wallets.debit(sender.id, amount).await?;

        if let Err(credit_err) = self.wallets.credit(receiver.id, amount).await {
            warn!(
                sender = %sender.id,
                receiver = %receiver.id,
                error = %credit_err,
                "credit failed after debit, re-crediting sender"
            );
            self.retry_credit(sender.id, amount, "re-credit sender after failed credit")
                .await?;
            return Err(credit_err.into());
        }

        let record = match self.ledger.create(record).await {
            Ok(record) => record,
            Err(ledger_err) => {
                // No durable record means no success: reverse both deltas
                // before surfacing the failure.
                warn!(
                    key = %req.idempotency_key,
                    error = %ledger_err,
                    "ledger write failed after balances moved, unwinding"
                );
                self.retry_debit(receiver.id, amount, "un-credit receiver after failed record")
                    .await?;
                self.retry_credit(sender.id, amount, "re-credit sender after failed record")
                    .await?;
                return Err(ledger_err.into());
            }
        };

        info!(
            transfer_id = %record.id,
            sender = %record.sender_wallet_id,
            receiver = %record.receiver_wallet_id,
            amount = record.amount.amount(),
            "transfer completed"
        );

        // Locks are released before touching the side channel; its latency
        // must never stall ledger consistency.
        drop(locks);
        self.announce(&record).await;

        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cancellation path
    // ─────────────────────────────────────────────────────────────────────────

    /// Reverses a COMPLETED transfer using the record's snapshot deltas and
    /// marks it CANCELLED. The record itself is never deleted.
    ///
    /// If the receiver has since spent below the refund amount the
    /// cancellation fails terminally with `InsufficientFundsOnReversal` and
    /// mutates nothing.
    pub async fn cancel_transfer(&self, id: TransferId) -> Result<TransferRecord, TransferError> {
        let record = self
            .ledger
            .get_by_id(id)
            .await?
            .ok_or(TransferError::TransferNotFound(id))?;
        if record.status != TransferStatus::Completed {
            return Err(TransferError::InvalidState(record.status));
        }

        let locks = self
            .guard
            .lock_pair(record.sender_wallet_id, record.receiver_wallet_id)
            .await?;

        // Re-read under the lock; a racing cancellation may have won.
        let record = self
            .ledger
            .get_by_id(id)
            .await?
            .ok_or(TransferError::TransferNotFound(id))?;
        if record.status != TransferStatus::Completed {
            return Err(TransferError::InvalidState(record.status));
        }

        let amount = record.amount;

        // The receiver's conditional debit doubles as the sufficiency check:
        // it either recovers the funds atomically or rejects without
        // mutating, in which case cancellation is impossible here and a new
        // compensating transfer chain is the only way out.
        match self.wallets.debit(record.receiver_wallet_id, amount).await {
            Ok(_) => {}
            Err(StoreError::InsufficientFunds {
                available,
                requested,
            }) => {
                return Err(TransferError::InsufficientFundsOnReversal {
                    available,
                    requested,
                });
            }
            Err(other) => return Err(other.into()),
        }

        if let Err(credit_err) = self.wallets.credit(record.sender_wallet_id, amount).await {
            warn!(
                transfer_id = %id,
                error = %credit_err,
                "sender re-credit failed during cancellation, returning funds to receiver"
            );
            self.retry_credit(
                record.receiver_wallet_id,
                amount,
                "return funds to receiver after failed cancellation",
            )
            .await?;
            return Err(credit_err.into());
        }

        let updated = match self
            .ledger
            .update_status(id, TransferStatus::Cancelled)
            .await
        {
            Ok(updated) => updated,
            Err(ledger_err) => {
                // The record still says COMPLETED, so the balances must say
                // so too: re-apply the forward deltas.
                warn!(
                    transfer_id = %id,
                    error = %ledger_err,
                    "status update failed after reversal, re-applying transfer deltas"
                );
                self.retry_debit(
                    record.sender_wallet_id,
                    amount,
                    "re-debit sender after failed cancellation record",
                )
                .await?;
                self.retry_credit(
                    record.receiver_wallet_id,
                    amount,
                    "re-credit receiver after failed cancellation record",
                )
                .await?;
                return Err(ledger_err.into());
            }
        };

        info!(transfer_id = %id, "transfer cancelled, balances restored");

        drop(locks);
        self.announce(&updated).await;

        Ok(updated)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn get_transfer(&self, id: TransferId) -> Result<TransferRecord, TransferError> {
        self.ledger
            .get_by_id(id)
            .await?
            .ok_or(TransferError::TransferNotFound(id))
    }

    pub async fn list_transfers(&self) -> Result<Vec<TransferRecord>, TransferError> {
        self.ledger.list_all().await.map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Compensation plumbing
    // ─────────────────────────────────────────────────────────────────────────

    async fn retry_credit(
        &self,
        wallet: WalletId,
        amount: Money,
        context: &str,
    ) -> Result<(), TransferError> {
        self.retry_mutation(wallet, amount, context, false).await
    }

    async fn retry_debit(
        &self,
        wallet: WalletId,
        amount: Money,
        context: &str,
    ) -> Result<(), TransferError> {
        self.retry_mutation(wallet, amount, context, true).await
    }

    /// Applies a compensating mutation with bounded attempts. Exhausting the
    /// attempts means real, observable balance drift: logged at error level
    /// (the operator alert path) and escalated, never swallowed.
    async fn retry_mutation(
        &self,
        wallet: WalletId,
        amount: Money,
        context: &str,
        debit: bool,
    ) -> Result<(), TransferError> {
        let mut last_error = String::new();
        for attempt in 1..=self.config.compensation_attempts {
            let result = if debit {
                self.wallets.debit(wallet, amount).await
            } else {
                self.wallets.credit(wallet, amount).await
            };
            match result {
                Ok(_) => return Ok(()),
                Err(e) => {
                    warn!(%wallet, attempt, error = %e, "compensating mutation failed: {context}");
                    last_error = e.to_string();
                }
            }
            if attempt < self.config.compensation_attempts {
                tokio::time::sleep(self.config.compensation_backoff).await;
            }
        }

        error!(
            %wallet,
            amount = amount.amount(),
            "RECONCILIATION REQUIRED: {context}: {last_error}"
        );
        Err(TransferError::Reconciliation {
            wallet,
            amount: amount.amount(),
            detail: format!("{context}: {last_error}"),
        })
    }

    async fn announce(&self, record: &TransferRecord) {
        if let Some(chain) = &self.chain {
            chain.announce(record).await;
        }
    }
}
