//! Coordinator behavior tests, including failure injection for the
//! compensation and reconciliation paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use transfer_stores::{InMemoryLedger, InMemoryWalletStore};
use transfer_types::{
    CreateTransferRequest, CreateWalletRequest, Currency, LedgerError, LedgerRepository, Money,
    StoreError, TransferError, TransferId, TransferRecord, TransferStatus, Wallet, WalletId,
    WalletStore,
};

use crate::{CoordinatorConfig, TransferCoordinator};

// ─────────────────────────────────────────────────────────────────────────────
// Test doubles
// ─────────────────────────────────────────────────────────────────────────────

/// Wallet store that fails the next N credits and/or debits before
/// delegating, for exercising compensation.
struct FlakyWalletStore {
    inner: InMemoryWalletStore,
    fail_credits: AtomicU32,
    fail_debits: AtomicU32,
}

impl FlakyWalletStore {
    fn new() -> Self {
        Self {
            inner: InMemoryWalletStore::new(),
            fail_credits: AtomicU32::new(0),
            fail_debits: AtomicU32::new(0),
        }
    }

    fn fail_next_credits(&self, n: u32) {
        self.fail_credits.store(n, Ordering::SeqCst);
    }

    fn fail_next_debits(&self, n: u32) {
        self.fail_debits.store(n, Ordering::SeqCst);
    }
}

/// Consumes one injected failure if any remain.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl WalletStore for FlakyWalletStore {
    async fn create_wallet(
        &self,
        owner: &str,
        currency: Currency,
        opening_balance: i64,
    ) -> Result<Wallet, StoreError> {
        self.inner.create_wallet(owner, currency, opening_balance).await
    }

    async fn get_wallet(&self, id: WalletId) -> Result<Option<Wallet>, StoreError> {
        self.inner.get_wallet(id).await
    }

    async fn debit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError> {
        if take_failure(&self.fail_debits) {
            return Err(StoreError::Unavailable("injected debit failure".into()));
        }
        self.inner.debit(id, amount).await
    }

    async fn credit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError> {
        if take_failure(&self.fail_credits) {
            return Err(StoreError::Unavailable("injected credit failure".into()));
        }
        self.inner.credit(id, amount).await
    }
}

/// Ledger that fails the next N creates before delegating.
struct FailingLedger {
    inner: InMemoryLedger,
    fail_creates: AtomicU32,
}

impl FailingLedger {
    fn new() -> Self {
        Self {
            inner: InMemoryLedger::new(),
            fail_creates: AtomicU32::new(0),
        }
    }

    fn fail_next_creates(&self, n: u32) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerRepository for FailingLedger {
    async fn create(&self, record: TransferRecord) -> Result<TransferRecord, LedgerError> {
        if take_failure(&self.fail_creates) {
            return Err(LedgerError::Storage("injected ledger failure".into()));
        }
        self.inner.create(record).await
    }

    async fn get_by_id(&self, id: TransferId) -> Result<Option<TransferRecord>, LedgerError> {
        self.inner.get_by_id(id).await
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransferRecord>, LedgerError> {
        self.inner.find_by_idempotency_key(key).await
    }

    async fn list_all(&self) -> Result<Vec<TransferRecord>, LedgerError> {
        self.inner.list_all().await
    }

    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
    ) -> Result<TransferRecord, LedgerError> {
        self.inner.update_status(id, status).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

type MemCoordinator = TransferCoordinator<Arc<InMemoryWalletStore>, Arc<InMemoryLedger>>;

fn setup() -> (MemCoordinator, Arc<InMemoryWalletStore>, Arc<InMemoryLedger>) {
    let store = Arc::new(InMemoryWalletStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let coordinator = TransferCoordinator::new(store.clone(), ledger.clone());
    (coordinator, store, ledger)
}

fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        lock_timeout: Duration::from_secs(5),
        compensation_attempts: 3,
        compensation_backoff: Duration::from_millis(1),
    }
}

async fn wallet<S: WalletStore>(store: &S, owner: &str, balance: i64) -> Wallet {
    store
        .create_wallet(owner, Currency::USD, balance)
        .await
        .unwrap()
}

async fn balance_of<S: WalletStore>(store: &S, id: WalletId) -> i64 {
    store
        .get_wallet(id)
        .await
        .unwrap()
        .unwrap()
        .balance
        .amount()
}

fn transfer_req(key: &str, sender: WalletId, receiver: WalletId, amount: i64) -> CreateTransferRequest {
    CreateTransferRequest {
        idempotency_key: key.to_string(),
        sender_wallet_id: sender,
        receiver_wallet_id: receiver,
        amount,
        currency: Currency::USD,
        description: None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Happy path and validation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transfer_moves_funds_and_records_snapshot() {
    let (coordinator, store, _) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    let record = coordinator
        .create_transfer(transfer_req("t-1", a.id, b.id, 30))
        .await
        .unwrap();

    assert_eq!(record.status, TransferStatus::Completed);
    assert_eq!(record.sender_balance_before, 100);
    assert_eq!(record.receiver_balance_before, 50);
    assert_eq!(record.sender_balance_after, 70);
    assert_eq!(record.receiver_balance_after, 80);

    assert_eq!(balance_of(&*store, a.id).await, 70);
    assert_eq!(balance_of(&*store, b.id).await, 80);
}

#[tokio::test]
async fn test_transfer_with_description_kept_on_record() {
    let (coordinator, store, _) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 0).await;

    let mut req = transfer_req("t-desc", a.id, b.id, 10);
    req.description = Some("rent".to_string());

    let record = coordinator.create_transfer(req).await.unwrap();
    assert_eq!(record.description.as_deref(), Some("rent"));
}

#[tokio::test]
async fn test_zero_and_negative_amounts_rejected_before_mutation() {
    let (coordinator, store, ledger) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    for amount in [0, -5] {
        let result = coordinator
            .create_transfer(transfer_req("t-bad", a.id, b.id, amount))
            .await;
        assert!(matches!(result, Err(TransferError::InvalidAmount(_))));
    }

    assert_eq!(balance_of(&*store, a.id).await, 100);
    assert_eq!(balance_of(&*store, b.id).await, 50);
    assert!(ledger.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_idempotency_key_rejected() {
    let (coordinator, store, _) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    let result = coordinator
        .create_transfer(transfer_req("   ", a.id, b.id, 10))
        .await;
    assert!(matches!(result, Err(TransferError::Validation(_))));
}

#[tokio::test]
async fn test_self_transfer_rejected() {
    let (coordinator, store, _) = setup();
    let a = wallet(&*store, "alice", 100).await;

    let result = coordinator
        .create_transfer(transfer_req("t-self", a.id, a.id, 10))
        .await;
    assert!(matches!(result, Err(TransferError::Validation(_))));
    assert_eq!(balance_of(&*store, a.id).await, 100);
}

#[tokio::test]
async fn test_insufficient_funds_mutates_nothing() {
    let (coordinator, store, ledger) = setup();
    let a = wallet(&*store, "alice", 10).await;
    let b = wallet(&*store, "bob", 50).await;

    let result = coordinator
        .create_transfer(transfer_req("t-poor", a.id, b.id, 30))
        .await;
    assert!(matches!(
        result,
        Err(TransferError::InsufficientFunds {
            available: 10,
            requested: 30
        })
    ));

    assert_eq!(balance_of(&*store, a.id).await, 10);
    assert_eq!(balance_of(&*store, b.id).await, 50);
    assert!(ledger.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_near_max_receiver_balance_rejected_without_drift() {
    let (coordinator, store, ledger) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", i64::MAX - 5).await;

    let result = coordinator
        .create_transfer(transfer_req("t-max", a.id, b.id, 10))
        .await;
    assert!(matches!(result, Err(TransferError::Validation(_))));

    // Rejected before either balance moved; conservation holds.
    assert_eq!(balance_of(&*store, a.id).await, 100);
    assert_eq!(balance_of(&*store, b.id).await, i64::MAX - 5);
    assert!(ledger.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_sender_wallet() {
    let (coordinator, store, _) = setup();
    let b = wallet(&*store, "bob", 50).await;

    let result = coordinator
        .create_transfer(transfer_req("t-ghost", WalletId::new(), b.id, 10))
        .await;
    assert!(matches!(result, Err(TransferError::WalletNotFound(_))));
    assert_eq!(balance_of(&*store, b.id).await, 50);
}

#[tokio::test]
async fn test_currency_mismatch_between_wallets() {
    let (coordinator, store, _) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = store
        .create_wallet("bob", Currency::EUR, 50)
        .await
        .unwrap();

    let result = coordinator
        .create_transfer(transfer_req("t-fx", a.id, b.id, 10))
        .await;
    assert!(matches!(result, Err(TransferError::CurrencyMismatch { .. })));
    assert_eq!(balance_of(&*store, a.id).await, 100);
    assert_eq!(balance_of(&*store, b.id).await, 50);
}

#[tokio::test]
async fn test_request_currency_must_match_sender() {
    let (coordinator, store, _) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    let mut req = transfer_req("t-fx2", a.id, b.id, 10);
    req.currency = Currency::BTC;

    let result = coordinator.create_transfer(req).await;
    assert!(matches!(result, Err(TransferError::CurrencyMismatch { .. })));
}

// ─────────────────────────────────────────────────────────────────────────────
// Idempotency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_resubmission_returns_existing_record_without_new_mutation() {
    let (coordinator, store, ledger) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    let first = coordinator
        .create_transfer(transfer_req("t-retry", a.id, b.id, 30))
        .await
        .unwrap();
    let second = coordinator
        .create_transfer(transfer_req("t-retry", a.id, b.id, 30))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(balance_of(&*store, a.id).await, 70);
    assert_eq!(balance_of(&*store, b.id).await, 80);
    assert_eq!(ledger.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_same_key_submissions_apply_once() {
    let (coordinator, store, ledger) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;
    let coordinator = Arc::new(coordinator);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let coordinator = coordinator.clone();
        let req = transfer_req("t-race", a.id, b.id, 30);
        handles.push(tokio::spawn(
            async move { coordinator.create_transfer(req).await },
        ));
    }

    let mut completed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(record) => {
                assert_eq!(record.status, TransferStatus::Completed);
                completed += 1;
            }
            // An in-flight duplicate is turned away; a retry would hit the
            // ledger record.
            Err(TransferError::Busy) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert!(completed >= 1);
    assert_eq!(balance_of(&*store, a.id).await, 70);
    assert_eq!(balance_of(&*store, b.id).await, 80);
    assert_eq!(ledger.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_funds_conserved_under_concurrent_transfers() {
    let (coordinator, store, _) = setup();
    let a = wallet(&*store, "alice", 1_000).await;
    let b = wallet(&*store, "bob", 1_000).await;
    let coordinator = Arc::new(coordinator);

    let mut handles = Vec::new();
    for i in 0..20 {
        let coordinator = coordinator.clone();
        let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
        let req = transfer_req(&format!("t-c{i}"), from, to, 10);
        handles.push(tokio::spawn(
            async move { coordinator.create_transfer(req).await },
        ));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let total = balance_of(&*store, a.id).await + balance_of(&*store, b.id).await;
    assert_eq!(total, 2_000);
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_restores_balances_and_marks_record() {
    let (coordinator, store, ledger) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    let record = coordinator
        .create_transfer(transfer_req("t-cancel", a.id, b.id, 30))
        .await
        .unwrap();

    let cancelled = coordinator.cancel_transfer(record.id).await.unwrap();
    assert_eq!(cancelled.status, TransferStatus::Cancelled);

    assert_eq!(balance_of(&*store, a.id).await, 100);
    assert_eq!(balance_of(&*store, b.id).await, 50);

    // The record survives cancellation; only its status changed.
    let stored = ledger.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransferStatus::Cancelled);
    assert_eq!(stored.amount.amount(), 30);
}

#[tokio::test]
async fn test_cancel_missing_transfer() {
    let (coordinator, _, _) = setup();
    let result = coordinator.cancel_transfer(TransferId::new()).await;
    assert!(matches!(result, Err(TransferError::TransferNotFound(_))));
}

#[tokio::test]
async fn test_cancel_twice_rejected() {
    let (coordinator, store, _) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    let record = coordinator
        .create_transfer(transfer_req("t-twice", a.id, b.id, 30))
        .await
        .unwrap();
    coordinator.cancel_transfer(record.id).await.unwrap();

    let result = coordinator.cancel_transfer(record.id).await;
    assert!(matches!(
        result,
        Err(TransferError::InvalidState(TransferStatus::Cancelled))
    ));

    // Second attempt must not move funds again.
    assert_eq!(balance_of(&*store, a.id).await, 100);
    assert_eq!(balance_of(&*store, b.id).await, 50);
}

#[tokio::test]
async fn test_cancel_fails_when_receiver_spent_the_funds() {
    let (coordinator, store, ledger) = setup();
    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 0).await;
    let c = wallet(&*store, "carol", 0).await;

    let record = coordinator
        .create_transfer(transfer_req("t-spend1", a.id, b.id, 30))
        .await
        .unwrap();
    // Bob spends most of it onward.
    coordinator
        .create_transfer(transfer_req("t-spend2", b.id, c.id, 25))
        .await
        .unwrap();

    let result = coordinator.cancel_transfer(record.id).await;
    assert!(matches!(
        result,
        Err(TransferError::InsufficientFundsOnReversal {
            available: 5,
            requested: 30
        })
    ));

    // Nothing moved and the record still says COMPLETED.
    assert_eq!(balance_of(&*store, a.id).await, 70);
    assert_eq!(balance_of(&*store, b.id).await, 5);
    assert_eq!(balance_of(&*store, c.id).await, 25);
    let stored = ledger.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransferStatus::Completed);
}

// ─────────────────────────────────────────────────────────────────────────────
// Compensation and reconciliation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_credit_is_compensated() {
    let store = Arc::new(FlakyWalletStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let coordinator =
        TransferCoordinator::with_config(store.clone(), ledger.clone(), fast_config());

    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    store.fail_next_credits(1);
    let result = coordinator
        .create_transfer(transfer_req("t-flaky", a.id, b.id, 30))
        .await;
    assert!(matches!(result, Err(TransferError::Unavailable(_))));

    // The debit was rolled back by the compensating credit.
    assert_eq!(balance_of(&*store, a.id).await, 100);
    assert_eq!(balance_of(&*store, b.id).await, 50);
    assert!(ledger.list_all().await.unwrap().is_empty());

    // The same key retries cleanly once the store recovers.
    let record = coordinator
        .create_transfer(transfer_req("t-flaky", a.id, b.id, 30))
        .await
        .unwrap();
    assert_eq!(record.status, TransferStatus::Completed);
    assert_eq!(balance_of(&*store, a.id).await, 70);
}

#[tokio::test]
async fn test_exhausted_compensation_escalates_to_reconciliation() {
    let store = Arc::new(FlakyWalletStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let coordinator =
        TransferCoordinator::with_config(store.clone(), ledger.clone(), fast_config());

    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    // The receiver credit and every compensating credit fail.
    store.fail_next_credits(10);
    let result = coordinator
        .create_transfer(transfer_req("t-drift", a.id, b.id, 30))
        .await;

    match result {
        Err(err @ TransferError::Reconciliation { .. }) => {
            assert_eq!(err.kind(), "reconciliation_failure");
            assert!(!err.is_retryable());
        }
        other => panic!("expected reconciliation failure, got {other:?}"),
    }

    // The drift is real and reported, not hidden.
    assert_eq!(balance_of(&*store, a.id).await, 70);
    assert!(ledger.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ledger_write_failure_unwinds_both_balances() {
    let store = Arc::new(InMemoryWalletStore::new());
    let ledger = Arc::new(FailingLedger::new());
    let coordinator =
        TransferCoordinator::with_config(store.clone(), ledger.clone(), fast_config());

    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    ledger.fail_next_creates(1);
    let result = coordinator
        .create_transfer(transfer_req("t-ledger", a.id, b.id, 30))
        .await;
    assert!(matches!(result, Err(TransferError::Unavailable(_))));

    // No durable record means no balance change.
    assert_eq!(balance_of(&*store, a.id).await, 100);
    assert_eq!(balance_of(&*store, b.id).await, 50);
    assert!(ledger.list_all().await.unwrap().is_empty());

    // Retry succeeds once the ledger recovers.
    let record = coordinator
        .create_transfer(transfer_req("t-ledger", a.id, b.id, 30))
        .await
        .unwrap();
    assert_eq!(record.status, TransferStatus::Completed);
}

#[tokio::test]
async fn test_cancellation_receiver_debit_outage_mutates_nothing() {
    let store = Arc::new(FlakyWalletStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let coordinator =
        TransferCoordinator::with_config(store.clone(), ledger.clone(), fast_config());

    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    let record = coordinator
        .create_transfer(transfer_req("t-out", a.id, b.id, 30))
        .await
        .unwrap();

    store.fail_next_debits(1);
    let result = coordinator.cancel_transfer(record.id).await;
    assert!(matches!(result, Err(TransferError::Unavailable(_))));

    // The first mutation never happened, so there is nothing to compensate.
    assert_eq!(balance_of(&*store, a.id).await, 70);
    assert_eq!(balance_of(&*store, b.id).await, 80);
    let stored = ledger.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransferStatus::Completed);
}

#[tokio::test]
async fn test_cancellation_sender_credit_failure_returns_funds_to_receiver() {
    let store = Arc::new(FlakyWalletStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let coordinator =
        TransferCoordinator::with_config(store.clone(), ledger.clone(), fast_config());

    let a = wallet(&*store, "alice", 100).await;
    let b = wallet(&*store, "bob", 50).await;

    let record = coordinator
        .create_transfer(transfer_req("t-rev", a.id, b.id, 30))
        .await
        .unwrap();

    store.fail_next_credits(1);
    let result = coordinator.cancel_transfer(record.id).await;
    assert!(matches!(result, Err(TransferError::Unavailable(_))));

    // The reversal was itself reversed; the transfer stands.
    assert_eq!(balance_of(&*store, a.id).await, 70);
    assert_eq!(balance_of(&*store, b.id).await, 80);
    let stored = ledger.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransferStatus::Completed);

    // And it can still be cancelled afterwards.
    let cancelled = coordinator.cancel_transfer(record.id).await.unwrap();
    assert_eq!(cancelled.status, TransferStatus::Cancelled);
    assert_eq!(balance_of(&*store, a.id).await, 100);
    assert_eq!(balance_of(&*store, b.id).await, 50);
}

// ─────────────────────────────────────────────────────────────────────────────
// Wallet passthrough
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_wallet_validation() {
    let (coordinator, _, _) = setup();

    let result = coordinator
        .create_wallet(CreateWalletRequest {
            owner: "  ".to_string(),
            currency: Currency::USD,
            opening_balance: 0,
        })
        .await;
    assert!(matches!(result, Err(TransferError::Validation(_))));

    let result = coordinator
        .create_wallet(CreateWalletRequest {
            owner: "alice".to_string(),
            currency: Currency::USD,
            opening_balance: -1,
        })
        .await;
    assert!(matches!(result, Err(TransferError::InvalidAmount(-1))));
}

#[tokio::test]
async fn test_get_missing_wallet() {
    let (coordinator, _, _) = setup();
    let result = coordinator.get_wallet(WalletId::new()).await;
    assert!(matches!(result, Err(TransferError::WalletNotFound(_))));
}
