//! Consistency guard: per-wallet mutual exclusion and idempotency-key
//! tracking.
//!
//! Two disciplines, both required by the coordinator:
//!
//! 1. **Ordered pair locking.** Any operation touching two wallets acquires
//!    their locks in ascending wallet-id order. Every concurrent operation
//!    agrees on that order, so a cycle - and therefore deadlock - cannot
//!    form. The [`PairGuard`] is held across the whole
//!    debit+credit+record sequence; re-acquiring between sub-steps would
//!    reopen the double-spend window.
//! 2. **In-flight key reservations.** A second submission of an idempotency
//!    key whose first submission is still running is turned away as `Busy`
//!    instead of queued; the retry will hit the ledger record.
//!
//! Lock waits are bounded: a request that cannot acquire within the
//! configured window fails with `Busy` rather than queueing indefinitely.
//!
//! Lock-table entries are evicted once released with no holder or waiter
//! left, so the table tracks wallets currently in play rather than every
//! wallet ever touched.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

use transfer_types::{TransferError, WalletId};

/// Per-wallet lock table plus in-flight idempotency keys.
pub struct ConsistencyGuard {
    locks: DashMap<WalletId, Arc<Mutex<()>>>,
    in_flight: DashMap<String, ()>,
    lock_timeout: Duration,
}

/// Exclusive hold on one or two wallets. Dropping it releases the locks and
/// evicts idle lock-table entries; every coordinator exit path releases by
/// construction.
pub struct PairGuard<'a> {
    owner: &'a ConsistencyGuard,
    first_id: WalletId,
    second_id: Option<WalletId>,
    first: Option<OwnedMutexGuard<()>>,
    second: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        // The guards each hold an Arc into the table entry; they must be
        // gone before the idle check below can see a count of one.
        self.second.take();
        self.first.take();

        self.owner.evict_if_idle(self.first_id);
        if let Some(id) = self.second_id {
            self.owner.evict_if_idle(id);
        }
    }
}

/// Marks an idempotency key as in flight until dropped.
pub struct KeyReservation<'a> {
    keys: &'a DashMap<String, ()>,
    key: String,
}

impl Drop for KeyReservation<'_> {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

impl ConsistencyGuard {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            in_flight: DashMap::new(),
            lock_timeout,
        }
    }

    /// Acquires both wallet locks in ascending id order.
    ///
    /// Accepts equal ids defensively (a single lock is taken), though the
    /// coordinator rejects self-transfers before ever locking.
    pub async fn lock_pair(
        &self,
        a: WalletId,
        b: WalletId,
    ) -> Result<PairGuard<'_>, TransferError> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };

        let first_guard = self.acquire(first).await?;
        let second_guard = if second == first {
            None
        } else {
            match self.acquire(second).await {
                Ok(guard) => Some(guard),
                Err(err) => {
                    drop(first_guard);
                    self.evict_if_idle(first);
                    return Err(err);
                }
            }
        };

        Ok(PairGuard {
            owner: self,
            first_id: first,
            second_id: (second != first).then_some(second),
            first: Some(first_guard),
            second: second_guard,
        })
    }

    /// Claims an idempotency key; `None` means an identical submission is
    /// already running.
    pub fn reserve_key(&self, key: &str) -> Option<KeyReservation<'_>> {
        match self.in_flight.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Some(KeyReservation {
                    keys: &self.in_flight,
                    key: key.to_string(),
                })
            }
        }
    }

    async fn acquire(&self, id: WalletId) -> Result<OwnedMutexGuard<()>, TransferError> {
        let mutex = self.locks.entry(id).or_default().clone();
        match timeout(self.lock_timeout, mutex.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                self.evict_if_idle(id);
                Err(TransferError::Busy)
            }
        }
    }

    /// Removes a lock-table entry nobody holds or waits on. Holders and
    /// waiters each own an `Arc` into the entry, so a strong count of one
    /// (the table's own reference) proves the entry is idle.
    fn evict_if_idle(&self, id: WalletId) {
        self.locks
            .remove_if(&id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    #[cfg(test)]
    fn lock_table_len(&self) -> usize {
        self.locks.len()
    }
}
