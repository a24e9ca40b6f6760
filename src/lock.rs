//! Per-DN write locking with bounded retry and guaranteed, ordered release
//! (spec.md §4.2, §5).
//!
//! The table is a striped lock keyed by normalized DN, as the spec leaves
//! unspecified beyond: write locks are exclusive per DN, and re-entrancy
//! within one logical operation is not required. Each stripe is a bare
//! `AtomicBool` rather than a `std::sync::Mutex`: the coordinator only ever
//! needs try-acquire-with-bounded-retries, never blocking acquisition, so a
//! compare-and-swap spin is simpler and cheaper than threading owned mutex
//! guards through a handle type.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::dn::Dn;

/// A held write lock on one DN. Dropping it releases the lock.
pub struct LockHandle {
    stripe: Arc<AtomicBool>,
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.stripe.store(false, Ordering::Release);
    }
}

#[derive(Default)]
pub struct LockCoordinator {
    table: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl LockCoordinator {
    pub fn new() -> Self {
        LockCoordinator::default()
    }

    fn stripe_for(&self, dn: &Dn) -> Arc<AtomicBool> {
        let key = dn.normalized();
        let mut table = self.table.lock().expect("lock table poisoned");
        table
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone()
    }

    /// Attempt to acquire an exclusive write lock on `dn`, trying up to
    /// `retries` times without backoff. Returns `None` if every attempt
    /// failed.
    pub fn try_write(&self, dn: &Dn, retries: u32) -> Option<LockHandle> {
        let stripe = self.stripe_for(dn);
        for _ in 0..retries.max(1) {
            if stripe
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Some(LockHandle { stripe });
            }
        }
        None
    }

    pub fn release(&self, _dn: &Dn, handle: LockHandle) {
        drop(handle);
    }

    #[cfg(test)]
    fn is_locked(&self, dn: &Dn) -> bool {
        self.stripe_for(dn).load(Ordering::Acquire)
    }
}

/// Both locks held for a Modify-DN operation, acquired in the mandated
/// order (`entryDN` then `newDN`). Dropping this releases both; on a
/// partial-acquisition failure the coordinator itself releases whatever was
/// already acquired before returning the error, so no bare `LockHandle`
/// ever leaks out of a failed `acquire_pair` call.
pub struct DualLockGuard {
    pub entry_dn_lock: LockHandle,
    pub new_dn_lock: LockHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualLockError {
    EntryDn,
    NewDn,
}

impl LockCoordinator {
    pub fn acquire_pair(&self, entry_dn: &Dn, new_dn: &Dn, retries: u32) -> Result<DualLockGuard, DualLockError> {
        let first = self.try_write(entry_dn, retries).ok_or(DualLockError::EntryDn)?;
        match self.try_write(new_dn, retries) {
            Some(second) => Ok(DualLockGuard {
                entry_dn_lock: first,
                new_dn_lock: second,
            }),
            None => {
                // `first` drops here, releasing it before we report failure.
                drop(first);
                Err(DualLockError::NewDn)
            }
        }
    }
}
