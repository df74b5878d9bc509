//! Store failure injection.
//!
//! [`FaultyStore`] wraps an in-memory store and fails on demand:
//!
//! 1. **Prepare refusal** - every dry run is refused, so edits are rejected
//!    while the transaction is being built
//! 2. **Commit failure** - the n-th commit from now fails once, so a
//!    validated transaction breaks halfway through being applied
//!
//! ## Usage
//!
//! ```rust
//! use relitem_core::OnChangePolicy;
//! use relitem_testkit::{customer, FaultyStore, TestDocument};
//! use std::sync::Arc;
//!
//! let store = Arc::new(FaultyStore::new());
//! let document = TestDocument::over(store.clone(), OnChangePolicy::Cascade);
//!
//! store.fail_commit_after(0);
//! assert!(document.update(Some(customer("c1", "Alice")), None).is_err());
//! assert!(document.snapshot().is_empty());
//! ```

use relitem_storage::{InMemoryStore, Item, ItemChange, ItemStore, StorageError, StorageResult};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const DISARMED: usize = usize::MAX;

/// An item store wrapper that can simulate failures.
#[derive(Debug)]
pub struct FaultyStore {
    inner: InMemoryStore,
    commit_countdown: AtomicUsize,
    refuse_prepare: AtomicBool,
    commits: AtomicUsize,
    failures: AtomicUsize,
}

impl FaultyStore {
    /// Creates a healthy store.
    pub fn new() -> Self {
        Self::wrapping(InMemoryStore::new())
    }

    /// Creates a healthy store over existing items.
    pub fn wrapping(inner: InMemoryStore) -> Self {
        Self {
            inner,
            commit_countdown: AtomicUsize::new(DISARMED),
            refuse_prepare: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Lets `commits` more commits succeed, then fails the next one once.
    pub fn fail_commit_after(&self, commits: usize) {
        self.commit_countdown.store(commits, Ordering::SeqCst);
    }

    /// Sets whether dry runs are refused.
    pub fn set_refuse_prepare(&self, refuse: bool) {
        self.refuse_prepare.store(refuse, Ordering::SeqCst);
    }

    /// Clears every pending fault.
    pub fn reset(&self) {
        self.commit_countdown.store(DISARMED, Ordering::SeqCst);
        self.refuse_prepare.store(false, Ordering::SeqCst);
    }

    /// Number of commits that reached the inner store.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of injected failures so far.
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn take_commit_fault(&self) -> bool {
        self.commit_countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                DISARMED => None,
                0 => Some(DISARMED),
                n => Some(n - 1),
            })
            == Ok(0)
    }
}

impl Default for FaultyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemStore for FaultyStore {
    fn item_by_id(&self, qualifier: &str, id: &str) -> Option<Item> {
        self.inner.item_by_id(qualifier, id)
    }

    fn items_by_type(&self, qualifier: &str) -> Vec<Item> {
        self.inner.items_by_type(qualifier)
    }

    fn qualifiers(&self) -> Vec<String> {
        self.inner.qualifiers()
    }

    fn prepare(&self, change: &ItemChange) -> StorageResult<()> {
        if self.refuse_prepare.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::rejected(format!("refused {change}")));
        }
        self.inner.prepare(change)
    }

    fn commit(&self, change: &ItemChange) -> StorageResult<()> {
        if self.take_commit_fault() {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected commit failure",
            )));
        }
        self.inner.commit(change)?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_by_default() {
        let store = FaultyStore::new();
        store
            .commit(&ItemChange::create(Item::new("customer", "c1")))
            .unwrap();
        assert_eq!(store.commit_count(), 1);
        assert_eq!(store.failure_count(), 0);
    }

    #[test]
    fn commit_fault_fires_once() {
        let store = FaultyStore::new();
        store.fail_commit_after(1);

        let first = ItemChange::create(Item::new("customer", "c1"));
        let second = ItemChange::create(Item::new("customer", "c2"));
        store.commit(&first).unwrap();
        assert!(store.commit(&second).is_err());
        store.commit(&second).unwrap();

        assert_eq!(store.failure_count(), 1);
        assert_eq!(store.items_by_type("customer").len(), 2);
    }

    #[test]
    fn prepare_refusal_and_reset() {
        let store = FaultyStore::new();
        let change = ItemChange::create(Item::new("customer", "c1"));
        store.set_refuse_prepare(true);
        assert!(store.prepare(&change).is_err());

        store.reset();
        assert!(store.prepare(&change).is_ok());
    }
}
