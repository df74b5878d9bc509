//! In-memory item store.

use crate::change::ItemChange;
use crate::error::StorageResult;
use crate::item::Item;
use crate::repository::Repository;
use crate::store::ItemStore;
use parking_lot::RwLock;

/// An in-memory item store.
///
/// This store keeps every committed item in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral documents that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads. Readers
/// never observe a half-applied change.
///
/// # Example
///
/// ```rust
/// use relitem_storage::{InMemoryStore, Item, ItemStore};
///
/// let store = InMemoryStore::with_items([Item::new("customer", "c1")]);
/// assert_eq!(store.items_by_type("customer").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    repository: RwLock<Repository>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing items.
    ///
    /// Later items replace earlier ones with the same identity.
    #[must_use]
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut repository = Repository::default();
        for item in items {
            repository.insert(item);
        }
        Self {
            repository: RwLock::new(repository),
        }
    }

    /// Returns the total number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repository.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every item.
    pub fn clear(&self) {
        *self.repository.write() = Repository::default();
    }
}

impl ItemStore for InMemoryStore {
    fn item_by_id(&self, qualifier: &str, id: &str) -> Option<Item> {
        self.repository.read().get(qualifier, id)
    }

    fn items_by_type(&self, qualifier: &str) -> Vec<Item> {
        self.repository.read().by_type(qualifier)
    }

    fn qualifiers(&self) -> Vec<String> {
        self.repository.read().qualifiers()
    }

    fn commit(&self, change: &ItemChange) -> StorageResult<()> {
        let mut repository = self.repository.write();
        repository.check(change)?;
        repository.apply(change);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn new_store_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.item_by_id("customer", "c1").is_none());
        assert!(store.items_by_type("customer").is_empty());
    }

    #[test]
    fn commit_create_update_delete() {
        let store = InMemoryStore::new();
        let v1 = Item::new("customer", "c1").with_field("Name", "Alice");
        store.commit(&ItemChange::create(v1.clone())).unwrap();

        let mut v2 = v1.clone();
        v2.set_value(0, "Alicia");
        store.commit(&ItemChange::update(v2.clone(), v1)).unwrap();
        assert_eq!(store.item_by_id("customer", "c1"), Some(v2.clone()));

        store.commit(&ItemChange::delete(v2)).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn commit_rejects_unknown_old_item() {
        let store = InMemoryStore::new();
        let result = store.commit(&ItemChange::delete(Item::new("customer", "ghost")));
        assert!(matches!(result, Err(StorageError::Rejected { .. })));
    }

    #[test]
    fn items_by_type_is_ordered_by_id() {
        let store = InMemoryStore::with_items([
            Item::new("customer", "b"),
            Item::new("customer", "a"),
            Item::new("customer", "c"),
        ]);
        let ids: Vec<_> = store
            .items_by_type("customer")
            .iter()
            .map(|i| i.id().to_owned())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn held_items_survive_deletion() {
        let store = InMemoryStore::with_items([Item::new("customer", "c1").with_field("Name", "A")]);
        let held = store.item_by_id("customer", "c1").unwrap();

        store.commit(&ItemChange::delete(held.clone())).unwrap();

        assert!(store.item_by_id("customer", "c1").is_none());
        assert_eq!(held.text(0), "A");
    }

    #[test]
    fn concurrent_readers() {
        let store = Arc::new(InMemoryStore::with_items(
            (0..50).map(|i| Item::new("customer", format!("c{i}"))),
        ));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.items_by_type("customer").len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 50);
        }
    }

    fn sorted(mut items: Vec<Item>) -> Vec<Item> {
        items.sort_by(|a, b| a.id().cmp(b.id()));
        items
    }

    proptest! {
        #[test]
        fn inverse_restores_previous_state(
            ids in prop::collection::btree_set("[a-z]{1,4}", 1..10),
            pick in any::<prop::sample::Index>(),
            renamed in "[A-Z]{1,4}",
            delete in any::<bool>(),
        ) {
            let ids: Vec<String> = ids.into_iter().collect();
            let store = InMemoryStore::with_items(ids.iter().map(|id| Item::new("customer", id.as_str())));
            let before = sorted(store.items_by_type("customer"));

            let old = store.item_by_id("customer", &ids[pick.index(ids.len())]).unwrap();
            let change = if delete {
                ItemChange::delete(old)
            } else {
                let mut new = old.clone();
                new.set_id(renamed);
                ItemChange::update(new, old)
            };

            store.commit(&change).unwrap();
            prop_assert_ne!(sorted(store.items_by_type("customer")), before.clone());
            store.commit(&change.inverse()).unwrap();
            prop_assert_eq!(sorted(store.items_by_type("customer")), before);
        }
    }
}
