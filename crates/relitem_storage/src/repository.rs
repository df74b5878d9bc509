//! Per-qualifier item maps shared by the store implementations.

use crate::change::ItemChange;
use crate::error::{StorageError, StorageResult};
use crate::item::Item;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub(crate) struct Repository {
    items: HashMap<String, BTreeMap<String, Item>>,
}

impl Repository {
    pub(crate) fn get(&self, qualifier: &str, id: &str) -> Option<Item> {
        self.items.get(qualifier)?.get(id).cloned()
    }

    pub(crate) fn by_type(&self, qualifier: &str) -> Vec<Item> {
        self.items
            .get(qualifier)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn qualifiers(&self) -> Vec<String> {
        let mut qualifiers: Vec<String> = self
            .items
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(q, _)| q.clone())
            .collect();
        qualifiers.sort();
        qualifiers
    }

    pub(crate) fn len(&self) -> usize {
        self.items.values().map(BTreeMap::len).sum()
    }

    /// Iterates over every item, grouped by qualifier, ordered by id.
    pub(crate) fn all(&self) -> Vec<Item> {
        self.qualifiers()
            .iter()
            .flat_map(|q| self.by_type(q))
            .collect()
    }

    /// Refuses changes whose old item is not stored (no create-or-update,
    /// no delete-if-exists) and changes that would overwrite another record.
    pub(crate) fn check(&self, change: &ItemChange) -> StorageResult<()> {
        if let Some(old) = &change.old {
            if self.get(&change.qualifier, old.id()).is_none() {
                return Err(StorageError::rejected(format!(
                    "old item {} not found",
                    old.qualified_id()
                )));
            }
        }
        if let Some(new) = &change.new {
            if change.old_id() != Some(new.id())
                && self.get(&change.qualifier, new.id()).is_some()
            {
                return Err(StorageError::rejected(format!(
                    "id already used: {}",
                    new.qualified_id()
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn apply(&mut self, change: &ItemChange) {
        let items = self.items.entry(change.qualifier.clone()).or_default();
        if let Some(old) = &change.old {
            items.remove(old.id());
        }
        if let Some(new) = &change.new {
            items.insert(new.id().to_owned(), new.clone());
        }
    }

    pub(crate) fn insert(&mut self, item: Item) -> Option<Item> {
        self.items
            .entry(item.qualifier().to_owned())
            .or_default()
            .insert(item.id().to_owned(), item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_moves_entry() {
        let mut repo = Repository::default();
        let old = Item::new("customer", "c1");
        repo.insert(old.clone());

        let change = ItemChange::update(Item::new("customer", "c2"), old);
        repo.check(&change).unwrap();
        repo.apply(&change);

        assert!(repo.get("customer", "c1").is_none());
        assert!(repo.get("customer", "c2").is_some());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn check_rejects_missing_old_and_collisions() {
        let mut repo = Repository::default();
        repo.insert(Item::new("customer", "c1"));

        let missing = ItemChange::delete(Item::new("customer", "zz"));
        assert!(matches!(
            repo.check(&missing),
            Err(StorageError::Rejected { .. })
        ));

        let collision = ItemChange::create(Item::new("customer", "c1"));
        assert!(repo.check(&collision).is_err());

        let in_place = ItemChange::update(
            Item::new("customer", "c1").with_field("Name", "x"),
            Item::new("customer", "c1"),
        );
        assert!(repo.check(&in_place).is_ok());
    }

    #[test]
    fn qualifiers_skip_emptied_types() {
        let mut repo = Repository::default();
        let item = Item::new("order", "o1");
        repo.insert(item.clone());
        repo.insert(Item::new("customer", "c1"));
        repo.apply(&ItemChange::delete(item));

        assert_eq!(repo.qualifiers(), vec!["customer".to_owned()]);
    }
}
