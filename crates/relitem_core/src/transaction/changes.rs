//! Ordered change list of a transaction.

use relitem_storage::{ChangeKind, Item, ItemChange};

/// The ordered changes staged by one transaction.
///
/// A committed `ChangeSet` is the unit of undo and redo. Applying its
/// changes in order to the store that was current when the transaction
/// began yields the committed state; each change's `old` is the record's
/// value right before that change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<ItemChange>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a change.
    ///
    /// With `merge`, a change continuing the previous change's record is
    /// folded into it; folding a creation with a deletion leaves nothing.
    pub(crate) fn push(&mut self, change: ItemChange, merge: bool) {
        if merge {
            if let Some(last) = self.changes.last_mut() {
                if continues(last, &change) {
                    last.new = change.new;
                    if last.is_noop() {
                        self.changes.pop();
                    }
                    return;
                }
            }
        }
        self.changes.push(change);
    }

    /// Returns the changes in staging order.
    #[must_use]
    pub fn changes(&self) -> &[ItemChange] {
        &self.changes
    }

    /// Returns the number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if there is no change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Iterates over the changes in staging order.
    pub fn iter(&self) -> std::slice::Iter<'_, ItemChange> {
        self.changes.iter()
    }

    /// Returns the set that reverts this one: every change inverted, in
    /// reverse order.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            changes: self.changes.iter().rev().map(ItemChange::inverse).collect(),
        }
    }

    /// Human-readable description, e.g. `Creating a customer and other changes`.
    #[must_use]
    pub fn label(&self) -> String {
        let Some(first) = self.changes.first() else {
            return "No changes".to_owned();
        };
        let verb = match first.kind() {
            Some(ChangeKind::Create) => "Creating",
            Some(ChangeKind::Delete) => "Deleting",
            _ => "Changing",
        };
        let mut label = format!("{verb} a {}", first.qualifier);
        if self.changes.len() > 1 {
            label.push_str(" and other changes");
        }
        label
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ItemChange;
    type IntoIter = std::slice::Iter<'a, ItemChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn continues(previous: &ItemChange, next: &ItemChange) -> bool {
    if previous.qualifier != next.qualifier {
        return false;
    }
    match (&previous.new, &next.old, &previous.old, &next.new) {
        (Some(produced), Some(consumed), _, _) => produced.same_record(consumed),
        // delete then re-create of the same id
        (None, None, Some(deleted), Some(created)) => deleted.same_record(created),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, name: &str) -> Item {
        Item::new("customer", id).with_field("Name", name)
    }

    #[test]
    fn consecutive_updates_merge() {
        let mut set = ChangeSet::new();
        let v1 = customer("c1", "a");
        let v2 = customer("c1", "b");
        let v3 = customer("c1", "c");

        set.push(ItemChange::update(v2.clone(), v1.clone()), true);
        set.push(ItemChange::update(v3.clone(), v2), true);

        assert_eq!(set.changes(), &[ItemChange::update(v3, v1)]);
    }

    #[test]
    fn rename_chain_merges() {
        let mut set = ChangeSet::new();
        set.push(ItemChange::update(customer("c2", "a"), customer("c1", "a")), true);
        set.push(ItemChange::update(customer("c3", "a"), customer("c2", "a")), true);

        assert_eq!(set.len(), 1);
        assert_eq!(set.changes()[0].old_id(), Some("c1"));
        assert_eq!(set.changes()[0].new_id(), Some("c3"));
    }

    #[test]
    fn create_then_delete_cancels() {
        let mut set = ChangeSet::new();
        let item = customer("c1", "a");
        set.push(ItemChange::create(item.clone()), true);
        set.push(ItemChange::delete(item), true);

        assert!(set.is_empty());
    }

    #[test]
    fn delete_then_create_becomes_update() {
        let mut set = ChangeSet::new();
        set.push(ItemChange::delete(customer("c1", "a")), true);
        set.push(ItemChange::create(customer("c1", "b")), true);

        assert_eq!(set.len(), 1);
        assert_eq!(set.changes()[0].kind(), Some(ChangeKind::Update));
    }

    #[test]
    fn no_merge_without_flag_or_across_records() {
        let mut set = ChangeSet::new();
        let v1 = customer("c1", "a");
        let v2 = customer("c1", "b");
        set.push(ItemChange::update(v2.clone(), v1), false);
        set.push(ItemChange::delete(v2), false);
        set.push(ItemChange::create(customer("c2", "x")), true);

        assert_eq!(set.len(), 3);
    }

    #[test]
    fn inverse_reverses_order() {
        let mut set = ChangeSet::new();
        set.push(ItemChange::create(customer("c1", "a")), true);
        set.push(ItemChange::create(customer("c2", "b")), true);

        let inverse = set.inverse();
        let ids: Vec<_> = inverse.iter().map(|c| c.old_id()).collect();
        assert_eq!(ids, [Some("c2"), Some("c1")]);
        assert!(inverse.iter().all(|c| c.kind() == Some(ChangeKind::Delete)));
    }

    #[test]
    fn labels() {
        let mut set = ChangeSet::new();
        assert_eq!(set.label(), "No changes");

        set.push(ItemChange::create(customer("c1", "a")), true);
        assert_eq!(set.label(), "Creating a customer");

        set.push(ItemChange::delete(Item::new("order", "o1")), true);
        assert_eq!(set.label(), "Creating a customer and other changes");
    }
}
