//! Change triples handed to stores and observers.

use crate::item::Item;
use std::fmt;

/// Kind of a change, derived from which sides are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// No old item.
    Create,
    /// Both items, same id.
    Update,
    /// Both items, different ids.
    Rename,
    /// No new item.
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Rename => "rename",
            ChangeKind::Delete => "delete",
        })
    }
}

/// A change of one record: `(new, old, qualifier)`.
///
/// `new` is `None` for a delete, `old` is `None` for a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemChange {
    /// Item after the change.
    pub new: Option<Item>,
    /// Item before the change.
    pub old: Option<Item>,
    /// Type qualifier of both items.
    pub qualifier: String,
}

impl ItemChange {
    /// Creates a change.
    pub fn new(new: Option<Item>, old: Option<Item>, qualifier: impl Into<String>) -> Self {
        Self {
            new,
            old,
            qualifier: qualifier.into(),
        }
    }

    /// Creates a create change.
    pub fn create(new: Item) -> Self {
        let qualifier = new.qualifier().to_owned();
        Self::new(Some(new), None, qualifier)
    }

    /// Creates an update or rename change.
    pub fn update(new: Item, old: Item) -> Self {
        let qualifier = old.qualifier().to_owned();
        Self::new(Some(new), Some(old), qualifier)
    }

    /// Creates a delete change.
    pub fn delete(old: Item) -> Self {
        let qualifier = old.qualifier().to_owned();
        Self::new(None, Some(old), qualifier)
    }

    /// Returns the kind, or `None` when both sides are absent.
    #[must_use]
    pub fn kind(&self) -> Option<ChangeKind> {
        match (&self.new, &self.old) {
            (None, None) => None,
            (Some(_), None) => Some(ChangeKind::Create),
            (None, Some(_)) => Some(ChangeKind::Delete),
            (Some(new), Some(old)) if new.id() == old.id() => Some(ChangeKind::Update),
            (Some(_), Some(_)) => Some(ChangeKind::Rename),
        }
    }

    /// Returns true when there is nothing to apply.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.new.is_none() && self.old.is_none()
    }

    /// Returns the change that reverts this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            new: self.old.clone(),
            old: self.new.clone(),
            qualifier: self.qualifier.clone(),
        }
    }

    /// Returns the id before the change.
    #[must_use]
    pub fn old_id(&self) -> Option<&str> {
        self.old.as_ref().map(Item::id)
    }

    /// Returns the id after the change.
    #[must_use]
    pub fn new_id(&self) -> Option<&str> {
        self.new.as_ref().map(Item::id)
    }
}

impl fmt::Display for ItemChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |item: &Option<Item>| {
            item.as_ref()
                .map_or_else(|| "-".to_owned(), |i| i.qualified_id().to_string())
        };
        write!(f, "{} -> {}", side(&self.old), side(&self.new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let a = Item::new("customer", "c1");
        let b = Item::new("customer", "c2");

        assert_eq!(ItemChange::create(a.clone()).kind(), Some(ChangeKind::Create));
        assert_eq!(ItemChange::delete(a.clone()).kind(), Some(ChangeKind::Delete));
        assert_eq!(
            ItemChange::update(a.clone().with_field("Name", "x"), a.clone()).kind(),
            Some(ChangeKind::Update)
        );
        assert_eq!(ItemChange::update(b, a).kind(), Some(ChangeKind::Rename));
        assert_eq!(ItemChange::new(None, None, "customer").kind(), None);
    }

    #[test]
    fn inverse_swaps_sides() {
        let a = Item::new("customer", "c1");
        let change = ItemChange::create(a.clone());
        let inverse = change.inverse();

        assert_eq!(inverse.kind(), Some(ChangeKind::Delete));
        assert_eq!(inverse.old, Some(a));
        assert_eq!(inverse.inverse(), change);
    }

    #[test]
    fn display() {
        let change = ItemChange::update(Item::new("customer", "c2"), Item::new("customer", "c1"));
        assert_eq!(change.to_string(), "customer:c1 -> customer:c2");
    }
}
