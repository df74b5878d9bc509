//! Lifecycle triggers.

use crate::error::DocResult;
use crate::transaction::Transaction;
use relitem_storage::Item;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Point of the change pipeline a trigger runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerPoint {
    /// Before a creation is checked and staged.
    BeforeCreate,
    /// After a creation is staged.
    AfterCreate,
    /// Before an update is staged.
    BeforeUpdate,
    /// After an update is staged and cascaded.
    AfterUpdate,
    /// Before a deletion is staged.
    BeforeDelete,
    /// After a deletion is staged and cascaded.
    AfterDelete,
}

impl TriggerPoint {
    /// All trigger points, in pipeline order.
    pub const ALL: [TriggerPoint; 6] = [
        Self::BeforeCreate,
        Self::AfterCreate,
        Self::BeforeUpdate,
        Self::AfterUpdate,
        Self::BeforeDelete,
        Self::AfterDelete,
    ];

    /// Returns true for Before* points, whose edits to the new item stick.
    #[must_use]
    pub fn is_before(self) -> bool {
        matches!(
            self,
            Self::BeforeCreate | Self::BeforeUpdate | Self::BeforeDelete
        )
    }
}

/// The items a trigger is invoked with.
///
/// `new` is absent for deletions, `old` for creations. Before* triggers may
/// edit `new` in place and the edit is what gets staged; After* triggers
/// receive a scratch copy.
#[derive(Debug)]
pub struct TriggerItems<'a> {
    /// Candidate new version.
    pub new: Option<&'a mut Item>,
    /// Current version.
    pub old: Option<&'a Item>,
}

/// A lifecycle callback.
///
/// Returning an error aborts the whole operation; use
/// [`DocError::vetoed`](crate::DocError::vetoed) to refuse with a reason.
/// Triggers may stage further changes through the transaction.
pub type Trigger =
    Arc<dyn Fn(&mut Transaction<'_>, TriggerItems<'_>) -> DocResult<()> + Send + Sync>;

/// Triggers by qualifier and point, in registration order.
#[derive(Clone, Default)]
pub struct TriggerSet {
    triggers: HashMap<(String, TriggerPoint), Vec<Trigger>>,
}

impl TriggerSet {
    /// Appends a trigger.
    pub fn add(&mut self, qualifier: impl Into<String>, point: TriggerPoint, trigger: Trigger) {
        self.triggers
            .entry((qualifier.into(), point))
            .or_default()
            .push(trigger);
    }

    /// Returns the triggers for a qualifier and point.
    #[must_use]
    pub fn get(&self, qualifier: &str, point: TriggerPoint) -> &[Trigger] {
        self.triggers
            .get(&(qualifier.to_owned(), point))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the total number of triggers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.values().map(Vec::len).sum()
    }

    /// Returns true if no trigger is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerSet")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Trigger {
        Arc::new(|_txn: &mut Transaction<'_>, _items: TriggerItems<'_>| Ok(()))
    }

    #[test]
    fn triggers_are_kept_per_point() {
        let mut set = TriggerSet::default();
        set.add("customer", TriggerPoint::BeforeCreate, noop());
        set.add("customer", TriggerPoint::BeforeCreate, noop());
        set.add("customer", TriggerPoint::AfterDelete, noop());

        assert_eq!(set.get("customer", TriggerPoint::BeforeCreate).len(), 2);
        assert_eq!(set.get("customer", TriggerPoint::AfterCreate).len(), 0);
        assert!(set.get("order", TriggerPoint::AfterDelete).is_empty());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn before_points() {
        let before: Vec<_> = TriggerPoint::ALL
            .into_iter()
            .filter(|p| p.is_before())
            .collect();
        assert_eq!(before.len(), 3);
    }
}
