//! Staging transactions.
//!
//! A [`Transaction`] overlays the changes of one logical batch on top of
//! the committed store:
//! - **Atomicity**: nothing reaches the store before commit, and a dropped
//!   or aborted transaction has no effect
//! - **Read-your-writes**: lookups through the transaction see staged
//!   creations, updates and deletions
//! - **Undo**: the ordered change list becomes one undo step on commit

mod changes;
mod state;

pub use changes::ChangeSet;
pub use state::TransactionState;

use crate::constraint::engine;
use crate::error::{Capability, DocError, DocResult};
use crate::manager::DocumentManager;
use rand::Rng;
use relitem_storage::{Item, ItemChange, QualifiedId, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::debug;

type Staging = HashMap<String, BTreeMap<String, Option<Item>>>;

#[derive(Clone)]
struct Savepoint {
    staged: Staging,
    originals: Staging,
    changes: ChangeSet,
}

/// A staging area for one atomic batch of item changes.
///
/// Obtained from [`DocumentManager::begin`] and finished with
/// [`DocumentManager::commit`] or [`DocumentManager::abort`]; dropping it
/// discards the staged changes.
///
/// Staged entries map an id to the item's pending version, `None` meaning
/// a pending deletion. A [`Transaction::change_item`] call that fails,
/// including one made from inside a trigger, leaves the staging exactly as
/// it was before the call.
pub struct Transaction<'dm> {
    dm: &'dm DocumentManager,
    state: TransactionState,
    staged: Staging,
    originals: Staging,
    changes: ChangeSet,
    /// `(qualifier, id, field)` rewritten by cascades during the current
    /// top-level change.
    cascaded: HashSet<(String, String, usize)>,
    depth: usize,
}

impl<'dm> Transaction<'dm> {
    pub(crate) fn new(dm: &'dm DocumentManager) -> Self {
        Self {
            dm,
            state: TransactionState::Active,
            staged: HashMap::new(),
            originals: HashMap::new(),
            changes: ChangeSet::new(),
            cascaded: HashSet::new(),
            depth: 0,
        }
    }

    /// Returns the document manager this transaction belongs to.
    #[must_use]
    pub fn manager(&self) -> &'dm DocumentManager {
        self.dm
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Looks an item up, staged version first.
    ///
    /// A staged deletion hides the stored item.
    #[must_use]
    pub fn item_by_id(&self, qualifier: &str, id: &str) -> Option<Item> {
        match self.staged.get(qualifier).and_then(|items| items.get(id)) {
            Some(staged) => staged.clone(),
            None => self.dm.store().item_by_id(qualifier, id),
        }
    }

    /// Looks an item up by `qualifier:id`.
    #[must_use]
    pub fn item_by_qualified_id(&self, qualified_id: &str) -> Option<Item> {
        let QualifiedId { qualifier, id } = QualifiedId::parse(qualified_id);
        self.item_by_id(&qualifier, &id)
    }

    /// Returns the items of a type as this transaction sees them, ordered
    /// by id.
    #[must_use]
    pub fn items_by_type(&self, qualifier: &str) -> Vec<Item> {
        let stored = self.dm.store().items_by_type(qualifier);
        let Some(staged) = self.staged.get(qualifier) else {
            return stored;
        };
        let mut items: Vec<Item> = staged.values().flatten().cloned().collect();
        items.extend(
            stored
                .into_iter()
                .filter(|item| !staged.contains_key(item.id())),
        );
        items.sort_by(|a, b| a.id().cmp(b.id()));
        items
    }

    /// Returns the `source_qualifier` items whose field `source_field`
    /// holds `reference_id`.
    #[must_use]
    pub fn foreign_key_sources(
        &self,
        source_qualifier: &str,
        source_field: usize,
        reference_id: &str,
    ) -> Vec<Item> {
        self.items_by_type(source_qualifier)
            .into_iter()
            .filter(|item| item.text(source_field) == reference_id)
            .collect()
    }

    /// Processes and stages a change.
    ///
    /// `new` absent deletes `old`; `old` absent creates `new`; both absent
    /// does nothing. Returns the staged new version.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure of the change or of anything it
    /// cascaded into; see [`DocError`].
    pub fn change_item(
        &mut self,
        new: Option<Item>,
        old: Option<Item>,
        qualifier: &str,
    ) -> DocResult<Option<Item>> {
        self.state.ensure_active()?;
        if self.depth == 0 {
            self.cascaded.clear();
        }
        let savepoint = self.savepoint();

        self.depth += 1;
        let result = engine::process_change(self, new, old, qualifier);
        self.depth -= 1;

        if let Err(err) = &result {
            debug!(
                qualifier,
                depth = self.depth,
                error = %err,
                "change rejected, restoring staging"
            );
            self.restore(savepoint);
        }
        result
    }

    /// Changes one field of `old` through its type's setter and stages the
    /// result. Returns the staged new version.
    ///
    /// # Errors
    ///
    /// Returns `UnregisteredType` without a setter, `Rejected` if the setter
    /// refuses the value, or any failure of [`Transaction::change_item`].
    pub fn change_field(
        &mut self,
        old: &Item,
        index: usize,
        value: impl Into<Value>,
    ) -> DocResult<Item> {
        self.state.ensure_active()?;
        let qualifier = old.qualifier();
        let setter = self
            .manager()
            .registry()
            .setter(qualifier)
            .ok_or_else(|| DocError::unregistered(qualifier, Capability::Setter))?;
        let mut new = old.clone();
        setter(&mut new, index, &value.into(), &*self).map_err(DocError::rejected)?;
        self.change_item(Some(new), Some(old.clone()), qualifier)?
            .ok_or_else(|| DocError::invalid_operation("field change staged no item"))
    }

    /// Creates an item with a generated id and stages it.
    ///
    /// # Errors
    ///
    /// Returns `UnregisteredType` without a creator, `Rejected` if the
    /// creator refuses, or any failure of [`Transaction::change_item`].
    pub fn create_new_item(&mut self, qualifier: &str) -> DocResult<Item> {
        self.create_new_item_with(qualifier, |_, _| Ok(()))
    }

    /// Creates an item with a generated id, lets `modifier` edit it, then
    /// stages it.
    ///
    /// # Errors
    ///
    /// As [`Transaction::create_new_item`], plus the modifier's own error.
    pub fn create_new_item_with<F>(&mut self, qualifier: &str, modifier: F) -> DocResult<Item>
    where
        F: FnOnce(&mut Transaction<'dm>, &mut Item) -> DocResult<()>,
    {
        self.state.ensure_active()?;
        let creator = self
            .manager()
            .registry()
            .creator(qualifier)
            .ok_or_else(|| DocError::unregistered(qualifier, Capability::Creator))?;
        let id = self.generate_new_id(qualifier, None);
        let mut item = creator(&*self, &id).map_err(DocError::rejected)?;
        modifier(self, &mut item)?;
        self.change_item(Some(item), None, qualifier)?
            .ok_or_else(|| DocError::invalid_operation("creation staged no item"))
    }

    /// Returns an id not used by any `qualifier` item in this transaction's
    /// view.
    ///
    /// Tries `prefix1`, `prefix2`... up to the configured limit, then
    /// random suffixes. The prefix defaults to the qualifier.
    #[must_use]
    pub fn generate_new_id(&self, qualifier: &str, prefix: Option<&str>) -> String {
        let prefix = prefix.filter(|p| !p.is_empty()).unwrap_or(qualifier);
        for i in 1..=self.dm.config().sequential_id_limit {
            let id = format!("{prefix}{i}");
            if self.item_by_id(qualifier, &id).is_none() {
                return id;
            }
        }
        let mut rng = rand::thread_rng();
        loop {
            let id = format!("{prefix}{}", rng.gen::<u32>());
            if self.item_by_id(qualifier, &id).is_none() {
                return id;
            }
        }
    }

    /// Returns the committed version of a record as it was before this
    /// transaction touched it.
    #[must_use]
    pub fn original_item(&self, qualifier: &str, id: &str) -> Option<Item> {
        match self.originals.get(qualifier).and_then(|items| items.get(id)) {
            Some(original) => original.clone(),
            None => self.dm.store().item_by_id(qualifier, id),
        }
    }

    /// Returns the staged changes in order.
    #[must_use]
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Returns the number of staged changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Records a validated change.
    pub(crate) fn stage(
        &mut self,
        new: Option<Item>,
        old: Option<Item>,
        qualifier: &str,
    ) -> DocResult<()> {
        self.state.ensure_active()?;
        if let Some(new) = &new {
            let old_id = old.as_ref().map(Item::id);
            if old_id != Some(new.id()) && self.item_by_id(qualifier, new.id()).is_some() {
                return Err(DocError::id_constraint(format!(
                    "New id is already used by another {qualifier}: {}",
                    new.id()
                )));
            }
        }
        let change = ItemChange::new(new, old, qualifier);
        self.dm.store().prepare(&change).map_err(DocError::Prepare)?;

        let store = self.dm.store();
        let originals = self.originals.entry(qualifier.to_owned()).or_default();
        for id in change.old_id().into_iter().chain(change.new_id()) {
            if !originals.contains_key(id) {
                originals.insert(id.to_owned(), store.item_by_id(qualifier, id));
            }
        }

        let staged = self.staged.entry(qualifier.to_owned()).or_default();
        if let Some(old) = &change.old {
            staged.insert(old.id().to_owned(), None);
        }
        if let Some(new) = &change.new {
            staged.insert(new.id().to_owned(), Some(new.clone()));
        }
        debug!(change = %change, "staged");
        self.changes
            .push(change, self.dm.config().merge_changes);
        Ok(())
    }

    /// Marks a cascade rewrite; false if it already happened during the
    /// current top-level change.
    pub(crate) fn mark_cascaded(&mut self, qualifier: &str, id: &str, field: usize) -> bool {
        self.cascaded
            .insert((qualifier.to_owned(), id.to_owned(), field))
    }

    /// Ends the transaction, handing its changes over for commit.
    pub(crate) fn finish(&mut self, state: TransactionState) -> DocResult<ChangeSet> {
        self.state.ensure_active()?;
        self.state = state;
        self.staged.clear();
        self.originals.clear();
        Ok(std::mem::take(&mut self.changes))
    }

    pub(crate) fn belongs_to(&self, dm: &DocumentManager) -> bool {
        std::ptr::eq(self.dm, dm)
    }

    fn savepoint(&self) -> Savepoint {
        Savepoint {
            staged: self.staged.clone(),
            originals: self.originals.clone(),
            changes: self.changes.clone(),
        }
    }

    fn restore(&mut self, savepoint: Savepoint) {
        self.staged = savepoint.staged;
        self.originals = savepoint.originals;
        self.changes = savepoint.changes;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.is_active() && !self.changes.is_empty() {
            debug!(changes = self.changes.len(), "discarding uncommitted transaction");
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state)
            .field("changes", &self.changes.len())
            .finish()
    }
}
