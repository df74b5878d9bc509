//! Document manager facade.

use crate::change_feed::{ChangeEvent, ChangeFeed, ChangeOrigin, Observer};
use crate::config::Config;
use crate::constraint::{ForeignKey, Trigger, TriggerItems, TriggerPoint, TriggerSet};
use crate::error::{DocError, DocResult};
use crate::history::UndoHistory;
use crate::integrity::IntegrityViolation;
use crate::registry::{Creator, GenericType, Setter, TypeRegistry};
use crate::transaction::{ChangeSet, Transaction, TransactionState};
use parking_lot::Mutex;
use relitem_storage::{InMemoryStore, Item, ItemChange, ItemStore, QualifiedId, Value};
use std::fmt;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, warn};

/// The main document handle.
///
/// `DocumentManager` is the entry point for editing items. It provides:
/// - Type, foreign-key and trigger registration
/// - Create, update and delete with constraint checking and cascades
/// - Multi-change transactions
/// - Undo and redo of committed transactions
/// - Change notifications
///
/// Registration takes `&mut self` and is meant to happen before editing
/// starts; it affects subsequent operations only. Every mutating operation
/// runs in its own transaction unless the caller opens one explicitly.
///
/// The manager does not serialize writers: callers run at most one
/// mutating operation at a time. Reads may run concurrently.
///
/// # Example
///
/// ```rust
/// use relitem_core::{DocError, DocumentManager, ForeignKey, GenericType};
///
/// let mut dm = DocumentManager::in_memory();
/// dm.register_generic_type(GenericType::new("customer", ["Id", "Name"]));
/// dm.register_generic_type(GenericType::new("order", ["Id", "CustomerId"]));
/// dm.add_foreign_key(ForeignKey::new("order", 1, "customer", 0));
///
/// let customer = dm.create_new("customer").unwrap();
/// let order = dm.create_new("order").unwrap();
/// dm.update_field(&order, 1, customer.id()).unwrap();
///
/// let err = dm.delete(&customer).unwrap_err();
/// assert!(matches!(err, DocError::ReferentialIntegrity { dependents: 1, .. }));
/// ```
pub struct DocumentManager {
    config: Config,
    store: Arc<dyn ItemStore>,
    registry: TypeRegistry,
    foreign_keys: Vec<ForeignKey>,
    triggers: TriggerSet,
    history: Mutex<UndoHistory>,
    feed: ChangeFeed,
}

impl DocumentManager {
    /// Creates a manager over a store with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self::with_config(store, Config::default())
    }

    /// Creates a manager over a store.
    #[must_use]
    pub fn with_config(store: Arc<dyn ItemStore>, config: Config) -> Self {
        Self {
            history: Mutex::new(UndoHistory::new(config.undo_limit)),
            feed: ChangeFeed::with_max_history(config.change_history),
            config,
            store,
            registry: TypeRegistry::new(),
            foreign_keys: Vec::new(),
            triggers: TriggerSet::default(),
        }
    }

    /// Creates a manager over an empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    // =====================================================================
    // Registration
    // =====================================================================

    /// Registers the setter and creator of a type; the last registration
    /// of a qualifier wins.
    pub fn register_type<S, C>(&mut self, qualifier: impl Into<String>, setter: S, creator: C)
    where
        S: Fn(&mut Item, usize, &Value, &Transaction<'_>) -> Result<(), String>
            + Send
            + Sync
            + 'static,
        C: Fn(&Transaction<'_>, &str) -> Result<Item, String> + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(setter);
        let creator: Creator = Arc::new(creator);
        self.registry.register(qualifier, setter, creator);
    }

    /// Registers a generic type.
    pub fn register_generic_type(&mut self, generic: GenericType) {
        self.registry
            .register(generic.qualifier(), generic.setter(), generic.creator());
    }

    /// Declares a foreign key.
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) {
        debug!(foreign_key = %foreign_key, "foreign key added");
        self.foreign_keys.push(foreign_key);
    }

    /// Registers a trigger; triggers of the same type and point run in
    /// registration order.
    pub fn add_trigger<F>(&mut self, qualifier: impl Into<String>, point: TriggerPoint, trigger: F)
    where
        F: Fn(&mut Transaction<'_>, TriggerItems<'_>) -> DocResult<()> + Send + Sync + 'static,
    {
        let trigger: Trigger = Arc::new(trigger);
        self.triggers.add(qualifier, point, trigger);
    }

    // =====================================================================
    // Transactions
    // =====================================================================

    /// Begins a new transaction.
    ///
    /// Several transactions may be open at once. Each one validates
    /// against the store as it was when its changes were staged, and
    /// [`DocumentManager::commit`] does not check open transactions against
    /// each other, so callers that stage concurrently must serialize their
    /// transactions themselves.
    #[must_use]
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Commits a transaction.
    ///
    /// Every staged change is applied to the store in order, the set is
    /// recorded for undo, then one event per change is emitted. Returns the
    /// committed changes.
    ///
    /// The changes are not validated again: a transaction committed after
    /// another one that touched the same records may store a dangling
    /// reference. Serializing transactions is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the transaction belongs to another
    /// manager or is not active, and `Storage` if the store failed; in the
    /// latter case changes already applied are rolled back.
    pub fn commit(&self, mut txn: Transaction<'_>) -> DocResult<ChangeSet> {
        self.ensure_owned(&txn)?;
        let set = txn.finish(TransactionState::Committed)?;
        if set.is_empty() {
            return Ok(set);
        }
        self.apply(set.changes())?;
        debug!(changes = set.len(), label = %set.label(), "committed");
        self.history.lock().record(set.clone());
        self.feed.emit_batch(set.changes(), ChangeOrigin::Commit);
        Ok(set)
    }

    /// Aborts a transaction, discarding its changes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the transaction belongs to another
    /// manager or is not active.
    pub fn abort(&self, mut txn: Transaction<'_>) -> DocResult<()> {
        self.ensure_owned(&txn)?;
        let discarded = txn.finish(TransactionState::Aborted)?;
        debug!(changes = discarded.len(), "aborted");
        Ok(())
    }

    /// Executes a function within a transaction.
    ///
    /// If the function returns `Ok`, the transaction is committed.
    /// If it returns `Err`, the transaction is aborted.
    ///
    /// # Errors
    ///
    /// Returns the function's error or the commit error.
    pub fn transaction<F, T>(&self, f: F) -> DocResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> DocResult<T>,
    {
        let mut txn = self.begin();
        match f(&mut txn) {
            Ok(value) => {
                self.commit(txn)?;
                Ok(value)
            }
            Err(err) => {
                self.abort(txn)?;
                Err(err)
            }
        }
    }

    // =====================================================================
    // Editing
    // =====================================================================

    /// Creates and commits an item with a generated id.
    ///
    /// # Errors
    ///
    /// Returns any validation error; nothing is stored then.
    pub fn create_new(&self, qualifier: &str) -> DocResult<Item> {
        self.transaction(|txn| txn.create_new_item(qualifier))
    }

    /// Creates an item with a generated id, lets `modifier` edit it, then
    /// commits it.
    ///
    /// # Errors
    ///
    /// Returns any validation error or the modifier's error; nothing is
    /// stored then.
    pub fn create_new_with<F>(&self, qualifier: &str, modifier: F) -> DocResult<Item>
    where
        F: FnOnce(&mut Transaction<'_>, &mut Item) -> DocResult<()>,
    {
        self.transaction(|txn| txn.create_new_item_with(qualifier, modifier))
    }

    /// Creates, updates, renames or deletes an item and commits.
    ///
    /// - both present: update or rename of `old`
    /// - `new` absent: deletion of `old`
    /// - `old` absent: creation of `new` under its own id
    /// - both absent: nothing
    ///
    /// Returns the committed new version.
    ///
    /// # Errors
    ///
    /// Returns any validation error; the store is unchanged then.
    pub fn update(&self, new: Option<Item>, old: Option<Item>) -> DocResult<Option<Item>> {
        let Some(qualifier) = new
            .as_ref()
            .or(old.as_ref())
            .map(|item| item.qualifier().to_owned())
        else {
            return Ok(None);
        };
        self.transaction(|txn| txn.change_item(new, old, &qualifier))
    }

    /// Changes one field of an item through its type's setter and commits.
    ///
    /// # Errors
    ///
    /// Returns any validation error; the store is unchanged then.
    pub fn update_field(&self, old: &Item, index: usize, value: impl Into<Value>) -> DocResult<Item> {
        self.transaction(|txn| txn.change_field(old, index, value))
    }

    /// Deletes an item and commits.
    ///
    /// # Errors
    ///
    /// Returns any validation error; the store is unchanged then.
    pub fn delete(&self, old: &Item) -> DocResult<()> {
        self.update(None, Some(old.clone())).map(|_| ())
    }

    // =====================================================================
    // Reads
    // =====================================================================

    /// Returns a committed item.
    #[must_use]
    pub fn item_by_id(&self, qualifier: &str, id: &str) -> Option<Item> {
        self.store.item_by_id(qualifier, id)
    }

    /// Returns a committed item by `qualifier:id`.
    #[must_use]
    pub fn item_by_qualified_id(&self, qualified_id: &str) -> Option<Item> {
        let QualifiedId { qualifier, id } = QualifiedId::parse(qualified_id);
        self.store.item_by_id(&qualifier, &id)
    }

    /// Returns the committed items of a type, ordered by id.
    #[must_use]
    pub fn items_by_type(&self, qualifier: &str) -> Vec<Item> {
        self.store.items_by_type(qualifier)
    }

    /// Returns an id not used by any committed `qualifier` item.
    #[must_use]
    pub fn generate_new_id(&self, qualifier: &str, prefix: Option<&str>) -> String {
        self.begin().generate_new_id(qualifier, prefix)
    }

    /// Checks the committed items of every registered type.
    #[must_use]
    pub fn verify_integrity(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();
        for qualifier in self.registry.qualifiers() {
            for item in self.store.items_by_type(&qualifier) {
                if item.id().is_empty() {
                    violations.push(IntegrityViolation::EmptyId {
                        qualifier: qualifier.clone(),
                    });
                }
                if item.qualifier() != qualifier {
                    violations.push(IntegrityViolation::QualifierMismatch {
                        stored_as: qualifier.clone(),
                        item: item.qualified_id(),
                    });
                }
                for fk in self
                    .foreign_keys
                    .iter()
                    .filter(|fk| fk.source_qualifier == qualifier)
                {
                    let reference = item.text(fk.source_field);
                    if !reference.is_empty()
                        && self
                            .store
                            .item_by_id(&fk.reference_qualifier, &reference)
                            .is_none()
                    {
                        violations.push(IntegrityViolation::DanglingReference {
                            item: item.qualified_id(),
                            field: fk.source_field,
                            reference: QualifiedId::new(
                                fk.reference_qualifier.as_str(),
                                reference.into_owned(),
                            ),
                        });
                    }
                }
            }
        }
        violations
    }

    // =====================================================================
    // Undo / redo
    // =====================================================================

    /// Reverts the most recent committed transaction.
    ///
    /// Returns `Ok(false)` if there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store failed; the step stays undoable.
    pub fn undo(&self) -> DocResult<bool> {
        let mut history = self.history.lock();
        let Some(set) = history.take_undo() else {
            return Ok(false);
        };
        let inverse = set.inverse();
        if let Err(err) = self.apply(inverse.changes()) {
            history.restore_undo(set);
            return Err(err);
        }
        debug!(label = %set.label(), "undone");
        history.undone(set);
        drop(history);
        self.feed.emit_batch(inverse.changes(), ChangeOrigin::Undo);
        Ok(true)
    }

    /// Re-applies the most recently undone transaction.
    ///
    /// Returns `Ok(false)` if there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store failed; the step stays redoable.
    pub fn redo(&self) -> DocResult<bool> {
        let mut history = self.history.lock();
        let Some(set) = history.take_redo() else {
            return Ok(false);
        };
        if let Err(err) = self.apply(set.changes()) {
            history.restore_redo(set);
            return Err(err);
        }
        debug!(label = %set.label(), "redone");
        let changes = set.clone();
        history.redone(set);
        drop(history);
        self.feed.emit_batch(changes.changes(), ChangeOrigin::Redo);
        Ok(true)
    }

    /// Returns true if there is something to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.lock().can_undo()
    }

    /// Returns true if there is something to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.lock().can_redo()
    }

    /// Label of the next undo step, e.g. `Deleting a customer`.
    #[must_use]
    pub fn undo_label(&self) -> Option<String> {
        self.history.lock().undo_label()
    }

    /// Label of the next redo step.
    #[must_use]
    pub fn redo_label(&self) -> Option<String> {
        self.history.lock().redo_label()
    }

    /// Forgets all undo and redo steps.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    // =====================================================================
    // Notifications
    // =====================================================================

    /// Subscribes to change events.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        self.feed.subscribe()
    }

    /// Registers a callback run synchronously after each commit, undo and
    /// redo, once per changed item.
    ///
    /// Observers must not start mutating operations on this manager.
    pub fn observe<F>(&self, observer: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        self.feed.observe(observer);
    }

    /// Returns events with sequence > cursor, up to limit.
    pub fn poll_changes(&self, cursor: u64, limit: usize) -> Vec<ChangeEvent> {
        self.feed.poll(cursor, limit)
    }

    /// Returns the change feed.
    #[must_use]
    pub fn change_feed(&self) -> &ChangeFeed {
        &self.feed
    }

    // =====================================================================
    // Accessors
    // =====================================================================

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &dyn ItemStore {
        self.store.as_ref()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the type registry.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Returns the declared foreign keys.
    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Returns the registered triggers.
    #[must_use]
    pub fn triggers(&self) -> &TriggerSet {
        &self.triggers
    }

    /// Returns the registered qualifiers, sorted.
    #[must_use]
    pub fn registered_types(&self) -> Vec<String> {
        self.registry.qualifiers()
    }

    fn ensure_owned(&self, txn: &Transaction<'_>) -> DocResult<()> {
        if txn.belongs_to(self) {
            Ok(())
        } else {
            Err(DocError::invalid_operation(
                "transaction belongs to another document manager",
            ))
        }
    }

    /// Applies changes in order; on failure rolls back the ones already
    /// applied, newest first.
    fn apply(&self, changes: &[ItemChange]) -> DocResult<()> {
        for (applied, change) in changes.iter().enumerate() {
            if let Err(err) = self.store.commit(change) {
                warn!(change = %change, error = %err, "store failed to apply change, rolling back");
                for done in changes[..applied].iter().rev() {
                    if let Err(rollback_err) = self.store.commit(&done.inverse()) {
                        warn!(
                            change = %done,
                            error = %rollback_err,
                            "rollback failed, store and document may disagree"
                        );
                    }
                }
                return Err(DocError::Storage(err));
            }
        }
        Ok(())
    }
}

impl Default for DocumentManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for DocumentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentManager")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("foreign_keys", &self.foreign_keys.len())
            .field("triggers", &self.triggers)
            .field("feed", &self.feed)
            .finish_non_exhaustive()
    }
}
