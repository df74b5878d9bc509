//! Change feed for observing committed item changes.
//!
//! The change feed emits one event per committed item change, enabling:
//! - Reactive UI updates
//! - Audit logging
//! - Catch-up polling by cursor
//!
//! # Usage
//!
//! ```rust
//! use relitem_core::{DocumentManager, GenericType};
//!
//! let mut dm = DocumentManager::in_memory();
//! dm.register_generic_type(GenericType::new("customer", ["Id", "Name"]));
//!
//! let receiver = dm.subscribe();
//! dm.create_new("customer").unwrap();
//!
//! let event = receiver.try_recv().unwrap();
//! assert_eq!(event.new_id(), Some("customer1"));
//! ```

use parking_lot::RwLock;
use relitem_storage::{ChangeKind, Item, ItemChange};
use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Why a change reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A transaction commit.
    Commit,
    /// An undo of a committed transaction.
    Undo,
    /// A redo of an undone transaction.
    Redo,
}

/// A single item-changed notification.
///
/// Events are emitted only after every change of a commit reached the store.
/// Creation has no `old`, deletion has no `new`, and a rename carries
/// different ids on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Position of the event in the feed, starting at 1.
    pub sequence: u64,
    /// Type of the changed item.
    pub qualifier: String,
    /// Kind of change.
    pub kind: ChangeKind,
    /// New version, absent for deletion.
    pub new: Option<Item>,
    /// Previous version, absent for creation.
    pub old: Option<Item>,
    /// What caused the change.
    pub origin: ChangeOrigin,
}

impl ChangeEvent {
    /// Returns the id of the new version.
    #[must_use]
    pub fn new_id(&self) -> Option<&str> {
        self.new.as_ref().map(Item::id)
    }

    /// Returns the id of the previous version.
    #[must_use]
    pub fn old_id(&self) -> Option<&str> {
        self.old.as_ref().map(Item::id)
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {} -> {}",
            self.sequence,
            self.kind,
            self.qualifier,
            self.old_id().unwrap_or("-"),
            self.new_id().unwrap_or("-"),
        )
    }
}

/// A synchronous observer callback.
pub type Observer = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct FeedState {
    history: VecDeque<ChangeEvent>,
    last_sequence: u64,
}

/// A change feed that distributes committed changes to observers and
/// subscribers.
///
/// The change feed:
/// - Emits only committed changes
/// - Preserves commit order
/// - Supports multiple observers and subscribers
/// - Is thread-safe
pub struct ChangeFeed {
    observers: RwLock<Vec<Observer>>,
    subscribers: RwLock<Vec<Sender<ChangeEvent>>>,
    state: RwLock<FeedState>,
    max_history: usize,
}

impl ChangeFeed {
    /// Creates a change feed keeping at most `max_history` events.
    #[must_use]
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            subscribers: RwLock::new(Vec::new()),
            state: RwLock::new(FeedState::default()),
            max_history,
        }
    }

    /// Registers a callback invoked synchronously for every event.
    pub fn observe(&self, observer: Observer) {
        self.observers.write().push(observer);
    }

    /// Subscribes to the change feed.
    ///
    /// Returns a receiver that will receive all future change events.
    /// The receiver should be drained regularly to avoid unbounded memory growth.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits one event per change, in order, and returns the events.
    ///
    /// No-op changes produce no event.
    pub fn emit_batch(&self, changes: &[ItemChange], origin: ChangeOrigin) -> Vec<ChangeEvent> {
        let events: Vec<ChangeEvent> = {
            let mut state = self.state.write();
            let mut events = Vec::with_capacity(changes.len());
            for change in changes {
                let Some(kind) = change.kind() else { continue };
                state.last_sequence += 1;
                events.push(ChangeEvent {
                    sequence: state.last_sequence,
                    qualifier: change.qualifier.clone(),
                    kind,
                    new: change.new.clone(),
                    old: change.old.clone(),
                    origin,
                });
            }
            state.history.extend(events.iter().cloned());
            let excess = state.history.len().saturating_sub(self.max_history);
            state.history.drain(..excess);
            events
        };

        // Observers run without any feed lock held so they may read the feed.
        let observers: Vec<Observer> = self.observers.read().clone();
        for event in &events {
            for observer in &observers {
                observer(event);
            }
        }

        // Send to subscribers (remove disconnected ones)
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| events.iter().all(|e| tx.send(e.clone()).is_ok()));
        events
    }

    /// Polls events from a sequence cursor.
    ///
    /// Returns events with sequence > cursor, up to limit.
    /// This is useful for catch-up scenarios.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<ChangeEvent> {
        self.state
            .read()
            .history
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the latest sequence number emitted.
    pub fn latest_sequence(&self) -> u64 {
        self.state.read().last_sequence
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("observers", &self.observers.read().len())
            .field("subscribers", &self.subscriber_count())
            .field("history", &self.history_len())
            .field("max_history", &self.max_history)
            .finish()
    }
}
