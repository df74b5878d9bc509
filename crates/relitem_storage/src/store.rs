//! Item store trait definition.

use crate::change::ItemChange;
use crate::error::StorageResult;
use crate::item::Item;

/// The backing store behind a document manager.
///
/// Stores hold the committed items. They do not check foreign keys, run
/// triggers or generate ids; the document manager has validated every
/// change before it reaches the store.
///
/// # Two-phase protocol
///
/// - `prepare` is called once per change while a transaction is being
///   built. It must not alter visible state. A failure rejects the edit.
/// - `commit` is called once per change, in staging order, after the whole
///   transaction validated. A failure here is a technical failure (disk
///   full, lost connection...) and is reported as such.
///
/// Changes reaching `prepare` may depend on earlier changes of the same
/// transaction that are not committed yet, so `prepare` must only check
/// what does not depend on committed state.
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait ItemStore: Send + Sync {
    /// Returns the committed item, if any.
    fn item_by_id(&self, qualifier: &str, id: &str) -> Option<Item>;

    /// Returns the committed items of a type, ordered by id.
    fn items_by_type(&self, qualifier: &str) -> Vec<Item>;

    /// Returns every qualifier that currently has items.
    fn qualifiers(&self) -> Vec<String>;

    /// Dry-runs a change.
    ///
    /// # Errors
    ///
    /// Returns an error if the store would not be able to apply the change.
    fn prepare(&self, change: &ItemChange) -> StorageResult<()> {
        let _ = change;
        Ok(())
    }

    /// Applies a change.
    ///
    /// # Errors
    ///
    /// Returns an error if the change could not be applied; the store is
    /// then left as it was before the call.
    fn commit(&self, change: &ItemChange) -> StorageResult<()>;
}
