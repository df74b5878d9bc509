//! # relitem Storage
//!
//! Item model and backing-store contract for relitem.
//!
//! This crate provides the lowest layer of relitem: the immutable-by-convention
//! [`Item`] record and the [`ItemStore`] trait through which the document
//! manager reads committed items and hands over validated changes.
//!
//! ## Design Principles
//!
//! - Stores know nothing about foreign keys, triggers or transactions
//! - Every change is offered twice: a dry-run `prepare`, then `commit`
//! - Stores must be `Send + Sync` so readers can share them
//! - Items are values; a store never mutates an item it handed out
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral documents
//! - [`FileStore`] - JSON snapshot file with an exclusive lock
//!
//! ## Example
//!
//! ```rust
//! use relitem_storage::{InMemoryStore, Item, ItemChange, ItemStore};
//!
//! let store = InMemoryStore::new();
//! let item = Item::new("customer", "c1").with_field("Name", "Alice");
//! store.commit(&ItemChange::create(item)).unwrap();
//! assert!(store.item_by_id("customer", "c1").is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod error;
mod file;
mod item;
mod memory;
mod repository;
mod store;

pub use change::{ChangeKind, ItemChange};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use item::{Field, Item, QualifiedId, Value};
pub use memory::InMemoryStore;
pub use store::ItemStore;
