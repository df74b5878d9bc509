//! # relitem Core
//!
//! Transactional document manager for relitem.
//!
//! This crate provides:
//! - Type registry of per-type setters and creators
//! - Staging transactions with read-your-writes lookups
//! - Foreign keys with `NoAction`/`Cascade` policies and lifecycle triggers
//! - Undo/redo of committed transactions
//! - Change feed of committed item changes
//! - Declarative JSON schemas for generic item types
//!
//! ## Example
//!
//! ```rust
//! use relitem_core::{DocumentManager, ForeignKey, GenericType, OnChangePolicy};
//!
//! let mut dm = DocumentManager::in_memory();
//! dm.register_generic_type(GenericType::new("customer", ["Id", "Name"]));
//! dm.register_generic_type(GenericType::new("order", ["Id", "CustomerId", "Amount"]));
//! dm.add_foreign_key(
//!     ForeignKey::new("order", 1, "customer", 0)
//!         .on_update(OnChangePolicy::Cascade)
//!         .on_delete(OnChangePolicy::Cascade),
//! );
//!
//! let customer = dm.create_new("customer").unwrap();
//! dm.create_new_with("order", |_, order| {
//!     order.set_value(1, customer.id());
//!     Ok(())
//! })
//! .unwrap();
//!
//! dm.delete(&customer).unwrap();
//! assert!(dm.items_by_type("order").is_empty());
//!
//! dm.undo().unwrap();
//! assert_eq!(dm.items_by_type("order").len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod config;
mod constraint;
mod error;
mod history;
mod integrity;
mod manager;
mod registry;
mod schema;
mod transaction;

pub use change_feed::{ChangeEvent, ChangeFeed, ChangeOrigin, Observer};
pub use config::Config;
pub use constraint::{ForeignKey, OnChangePolicy, Trigger, TriggerItems, TriggerPoint, TriggerSet};
pub use error::{Capability, DocError, DocResult};
pub use history::UndoHistory;
pub use integrity::IntegrityViolation;
pub use manager::DocumentManager;
pub use registry::{Creator, GenericType, Setter, TypeRegistry};
pub use schema::{Schema, TypeSchema};
pub use transaction::{ChangeSet, Transaction, TransactionState};

pub use relitem_storage::{ChangeKind, Item, ItemChange, ItemStore, QualifiedId, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
