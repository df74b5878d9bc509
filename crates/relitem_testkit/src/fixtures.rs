//! Test fixtures and document helpers.
//!
//! Provides the customer/order schema used across the test suites and
//! convenience functions for setting up documents over it.

use relitem_core::{DocumentManager, ForeignKey, OnChangePolicy, Schema, TypeSchema};
use relitem_storage::{FileStore, InMemoryStore, Item, ItemStore, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Headers of the `customer` type.
pub const CUSTOMER_HEADERS: [&str; 2] = ["Id", "Name"];

/// Headers of the `order` type; `CustomerId` references a customer.
pub const ORDER_HEADERS: [&str; 3] = ["Id", "CustomerId", "Amount"];

/// The customer/order schema with one policy for both update and delete.
pub fn shop_schema(policy: OnChangePolicy) -> Schema {
    let type_schema = |qualifier: &str, headers: &[&str]| TypeSchema {
        qualifier: qualifier.to_owned(),
        headers: headers.iter().map(|h| (*h).to_owned()).collect(),
    };
    Schema {
        types: vec![
            type_schema("customer", &CUSTOMER_HEADERS[..]),
            type_schema("order", &ORDER_HEADERS[..]),
        ],
        foreign_keys: vec![ForeignKey::new("order", 1, "customer", 0)
            .on_update(policy)
            .on_delete(policy)],
    }
}

/// Builds a customer item.
pub fn customer(id: &str, name: &str) -> Item {
    Item::generic(
        "customer",
        CUSTOMER_HEADERS,
        [Value::from(id), Value::from(name)],
    )
}

/// Builds an order item.
pub fn order(id: &str, customer_id: &str, amount: i64) -> Item {
    Item::generic(
        "order",
        ORDER_HEADERS,
        [Value::from(id), Value::from(customer_id), Value::from(amount)],
    )
}

/// A test document with automatic cleanup.
pub struct TestDocument {
    /// The document manager.
    pub dm: DocumentManager,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestDocument {
    /// Creates a shop document over an in-memory store.
    pub fn memory(policy: OnChangePolicy) -> Self {
        Self::over(Arc::new(InMemoryStore::new()), policy)
    }

    /// Creates a shop document over the given store.
    pub fn over(store: Arc<dyn ItemStore>, policy: OnChangePolicy) -> Self {
        let mut dm = DocumentManager::new(store);
        shop_schema(policy)
            .apply(&mut dm)
            .expect("Failed to apply shop schema");
        Self {
            dm,
            _temp_dir: None,
        }
    }

    /// Creates a shop document over a file store in a temporary directory.
    pub fn file(policy: OnChangePolicy) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path().join("document.json"))
            .expect("Failed to open file store");
        let mut document = Self::over(Arc::new(store), policy);
        document._temp_dir = Some(temp_dir);
        document
    }

    /// Returns the store file if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir
            .as_ref()
            .map(|d| d.path().join("document.json"))
    }

    /// Returns every committed item of every registered type, grouped by
    /// qualifier and ordered by id.
    pub fn snapshot(&self) -> Vec<Item> {
        self.dm
            .registered_types()
            .iter()
            .flat_map(|q| self.dm.items_by_type(q))
            .collect()
    }
}

impl std::ops::Deref for TestDocument {
    type Target = DocumentManager;

    fn deref(&self) -> &Self::Target {
        &self.dm
    }
}

impl std::ops::DerefMut for TestDocument {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dm
    }
}

/// Runs a test with a temporary in-memory shop document.
///
/// # Example
///
/// ```rust
/// use relitem_core::OnChangePolicy;
/// use relitem_testkit::with_shop;
///
/// let count = with_shop(OnChangePolicy::NoAction, |dm| dm.items_by_type("order").len());
/// assert_eq!(count, 0);
/// ```
pub fn with_shop<F, R>(policy: OnChangePolicy, f: F) -> R
where
    F: FnOnce(&DocumentManager) -> R,
{
    let document = TestDocument::memory(policy);
    f(&document.dm)
}

/// Runs a test with a temporary file-backed shop document.
pub fn with_file_shop<F, R>(policy: OnChangePolicy, f: F) -> R
where
    F: FnOnce(&DocumentManager) -> R,
{
    let document = TestDocument::file(policy);
    f(&document.dm)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a shop with `customers` customers `c1..`, each with
    /// `orders_per_customer` orders. History starts empty.
    pub fn populated_shop(
        customers: usize,
        orders_per_customer: usize,
        policy: OnChangePolicy,
    ) -> TestDocument {
        let document = TestDocument::memory(policy);
        for c in 1..=customers {
            let customer_id = format!("c{c}");
            document
                .dm
                .transaction(|txn| {
                    txn.change_item(
                        Some(customer(&customer_id, &format!("Customer {c}"))),
                        None,
                        "customer",
                    )?;
                    for o in 1..=orders_per_customer {
                        let order_id = format!("o{c}_{o}");
                        let amount = i64::try_from(o * 10).unwrap_or(i64::MAX);
                        txn.change_item(
                            Some(order(&order_id, &customer_id, amount)),
                            None,
                            "order",
                        )?;
                    }
                    Ok(())
                })
                .expect("Failed to populate shop");
        }
        document.dm.clear_history();
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_document_has_shop_types() {
        let document = TestDocument::memory(OnChangePolicy::Cascade);
        assert_eq!(document.registered_types(), vec!["customer", "order"]);
        assert!(document.path().is_none());
    }

    #[test]
    fn file_document_persists() {
        let document = TestDocument::file(OnChangePolicy::Cascade);
        document.create_new("customer").unwrap();
        let path = document.path().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn populated_scenario() {
        let document = scenarios::populated_shop(3, 2, OnChangePolicy::Cascade);
        assert_eq!(document.items_by_type("customer").len(), 3);
        assert_eq!(document.items_by_type("order").len(), 6);
        assert_eq!(document.snapshot().len(), 9);
        assert!(!document.can_undo());
        assert!(document.verify_integrity().is_empty());
    }
}
