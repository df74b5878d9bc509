//! Edit harness driving a shop document from generated operations.

use crate::fixtures::TestDocument;
use crate::generators::EditOperation;
use relitem_core::{DocResult, OnChangePolicy, Transaction};
use relitem_storage::{Item, ItemStore, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Applies [`EditOperation`]s to a shop document and checks its invariants.
pub struct EditHarness {
    /// The document under test.
    pub document: TestDocument,
    applied: usize,
    rejected: usize,
}

impl EditHarness {
    /// Creates a harness over an in-memory shop document.
    pub fn new(policy: OnChangePolicy) -> Self {
        Self::with_document(TestDocument::memory(policy))
    }

    /// Creates a harness over a shop document on the given store.
    pub fn over(store: Arc<dyn ItemStore>, policy: OnChangePolicy) -> Self {
        Self::with_document(TestDocument::over(store, policy))
    }

    /// Creates a harness over an existing document.
    pub fn with_document(document: TestDocument) -> Self {
        Self {
            document,
            applied: 0,
            rejected: 0,
        }
    }

    /// Applies one operation, each edit in its own transaction.
    ///
    /// Returns the number of item changes committed; undo and redo count
    /// as one when they did something.
    ///
    /// # Errors
    ///
    /// Returns the document's error when the operation is refused.
    pub fn apply(&mut self, op: &EditOperation) -> DocResult<usize> {
        let result = match op {
            EditOperation::Undo => self.document.undo().map(usize::from),
            EditOperation::Redo => self.document.redo().map(usize::from),
            edit => self
                .document
                .dm
                .transaction(|txn| {
                    apply_edit(txn, edit)?;
                    Ok(txn.len())
                }),
        };
        match &result {
            Ok(_) => self.applied += 1,
            Err(_) => self.rejected += 1,
        }
        result
    }

    /// Applies a sequence of operations, ignoring refusals.
    pub fn apply_all(&mut self, ops: &[EditOperation]) {
        for op in ops {
            let _ = self.apply(op);
        }
    }

    /// Returns every committed item.
    pub fn snapshot(&self) -> Vec<Item> {
        self.document.snapshot()
    }

    /// Panics if the committed state breaks an invariant: every reference
    /// resolves, ids are non-empty and unique per type.
    pub fn assert_consistent(&self) {
        let violations = self.document.verify_integrity();
        assert!(violations.is_empty(), "integrity violations: {violations:?}");

        let mut seen = HashSet::new();
        for item in self.snapshot() {
            assert!(!item.id().is_empty(), "empty id in {item}");
            assert!(seen.insert(item.qualified_id()), "duplicate {item}");
        }
    }

    /// Number of operations that succeeded.
    pub fn applied_count(&self) -> usize {
        self.applied
    }

    /// Number of operations the document refused.
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }
}

impl Default for EditHarness {
    fn default() -> Self {
        Self::new(OnChangePolicy::Cascade)
    }
}

fn pick(items: Vec<Item>, position: usize) -> Option<Item> {
    if items.is_empty() {
        None
    } else {
        let len = items.len();
        items.into_iter().nth(position % len)
    }
}

fn apply_edit(txn: &mut Transaction<'_>, op: &EditOperation) -> DocResult<()> {
    match op {
        EditOperation::CreateCustomer { name } => {
            let name = name.clone();
            txn.create_new_item_with("customer", |_, customer| {
                customer.set_value(1, name);
                Ok(())
            })?;
        }
        EditOperation::CreateOrder { customer, amount } => {
            let customer_id = customer
                .and_then(|position| pick(txn.items_by_type("customer"), position))
                .map_or(Value::Null, |c| Value::from(c.id()));
            let amount = *amount;
            txn.create_new_item_with("order", |_, order| {
                order.set_value(1, customer_id);
                order.set_value(2, amount);
                Ok(())
            })?;
        }
        EditOperation::RenameCustomer { customer, id } => {
            if let Some(customer) = pick(txn.items_by_type("customer"), *customer) {
                txn.change_field(&customer, 0, id.as_str())?;
            }
        }
        EditOperation::Reassign { order, customer_id } => {
            if let Some(order) = pick(txn.items_by_type("order"), *order) {
                txn.change_field(&order, 1, customer_id.as_str())?;
            }
        }
        EditOperation::SetAmount { order, amount } => {
            if let Some(order) = pick(txn.items_by_type("order"), *order) {
                txn.change_field(&order, 2, *amount)?;
            }
        }
        EditOperation::DeleteCustomer { customer } => {
            if let Some(customer) = pick(txn.items_by_type("customer"), *customer) {
                txn.change_item(None, Some(customer), "customer")?;
            }
        }
        EditOperation::DeleteOrder { order } => {
            if let Some(order) = pick(txn.items_by_type("order"), *order) {
                txn.change_item(None, Some(order), "order")?;
            }
        }
        EditOperation::Undo | EditOperation::Redo => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_applies_edits() {
        let mut harness = EditHarness::new(OnChangePolicy::Cascade);
        harness
            .apply(&EditOperation::CreateCustomer {
                name: "Alice".into(),
            })
            .unwrap();
        let changes = harness
            .apply(&EditOperation::CreateOrder {
                customer: Some(7),
                amount: 5,
            })
            .unwrap();
        assert_eq!(changes, 1);

        let orders = harness.document.items_by_type("order");
        assert_eq!(orders[0].text(1), "customer1");

        harness
            .apply(&EditOperation::DeleteCustomer { customer: 0 })
            .unwrap();
        assert!(harness.snapshot().is_empty());
        assert_eq!(harness.applied_count(), 3);
        harness.assert_consistent();
    }

    #[test]
    fn harness_counts_refusals() {
        let mut harness = EditHarness::new(OnChangePolicy::NoAction);
        harness.apply_all(&[
            EditOperation::CreateCustomer { name: "A".into() },
            EditOperation::CreateOrder {
                customer: Some(0),
                amount: 1,
            },
            EditOperation::DeleteCustomer { customer: 0 },
            EditOperation::Reassign {
                order: 0,
                customer_id: "nobody".into(),
            },
        ]);
        assert_eq!(harness.applied_count(), 2);
        assert_eq!(harness.rejected_count(), 2);
        harness.assert_consistent();
    }

    #[test]
    fn edits_on_empty_document_do_nothing() {
        let mut harness = EditHarness::default();
        let changes = harness
            .apply(&EditOperation::SetAmount {
                order: 3,
                amount: 1,
            })
            .unwrap();
        assert_eq!(changes, 0);
        assert!(!harness.document.can_undo());
        assert_eq!(harness.apply(&EditOperation::Undo).unwrap(), 0);
    }
}
