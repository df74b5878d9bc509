//! Property-based test generators using proptest.
//!
//! Operations address existing items by position rather than by id, so any
//! generated sequence applies to any document state: positions are taken
//! modulo the current number of items of the type.

use proptest::prelude::*;

/// Strategy for generating customer names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z ]{0,12}").expect("Invalid regex")
}

/// Strategy for generating ids from a small pool, so that collisions are
/// frequent.
pub fn id_strategy(prefix: &'static str) -> impl Strategy<Value = String> {
    (0u8..12).prop_map(move |n| format!("{prefix}{n}"))
}

/// Strategy for generating order amounts.
pub fn amount_strategy() -> impl Strategy<Value = i64> {
    -1_000i64..1_000_000
}

/// A single edit on the customer/order document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Create a customer with a generated id.
    CreateCustomer {
        /// Customer name.
        name: String,
    },
    /// Create an order with a generated id.
    CreateOrder {
        /// Position of the referenced customer; `None` leaves the
        /// reference empty.
        customer: Option<usize>,
        /// Order amount.
        amount: i64,
    },
    /// Rename a customer.
    RenameCustomer {
        /// Position of the customer.
        customer: usize,
        /// New id.
        id: String,
    },
    /// Point an order at another customer id, which may not exist.
    Reassign {
        /// Position of the order.
        order: usize,
        /// Customer id to reference.
        customer_id: String,
    },
    /// Change an order amount.
    SetAmount {
        /// Position of the order.
        order: usize,
        /// New amount.
        amount: i64,
    },
    /// Delete a customer.
    DeleteCustomer {
        /// Position of the customer.
        customer: usize,
    },
    /// Delete an order.
    DeleteOrder {
        /// Position of the order.
        order: usize,
    },
    /// Undo the last committed edit.
    Undo,
    /// Redo the last undone edit.
    Redo,
}

impl EditOperation {
    /// Returns true for undo and redo.
    pub fn is_history(&self) -> bool {
        matches!(self, Self::Undo | Self::Redo)
    }
}

/// Strategy for generating edits, history steps excluded.
pub fn edit_strategy() -> impl Strategy<Value = EditOperation> {
    prop_oneof![
        3 => name_strategy().prop_map(|name| EditOperation::CreateCustomer { name }),
        4 => (prop::option::weighted(0.9, any::<usize>()), amount_strategy())
            .prop_map(|(customer, amount)| EditOperation::CreateOrder { customer, amount }),
        2 => (any::<usize>(), id_strategy("c"))
            .prop_map(|(customer, id)| EditOperation::RenameCustomer { customer, id }),
        1 => (any::<usize>(), id_strategy("c"))
            .prop_map(|(order, customer_id)| EditOperation::Reassign { order, customer_id }),
        2 => (any::<usize>(), amount_strategy())
            .prop_map(|(order, amount)| EditOperation::SetAmount { order, amount }),
        2 => any::<usize>().prop_map(|customer| EditOperation::DeleteCustomer { customer }),
        1 => any::<usize>().prop_map(|order| EditOperation::DeleteOrder { order }),
    ]
}

/// Strategy for generating edits and history steps.
pub fn operation_strategy() -> impl Strategy<Value = EditOperation> {
    prop_oneof![
        8 => edit_strategy(),
        1 => Just(EditOperation::Undo),
        1 => Just(EditOperation::Redo),
    ]
}

/// Strategy for generating a sequence of edits without history steps.
pub fn edit_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<EditOperation>> {
    prop::collection::vec(edit_strategy(), min_ops..max_ops)
}

/// Strategy for generating a sequence of edits and history steps.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<EditOperation>> {
    prop::collection::vec(operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn ids_come_from_the_pool(id in id_strategy("c")) {
            prop_assert!(id.starts_with('c'));
            let n: u8 = id[1..].parse().unwrap();
            prop_assert!(n < 12);
        }

        #[test]
        fn edits_exclude_history(ops in edit_sequence_strategy(1, 20)) {
            prop_assert!(!ops.is_empty());
            prop_assert!(ops.iter().all(|op| !op.is_history()));
        }
    }
}
