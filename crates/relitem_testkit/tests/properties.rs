//! Property tests over generated edit sequences.

use proptest::prelude::*;
use relitem_core::OnChangePolicy;
use relitem_testkit::prelude::*;
use std::sync::Arc;

fn policy_strategy() -> impl Strategy<Value = OnChangePolicy> {
    prop_oneof![
        Just(OnChangePolicy::NoAction),
        Just(OnChangePolicy::Cascade),
        Just(OnChangePolicy::CascadeAnySection),
    ]
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    /// Every committed state keeps references resolvable and ids unique.
    #[test]
    fn committed_state_stays_consistent(
        policy in policy_strategy(),
        ops in operation_sequence_strategy(1, 40),
    ) {
        let mut harness = EditHarness::new(policy);
        for op in &ops {
            let _ = harness.apply(op);
            harness.assert_consistent();
        }
    }

    /// A refused edit leaves the committed state untouched.
    #[test]
    fn refused_edits_change_nothing(
        policy in policy_strategy(),
        ops in operation_sequence_strategy(1, 40),
    ) {
        let mut harness = EditHarness::new(policy);
        for op in &ops {
            let before = harness.snapshot();
            let undoable = harness.document.can_undo();
            if harness.apply(op).is_err() {
                prop_assert_eq!(harness.snapshot(), before);
                prop_assert_eq!(harness.document.can_undo(), undoable);
            }
        }
    }

    /// Undoing every step walks back through each committed state, and
    /// redoing every step walks forward again.
    #[test]
    fn undo_redo_round_trip(
        policy in policy_strategy(),
        ops in edit_sequence_strategy(1, 30),
    ) {
        let mut harness = EditHarness::new(policy);
        let mut states = vec![harness.snapshot()];
        for op in &ops {
            if let Ok(changes) = harness.apply(op) {
                if changes > 0 {
                    states.push(harness.snapshot());
                }
            }
        }

        for expected in states.iter().rev().skip(1) {
            prop_assert!(harness.document.undo().unwrap());
            prop_assert_eq!(&harness.snapshot(), expected);
        }
        prop_assert!(!harness.document.can_undo());

        for expected in states.iter().skip(1) {
            prop_assert!(harness.document.redo().unwrap());
            prop_assert_eq!(&harness.snapshot(), expected);
        }
        prop_assert!(!harness.document.can_redo());
    }

    /// A commit that fails halfway leaves the store as it was.
    #[test]
    fn failed_commit_is_atomic(
        customers in 1usize..5,
        orders in 0usize..4,
        fail_after in 0usize..6,
    ) {
        let store = Arc::new(FaultyStore::new());
        let document = TestDocument::over(store.clone(), OnChangePolicy::Cascade);
        document
            .transaction(|txn| {
                for c in 0..customers {
                    let id = format!("c{c}");
                    txn.change_item(Some(customer(&id, "x")), None, "customer")?;
                    for o in 0..orders {
                        let order_id = format!("o{c}_{o}");
                        txn.change_item(Some(order(&order_id, &id, 1)), None, "order")?;
                    }
                }
                Ok(())
            })
            .unwrap();
        let before = document.snapshot();
        let total = customers * (orders + 1);

        store.fail_commit_after(fail_after);
        let result = document.delete(&customer("c0", "x"));

        if fail_after < orders + 1 {
            prop_assert!(result.unwrap_err().is_storage_failure());
            prop_assert_eq!(document.snapshot(), before);
            prop_assert_eq!(store.failure_count(), 1);
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(document.snapshot().len(), total - orders - 1);
        }
        prop_assert!(document.verify_integrity().is_empty());
    }

    /// Generated ids never collide with committed ones.
    #[test]
    fn generated_ids_are_unique(count in 1usize..150) {
        let document = TestDocument::memory(OnChangePolicy::Cascade);
        for _ in 0..count {
            document.create_new("customer").unwrap();
        }
        prop_assert_eq!(document.items_by_type("customer").len(), count);
    }
}

#[test]
fn refused_prepare_rejects_edit() {
    let store = Arc::new(FaultyStore::new());
    let mut harness = EditHarness::over(store.clone(), OnChangePolicy::Cascade);

    store.set_refuse_prepare(true);
    let result = harness.apply(&EditOperation::CreateCustomer {
        name: "Alice".into(),
    });

    assert!(result.is_err());
    assert!(!result.unwrap_err().is_storage_failure());
    assert!(harness.snapshot().is_empty());

    store.reset();
    harness
        .apply(&EditOperation::CreateCustomer {
            name: "Alice".into(),
        })
        .unwrap();
    assert_eq!(harness.snapshot().len(), 1);
}

#[test]
fn populated_shop_survives_mass_cascade() {
    let document = scenarios::populated_shop(20, 5, OnChangePolicy::Cascade);
    for c in 1..=20 {
        let customer = document.item_by_id("customer", &format!("c{c}")).unwrap();
        document.delete(&customer).unwrap();
    }
    assert!(document.snapshot().is_empty());

    while document.undo().unwrap() {}
    assert_eq!(document.snapshot().len(), 120);
    assert!(document.verify_integrity().is_empty());
}
