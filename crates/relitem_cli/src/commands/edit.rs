//! Create, set and delete command implementations.
//!
//! Every edit runs through the document manager, so constraints, cascades
//! and id generation apply exactly as they do for library callers.

use super::{describe, lookup};
use relitem_core::{DocumentManager, Item, Value};

/// Creates an item with a generated id, then applies the field
/// assignments in order. Prints the created item.
pub fn create(
    dm: &DocumentManager,
    qualifier: &str,
    assignments: Vec<(usize, Value)>,
) -> Result<Item, Box<dyn std::error::Error>> {
    let item = dm.transaction(|txn| {
        let mut item = txn.create_new_item(qualifier)?;
        for (index, value) in assignments {
            item = txn.change_field(&item, index, value)?;
        }
        Ok(item)
    })?;
    println!("Created {}", describe(&item));
    Ok(item)
}

/// Changes one field of an item. Prints the new version.
pub fn set(
    dm: &DocumentManager,
    qualified_id: &str,
    index: usize,
    value: Value,
) -> Result<Item, Box<dyn std::error::Error>> {
    let old = lookup(dm, qualified_id)?;
    let new = dm.update_field(&old, index, value)?;
    println!("Changed {}", describe(&new));
    Ok(new)
}

/// Deletes an item and whatever cascades from it.
pub fn delete(dm: &DocumentManager, qualified_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let old = lookup(dm, qualified_id)?;
    let sequence = dm.change_feed().latest_sequence();
    dm.delete(&old)?;
    for event in dm.poll_changes(sequence, usize::MAX) {
        if let Some(deleted) = &event.old {
            println!("Deleted {}", deleted.qualified_id());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open;
    use crate::commands::tests::workspace;

    #[test]
    fn edits_persist_across_opens() {
        let (_dir, store, schema) = workspace();
        {
            let dm = open(&store, &schema).unwrap();
            let customer = create(&dm, "customer", vec![(1, Value::from("Alice"))]).unwrap();
            assert_eq!(customer.id(), "customer1");
            create(
                &dm,
                "order",
                vec![(1, Value::from("customer1")), (2, Value::Integer(5))],
            )
            .unwrap();
            set(&dm, "customer:customer1", 0, Value::from("alice")).unwrap();
        }

        let dm = open(&store, &schema).unwrap();
        assert!(dm.item_by_id("customer", "alice").is_some());
        assert_eq!(dm.item_by_id("order", "order1").unwrap().text(1), "alice");

        delete(&dm, "customer:alice").unwrap();
        assert!(dm.items_by_type("order").is_empty());
    }

    #[test]
    fn rejected_edits_leave_store_alone() {
        let (_dir, store, schema) = workspace();
        let dm = open(&store, &schema).unwrap();

        let result = create(&dm, "order", vec![(1, Value::from("ghost"))]);
        assert!(result.is_err());
        assert!(dm.items_by_type("order").is_empty());

        assert!(delete(&dm, "customer:nobody").is_err());
    }
}
