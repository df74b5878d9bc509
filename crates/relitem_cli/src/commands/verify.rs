//! Verify command implementation.

use super::CliError;
use relitem_core::DocumentManager;
use tracing::warn;

/// Runs the verify command.
pub fn run(dm: &DocumentManager) -> Result<(), Box<dyn std::error::Error>> {
    let registered = dm.registered_types();
    for stored in dm.store().qualifiers() {
        if !registered.contains(&stored) {
            warn!(qualifier = %stored, "stored type is not declared by the schema");
        }
    }

    let violations = dm.verify_integrity();
    if violations.is_empty() {
        println!("✓ Document verification passed");
        return Ok(());
    }

    println!("✗ Document verification failed:");
    for violation in &violations {
        println!("  - {violation}");
    }
    Err(CliError::VerificationFailed(violations.len()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open;
    use crate::commands::tests::workspace;
    use relitem_storage::{FileStore, Item, ItemChange, ItemStore, Value};

    #[test]
    fn consistent_store_passes() {
        let (_dir, store, schema) = workspace();
        let dm = open(&store, &schema).unwrap();
        dm.create_new("customer").unwrap();
        run(&dm).unwrap();
    }

    #[test]
    fn dangling_reference_fails() {
        let (_dir, store, schema) = workspace();
        {
            let raw = FileStore::open(&store).unwrap();
            let order = Item::generic(
                "order",
                ["Id", "CustomerId", "Amount"],
                [Value::from("o1"), Value::from("ghost"), Value::Integer(1)],
            );
            raw.commit(&ItemChange::create(order)).unwrap();
        }

        let dm = open(&store, &schema).unwrap();
        let err = run(&dm).unwrap_err();
        assert_eq!(err.to_string(), "verification failed with 1 violation(s)");
    }
}
