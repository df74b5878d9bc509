//! Inspect command implementation.

use relitem_core::{DocumentManager, ForeignKey};
use serde::Serialize;
use std::path::Path;

/// Inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Item counts per type.
    pub types: Vec<TypeCount>,
    /// Total number of stored items.
    pub total: usize,
    /// Declared foreign keys.
    pub foreign_keys: Vec<ForeignKey>,
}

/// Number of items stored under one qualifier.
#[derive(Debug, Serialize)]
pub struct TypeCount {
    /// Type qualifier.
    pub qualifier: String,
    /// Number of items.
    pub items: usize,
    /// Whether the schema declares the type.
    pub registered: bool,
}

/// Collects the inspection result.
pub fn inspect(dm: &DocumentManager, path: &Path) -> InspectResult {
    let registered = dm.registered_types();
    let mut qualifiers = registered.clone();
    for stored in dm.store().qualifiers() {
        if !qualifiers.contains(&stored) {
            qualifiers.push(stored);
        }
    }
    qualifiers.sort();

    let types: Vec<TypeCount> = qualifiers
        .into_iter()
        .map(|qualifier| TypeCount {
            items: dm.items_by_type(&qualifier).len(),
            registered: registered.contains(&qualifier),
            qualifier,
        })
        .collect();

    InspectResult {
        path: path.display().to_string(),
        total: types.iter().map(|t| t.items).sum(),
        types,
        foreign_keys: dm.foreign_keys().to_vec(),
    }
}

/// Runs the inspect command.
pub fn run(
    dm: &DocumentManager,
    path: &Path,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(dm, path);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Store: {}", result.path);
            println!("Items: {}", result.total);
            for count in &result.types {
                let marker = if count.registered { "" } else { " (unregistered)" };
                println!("  {}: {}{}", count.qualifier, count.items, marker);
            }
            if !result.foreign_keys.is_empty() {
                println!("Foreign keys:");
                for fk in &result.foreign_keys {
                    println!(
                        "  {}[{}] -> {}[{}] on update {} on delete {}",
                        fk.source_qualifier,
                        fk.source_field,
                        fk.reference_qualifier,
                        fk.reference_field,
                        fk.on_update,
                        fk.on_delete
                    );
                }
            }
        }
    }

    Ok(())
}
