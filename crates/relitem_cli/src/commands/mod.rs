//! CLI command implementations.

pub mod edit;
pub mod get;
pub mod inspect;
pub mod verify;

use relitem_core::{DocumentManager, Item, Schema, Value};
use relitem_storage::FileStore;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors of the command-line layer.
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--set` argument is not `INDEX=VALUE`.
    #[error("invalid assignment {0:?}, expected INDEX=VALUE")]
    InvalidAssignment(String),

    /// The item does not exist.
    #[error("no item {0}")]
    NotFound(String),

    /// The store breaks referential integrity.
    #[error("verification failed with {0} violation(s)")]
    VerificationFailed(usize),
}

/// Opens the store and registers the schema's types and foreign keys.
pub fn open(store: &Path, schema: &Path) -> Result<DocumentManager, Box<dyn std::error::Error>> {
    let schema = Schema::load(schema)?;
    let store = FileStore::open(store)?;
    debug!(path = %store.path().display(), items = store.len(), "store opened");
    let mut dm = DocumentManager::new(Arc::new(store));
    schema.apply(&mut dm)?;
    Ok(dm)
}

/// Parses a command-line value: `null`, `true`, `false`, an integer, or
/// text.
pub fn parse_value(raw: &str) -> Value {
    match raw {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map_or_else(|_| Value::from(raw), Value::Integer),
    }
}

/// Parses an `INDEX=VALUE` assignment.
pub fn parse_assignment(raw: &str) -> Result<(usize, Value), CliError> {
    let (index, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::InvalidAssignment(raw.to_owned()))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| CliError::InvalidAssignment(raw.to_owned()))?;
    Ok((index, parse_value(value)))
}

/// Resolves a `qualifier:id` argument.
pub fn lookup(dm: &DocumentManager, qualified_id: &str) -> Result<Item, CliError> {
    dm.item_by_qualified_id(qualified_id)
        .ok_or_else(|| CliError::NotFound(qualified_id.to_owned()))
}

/// Renders an item as one line of `header=value` pairs.
pub fn describe(item: &Item) -> String {
    let fields: Vec<String> = item
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let header = if field.header.is_empty() {
                i.to_string()
            } else {
                field.header.clone()
            };
            format!("{header}={}", field.value.as_text())
        })
        .collect();
    format!("{} {}", item.qualified_id(), fields.join(" "))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) const SHOP: &str = r#"{
        "types": [
            { "qualifier": "customer", "headers": ["Id", "Name"] },
            { "qualifier": "order", "headers": ["Id", "CustomerId", "Amount"] }
        ],
        "foreign_keys": [
            { "source_qualifier": "order", "source_field": 1,
              "reference_qualifier": "customer",
              "on_update": "cascade", "on_delete": "cascade" }
        ]
    }"#;

    /// A temporary directory holding the shop schema; the store file is
    /// created on first open.
    pub(crate) fn workspace() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("schema.json");
        fs::write(&schema, SHOP).unwrap();
        let store = dir.path().join("store.json");
        (dir, store, schema)
    }

    #[test]
    fn values_are_typed() {
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("-42"), Value::Integer(-42));
        assert_eq!(parse_value("Alice"), Value::from("Alice"));
    }

    #[test]
    fn assignments() {
        assert_eq!(
            parse_assignment("1=customer1").unwrap(),
            (1, Value::from("customer1"))
        );
        assert_eq!(parse_assignment("2=").unwrap(), (2, Value::from("")));
        assert!(parse_assignment("name").is_err());
        assert!(parse_assignment("x=1").is_err());
    }

    #[test]
    fn open_registers_schema() {
        let (_dir, store, schema) = workspace();
        let dm = open(&store, &schema).unwrap();
        assert_eq!(dm.registered_types(), vec!["customer", "order"]);
        assert!(matches!(
            lookup(&dm, "customer:c1"),
            Err(CliError::NotFound(_))
        ));
    }

    #[test]
    fn describe_lists_fields() {
        let item = Item::generic(
            "customer",
            ["Id", "Name"],
            [Value::from("c1"), Value::from("Alice")],
        );
        assert_eq!(describe(&item), "customer:c1 Id=c1 Name=Alice");
    }
}
