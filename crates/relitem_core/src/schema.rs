//! Declarative schema of generic item types and foreign keys.
//!
//! ```json
//! {
//!   "types": [
//!     { "qualifier": "customer", "headers": ["Id", "Name"] },
//!     { "qualifier": "order", "headers": ["Id", "CustomerId", "Amount"] }
//!   ],
//!   "foreign_keys": [
//!     { "source_qualifier": "order", "source_field": 1,
//!       "reference_qualifier": "customer", "on_delete": "cascade" }
//!   ]
//! }
//! ```

use crate::constraint::ForeignKey;
use crate::error::{DocError, DocResult};
use crate::manager::DocumentManager;
use crate::registry::GenericType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One generic item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// Type qualifier.
    pub qualifier: String,
    /// Field headers; field 0 holds the id.
    pub headers: Vec<String>,
}

/// Item types and foreign keys to register on a document manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Generic item types.
    #[serde(default)]
    pub types: Vec<TypeSchema>,
    /// Foreign keys between them.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Parses and validates a JSON schema.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the text is not a valid schema.
    pub fn from_json(json: &str) -> DocResult<Self> {
        let schema: Self =
            serde_json::from_str(json).map_err(|e| DocError::schema(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reads and validates a JSON schema file.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the file cannot be read or is not a valid schema.
    pub fn load(path: impl AsRef<Path>) -> DocResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| DocError::schema(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Serializes the schema as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if serialization fails.
    pub fn to_json(&self) -> DocResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DocError::schema(e.to_string()))
    }

    /// Returns a type by qualifier.
    #[must_use]
    pub fn type_schema(&self, qualifier: &str) -> Option<&TypeSchema> {
        self.types.iter().find(|t| t.qualifier == qualifier)
    }

    /// Checks that qualifiers are unique and non-empty, every type has an
    /// id header, and foreign keys connect declared types through existing
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns `Schema` naming the first problem found.
    pub fn validate(&self) -> DocResult<()> {
        let mut seen = HashSet::new();
        for ty in &self.types {
            if ty.qualifier.is_empty() {
                return Err(DocError::schema("type with empty qualifier"));
            }
            if ty.headers.is_empty() {
                return Err(DocError::schema(format!(
                    "type {} has no headers",
                    ty.qualifier
                )));
            }
            if !seen.insert(ty.qualifier.as_str()) {
                return Err(DocError::schema(format!(
                    "type {} declared twice",
                    ty.qualifier
                )));
            }
        }
        for fk in &self.foreign_keys {
            self.check_field(&fk.source_qualifier, fk.source_field)?;
            self.check_field(&fk.reference_qualifier, fk.reference_field)?;
        }
        Ok(())
    }

    /// Registers every type as a [`GenericType`] and adds the foreign keys.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the schema is invalid; nothing is registered then.
    pub fn apply(&self, dm: &mut DocumentManager) -> DocResult<()> {
        self.validate()?;
        for ty in &self.types {
            dm.register_generic_type(GenericType::new(
                ty.qualifier.as_str(),
                ty.headers.iter().cloned(),
            ));
        }
        for fk in &self.foreign_keys {
            dm.add_foreign_key(fk.clone());
        }
        Ok(())
    }

    fn check_field(&self, qualifier: &str, field: usize) -> DocResult<()> {
        let ty = self.type_schema(qualifier).ok_or_else(|| {
            DocError::schema(format!("foreign key on undeclared type {qualifier}"))
        })?;
        if field >= ty.headers.len() {
            return Err(DocError::schema(format!(
                "type {qualifier} has no field {field}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::OnChangePolicy;
    use tempfile::TempDir;

    const SHOP: &str = r#"{
        "types": [
            { "qualifier": "customer", "headers": ["Id", "Name"] },
            { "qualifier": "order", "headers": ["Id", "CustomerId", "Amount"] }
        ],
        "foreign_keys": [
            { "source_qualifier": "order", "source_field": 1,
              "reference_qualifier": "customer", "on_delete": "cascade" }
        ]
    }"#;

    #[test]
    fn parse_and_apply() {
        let schema = Schema::from_json(SHOP).unwrap();
        assert_eq!(schema.foreign_keys[0].on_delete, OnChangePolicy::Cascade);
        assert_eq!(schema.foreign_keys[0].on_update, OnChangePolicy::NoAction);

        let mut dm = DocumentManager::in_memory();
        schema.apply(&mut dm).unwrap();

        assert_eq!(dm.registered_types(), vec!["customer", "order"]);
        assert_eq!(dm.foreign_keys().len(), 1);
        let order = dm.create_new("order").unwrap();
        assert_eq!(order.header(2), Some("Amount"));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, SHOP).unwrap();

        let schema = Schema::load(&path).unwrap();
        assert_eq!(schema.types.len(), 2);
        assert_eq!(Schema::from_json(&schema.to_json().unwrap()).unwrap(), schema);
    }

    #[test]
    fn rejects_bad_schemas() {
        let duplicate = r#"{"types":[{"qualifier":"a","headers":["Id"]},{"qualifier":"a","headers":["Id"]}]}"#;
        assert!(matches!(
            Schema::from_json(duplicate),
            Err(DocError::Schema { .. })
        ));

        let undeclared = r#"{"types":[{"qualifier":"a","headers":["Id","B"]}],
            "foreign_keys":[{"source_qualifier":"a","source_field":1,"reference_qualifier":"b"}]}"#;
        let err = Schema::from_json(undeclared).unwrap_err();
        assert!(err.to_string().contains("undeclared type b"));

        let out_of_range = r#"{"types":[{"qualifier":"a","headers":["Id"]}],
            "foreign_keys":[{"source_qualifier":"a","source_field":3,"reference_qualifier":"a"}]}"#;
        assert!(Schema::from_json(out_of_range).is_err());

        assert!(Schema::from_json("not json").is_err());
        assert!(Schema::load("/nonexistent/schema.json").is_err());
    }
}
