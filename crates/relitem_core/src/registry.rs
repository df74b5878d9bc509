//! Per-type setters and creators.

use crate::transaction::Transaction;
use relitem_storage::{Item, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Changes one field of an item.
///
/// Receives a private copy of the item, the field index, the new value and
/// the transaction the change is staged in. Returning `Err` rejects the
/// edit with the given reason. A setter may rename the item but never
/// changes its qualifier.
pub type Setter =
    Arc<dyn Fn(&mut Item, usize, &Value, &Transaction<'_>) -> Result<(), String> + Send + Sync>;

/// Builds a brand-new item carrying a generated id.
pub type Creator = Arc<dyn Fn(&Transaction<'_>, &str) -> Result<Item, String> + Send + Sync>;

#[derive(Clone)]
struct ItemType {
    setter: Setter,
    creator: Creator,
}

/// Maps type qualifiers to their setter and creator.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, ItemType>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type; a later registration of the same qualifier wins.
    pub fn register(&mut self, qualifier: impl Into<String>, setter: Setter, creator: Creator) {
        self.types
            .insert(qualifier.into(), ItemType { setter, creator });
    }

    /// Returns the setter of a type.
    #[must_use]
    pub fn setter(&self, qualifier: &str) -> Option<&Setter> {
        self.types.get(qualifier).map(|t| &t.setter)
    }

    /// Returns the creator of a type.
    #[must_use]
    pub fn creator(&self, qualifier: &str) -> Option<&Creator> {
        self.types.get(qualifier).map(|t| &t.creator)
    }

    /// Returns true if the type is registered.
    #[must_use]
    pub fn contains(&self, qualifier: &str) -> bool {
        self.types.contains_key(qualifier)
    }

    /// Returns the registered qualifiers, sorted.
    #[must_use]
    pub fn qualifiers(&self) -> Vec<String> {
        let mut qualifiers: Vec<String> = self.types.keys().cloned().collect();
        qualifiers.sort();
        qualifiers
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.qualifiers())
            .finish()
    }
}

/// A ready-made type for generic items: a fixed list of headers, the id
/// held as text in field 0.
///
/// Setting field 0 renames the item.
///
/// # Example
///
/// ```rust
/// use relitem_core::{DocumentManager, GenericType};
///
/// let mut dm = DocumentManager::in_memory();
/// dm.register_generic_type(GenericType::new("customer", ["Id", "Name"]));
///
/// let customer = dm.create_new("customer").unwrap();
/// assert_eq!(customer.id(), "customer1");
/// assert_eq!(customer.header(1), Some("Name"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericType {
    qualifier: String,
    headers: Vec<String>,
}

impl GenericType {
    /// Creates a generic type.
    pub fn new<H>(qualifier: impl Into<String>, headers: H) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
    {
        Self {
            qualifier: qualifier.into(),
            headers: headers.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the type qualifier.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Returns the field headers.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the index of a header.
    #[must_use]
    pub fn field_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Builds the setter.
    #[must_use]
    pub fn setter(&self) -> Setter {
        let qualifier = self.qualifier.clone();
        let field_count = self.headers.len();
        Arc::new(move |item: &mut Item, index: usize, value: &Value, _txn: &Transaction<'_>| {
            if index >= field_count {
                return Err(format!("{qualifier} has no field {index}"));
            }
            if index == 0 {
                let id = value.as_text();
                if id.is_empty() {
                    return Err("Id cannot be empty.".to_owned());
                }
                item.set_id(id.into_owned());
            }
            item.set_value(index, value.clone());
            Ok(())
        })
    }

    /// Builds the creator.
    #[must_use]
    pub fn creator(&self) -> Creator {
        let qualifier = self.qualifier.clone();
        let headers = self.headers.clone();
        Arc::new(move |_txn: &Transaction<'_>, id: &str| -> Result<Item, String> {
            Ok(Item::generic(
                qualifier.clone(),
                headers.iter().cloned(),
                [Value::from(id)],
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DocumentManager;

    #[test]
    fn last_registration_wins() {
        let mut registry = TypeRegistry::new();
        let first = GenericType::new("customer", ["Id"]);
        let second = GenericType::new("customer", ["Id", "Name"]);
        registry.register("customer", first.setter(), first.creator());
        registry.register("customer", second.setter(), second.creator());

        let dm = DocumentManager::in_memory();
        let txn = dm.begin();
        let creator = registry.creator("customer").unwrap();
        let item = creator(&txn, "c1").unwrap();

        assert_eq!(item.field_count(), 2);
        assert_eq!(registry.qualifiers(), vec!["customer".to_owned()]);
        assert!(registry.setter("order").is_none());
    }

    #[test]
    fn generic_setter_renames_on_field_zero() {
        let ty = GenericType::new("customer", ["Id", "Name"]);
        let dm = DocumentManager::in_memory();
        let txn = dm.begin();
        let mut item = ty.creator()(&txn, "c1").unwrap();

        ty.setter()(&mut item, 1, &Value::from("Alice"), &txn).unwrap();
        ty.setter()(&mut item, 0, &Value::from("c2"), &txn).unwrap();

        assert_eq!(item.id(), "c2");
        assert_eq!(item.text(0), "c2");
        assert_eq!(item.text(1), "Alice");
    }

    #[test]
    fn generic_setter_rejects_bad_input() {
        let ty = GenericType::new("customer", ["Id", "Name"]);
        let dm = DocumentManager::in_memory();
        let txn = dm.begin();
        let mut item = ty.creator()(&txn, "c1").unwrap();

        assert_eq!(
            ty.setter()(&mut item, 0, &Value::Null, &txn),
            Err("Id cannot be empty.".to_owned())
        );
        assert!(ty.setter()(&mut item, 5, &Value::from("x"), &txn).is_err());
        assert_eq!(item.id(), "c1");
        assert_eq!(ty.field_index("Name"), Some(1));
    }
}
