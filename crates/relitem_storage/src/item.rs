//! Item records.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A single field value.
///
/// Foreign keys compare values through [`Value::as_text`], so `Null` and an
/// empty text both mean "no reference".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// UTF-8 text.
    Text(String),
}

impl Value {
    /// Renders the value as text.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(b) => Cow::Owned(b.to_string()),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A labelled field of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Header label.
    pub header: String,
    /// Field value.
    pub value: Value,
}

impl Field {
    /// Creates a field.
    pub fn new(header: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            header: header.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ItemData {
    qualifier: String,
    id: String,
    #[serde(default)]
    fields: Vec<Field>,
}

/// An identity-addressed record.
///
/// `Item` is a reference-counted handle: cloning is cheap and clones share
/// storage. Mutators are copy-on-write, so changing one handle never
/// affects another, and an item handed out by a store stays a valid
/// historical value after the record changes or is deleted.
///
/// Identity is `(qualifier, id)`; see [`Item::same_record`]. Equality
/// (`==`) compares full contents.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Arc<ItemData>);

impl Item {
    /// Creates an item without fields.
    pub fn new(qualifier: impl Into<String>, id: impl Into<String>) -> Self {
        Self::with_fields(qualifier, id, Vec::new())
    }

    /// Creates an item with the given fields.
    pub fn with_fields(
        qualifier: impl Into<String>,
        id: impl Into<String>,
        fields: Vec<Field>,
    ) -> Self {
        Self(Arc::new(ItemData {
            qualifier: qualifier.into(),
            id: id.into(),
            fields,
        }))
    }

    /// Creates a generic item whose id is the text of its first value.
    ///
    /// Headers and values are paired by position; the shorter list is
    /// padded (empty header, `Null` value).
    pub fn generic<H, V>(qualifier: impl Into<String>, headers: H, values: V) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        V: IntoIterator<Item = Value>,
    {
        let mut headers = headers.into_iter().map(Into::into);
        let mut values = values.into_iter();
        let mut fields = Vec::new();
        loop {
            match (headers.next(), values.next()) {
                (None, None) => break,
                (header, value) => fields.push(Field {
                    header: header.unwrap_or_default(),
                    value: value.unwrap_or_default(),
                }),
            }
        }
        let id = fields
            .first()
            .map(|f| f.value.as_text().into_owned())
            .unwrap_or_default();
        Self::with_fields(qualifier, id, fields)
    }

    /// Appends a field (builder style).
    #[must_use]
    pub fn with_field(mut self, header: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.0)
            .fields
            .push(Field::new(header, value));
        self
    }

    /// Returns the type qualifier.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        &self.0.qualifier
    }

    /// Returns the id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Returns the fully qualified id (`qualifier:id`).
    #[must_use]
    pub fn qualified_id(&self) -> QualifiedId {
        QualifiedId::new(self.qualifier(), self.id())
    }

    /// Returns all fields in order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.0.fields
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.0.fields.len()
    }

    /// Returns the field at `index`.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.0.fields.get(index)
    }

    /// Returns the value at `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.field(index).map(|f| &f.value)
    }

    /// Returns the value at `index` as text, empty when absent.
    #[must_use]
    pub fn text(&self, index: usize) -> Cow<'_, str> {
        self.value(index).map_or(Cow::Borrowed(""), Value::as_text)
    }

    /// Returns the header label at `index`.
    #[must_use]
    pub fn header(&self, index: usize) -> Option<&str> {
        self.field(index).map(|f| f.header.as_str())
    }

    /// Iterates over header labels.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.0.fields.iter().map(|f| f.header.as_str())
    }

    /// Changes the id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        Arc::make_mut(&mut self.0).id = id.into();
    }

    /// Changes the value at `index`, growing the field list with `Null`
    /// values if needed.
    pub fn set_value(&mut self, index: usize, value: impl Into<Value>) {
        let data = Arc::make_mut(&mut self.0);
        if data.fields.len() <= index {
            data.fields.resize_with(index + 1, || Field::new("", Value::Null));
        }
        data.fields[index].value = value.into();
    }

    /// Returns true if both items denote the same record.
    #[must_use]
    pub fn same_record(&self, other: &Item) -> bool {
        self.qualifier() == other.qualifier() && self.id() == other.id()
    }

    /// Returns true if both handles share storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Item) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("qualifier", &self.0.qualifier)
            .field("id", &self.0.id)
            .field("fields", &self.0.fields)
            .finish()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.qualifier(), self.id())
    }
}

/// A fully qualified id, `qualifier:id`.
///
/// Parsing splits on the first colon; without a colon the whole string is
/// the id and the qualifier is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedId {
    /// Type qualifier.
    pub qualifier: String,
    /// Id within the qualifier.
    pub id: String,
}

impl QualifiedId {
    /// Creates a qualified id.
    pub fn new(qualifier: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            id: id.into(),
        }
    }

    /// Parses `qualifier:id`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((qualifier, id)) => Self::new(qualifier, id),
            None => Self::new("", s),
        }
    }
}

impl FromStr for QualifiedId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.qualifier, self.id)
    }
}

impl Serialize for QualifiedId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
