//! Consistency report over committed items.

use relitem_storage::QualifiedId;
use serde::Serialize;
use std::fmt;

/// A committed state that breaks a document invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityViolation {
    /// An item is stored with an empty id.
    EmptyId {
        /// Type of the item.
        qualifier: String,
    },
    /// An item is stored under another type's qualifier.
    QualifierMismatch {
        /// Qualifier the store files the item under.
        stored_as: String,
        /// The item's own identity.
        item: QualifiedId,
    },
    /// A foreign-key field names an item that does not exist.
    DanglingReference {
        /// Item holding the reference.
        item: QualifiedId,
        /// Field holding the reference.
        field: usize,
        /// The unresolvable target.
        reference: QualifiedId,
    },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId { qualifier } => write!(f, "{qualifier} item with empty id"),
            Self::QualifierMismatch { stored_as, item } => {
                write!(f, "{item} stored as {stored_as}")
            }
            Self::DanglingReference {
                item,
                field,
                reference,
            } => write!(f, "{item} field {field} references missing {reference}"),
        }
    }
}
