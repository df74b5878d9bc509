//! Error types for relitem core.

use relitem_storage::StorageError;
use std::fmt;
use thiserror::Error;

/// Result type for document operations.
pub type DocResult<T> = Result<T, DocError>;

/// The per-type capability that was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Field setter.
    Setter,
    /// Item creator.
    Creator,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Setter => "setter",
            Capability::Creator => "creator",
        })
    }
}

/// Errors that can occur in document operations.
///
/// Every variant except [`DocError::Storage`] is a validation failure: it is
/// detected before anything reaches the store, and the store is unchanged.
#[derive(Debug, Error)]
pub enum DocError {
    /// The item type has no setter or creator registered.
    #[error("no {capability} registered for item type {qualifier}")]
    UnregisteredType {
        /// The unregistered qualifier.
        qualifier: String,
        /// What was looked up.
        capability: Capability,
    },

    /// Empty id, qualifier mismatch or id collision.
    #[error("{message}")]
    IdConstraint {
        /// Human-readable reason.
        message: String,
    },

    /// A `NoAction` foreign key still has dependents.
    #[error("{message}")]
    ReferentialIntegrity {
        /// Human-readable reason.
        message: String,
        /// Number of dependent items.
        dependents: usize,
        /// Type of the dependent items.
        source_qualifier: String,
    },

    /// A foreign-key field names an item that does not exist.
    #[error("{message}")]
    MissingReference {
        /// Human-readable reason.
        message: String,
        /// Type the field refers to.
        reference_qualifier: String,
        /// The unresolvable id.
        reference_id: String,
    },

    /// A trigger refused the change; the reason is the trigger's own.
    #[error("{reason}")]
    TriggerVetoed {
        /// Reason given by the trigger.
        reason: String,
    },

    /// A setter, creator or post-creation modifier refused.
    #[error("{reason}")]
    Rejected {
        /// Reason given by the callback.
        reason: String,
    },

    /// The store's dry run refused the change.
    #[error("store rejected change: {0}")]
    Prepare(#[source] StorageError),

    /// The store failed to apply an already validated change.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// A schema could not be read or applied.
    #[error("invalid schema: {message}")]
    Schema {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl DocError {
    /// Creates an unregistered-type error.
    pub fn unregistered(qualifier: impl Into<String>, capability: Capability) -> Self {
        Self::UnregisteredType {
            qualifier: qualifier.into(),
            capability,
        }
    }

    /// Creates an id constraint error.
    pub fn id_constraint(message: impl Into<String>) -> Self {
        Self::IdConstraint {
            message: message.into(),
        }
    }

    /// Creates a trigger veto error.
    pub fn vetoed(reason: impl Into<String>) -> Self {
        Self::TriggerVetoed {
            reason: reason.into(),
        }
    }

    /// Creates a rejected error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for foreign-key violations.
    #[must_use]
    pub fn is_referential(&self) -> bool {
        matches!(
            self,
            Self::ReferentialIntegrity { .. } | Self::MissingReference { .. }
        )
    }

    /// Returns true for technical failures of the store.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_message() {
        let err = DocError::unregistered("widget", Capability::Creator);
        assert_eq!(err.to_string(), "no creator registered for item type widget");
    }

    #[test]
    fn veto_reason_is_verbatim() {
        assert_eq!(DocError::vetoed("amount must be positive").to_string(), "amount must be positive");
    }

    #[test]
    fn classification() {
        let err = DocError::ReferentialIntegrity {
            message: String::new(),
            dependents: 1,
            source_qualifier: "order".into(),
        };
        assert!(err.is_referential());
        assert!(!err.is_storage_failure());
        assert!(DocError::from(StorageError::rejected("x")).is_storage_failure());
    }
}
