//! Foreign key declarations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to dependents when the referenced item changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnChangePolicy {
    /// Reject the change while dependents exist.
    #[default]
    NoAction,
    /// Reserved; currently behaves as [`OnChangePolicy::NoAction`].
    SetNull,
    /// Follow a change of the referenced field: rewrite dependents on
    /// rename, delete them on delete.
    Cascade,
    /// Like `Cascade`, but rewrite dependents on any update of the
    /// referenced item, even when the referenced field is unchanged.
    CascadeAnySection,
}

impl OnChangePolicy {
    /// Returns true if dependents must block the change.
    #[must_use]
    pub fn blocks(self) -> bool {
        matches!(self, Self::NoAction | Self::SetNull)
    }

    /// Returns true if the change propagates to dependents.
    #[must_use]
    pub fn cascades(self) -> bool {
        matches!(self, Self::Cascade | Self::CascadeAnySection)
    }
}

impl fmt::Display for OnChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoAction => "no_action",
            Self::SetNull => "set_null",
            Self::Cascade => "cascade",
            Self::CascadeAnySection => "cascade_any_section",
        })
    }
}

/// Declares that field `source_field` of `source_qualifier` items holds the
/// id of a `reference_qualifier` item.
///
/// `reference_field` is the field of the referenced item whose value the
/// source field mirrors; for generic items this is field 0, the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Type holding the reference.
    pub source_qualifier: String,
    /// Field holding the referenced id.
    pub source_field: usize,
    /// Referenced type.
    pub reference_qualifier: String,
    /// Referenced field, usually the id field.
    #[serde(default)]
    pub reference_field: usize,
    /// Policy applied when the referenced item is updated.
    #[serde(default)]
    pub on_update: OnChangePolicy,
    /// Policy applied when the referenced item is deleted.
    #[serde(default)]
    pub on_delete: OnChangePolicy,
}

impl ForeignKey {
    /// Creates a foreign key with `NoAction` policies.
    pub fn new(
        source_qualifier: impl Into<String>,
        source_field: usize,
        reference_qualifier: impl Into<String>,
        reference_field: usize,
    ) -> Self {
        Self {
            source_qualifier: source_qualifier.into(),
            source_field,
            reference_qualifier: reference_qualifier.into(),
            reference_field,
            on_update: OnChangePolicy::NoAction,
            on_delete: OnChangePolicy::NoAction,
        }
    }

    /// Sets the update policy.
    #[must_use]
    pub fn on_update(mut self, policy: OnChangePolicy) -> Self {
        self.on_update = policy;
        self
    }

    /// Sets the delete policy.
    #[must_use]
    pub fn on_delete(mut self, policy: OnChangePolicy) -> Self {
        self.on_delete = policy;
        self
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] -> {}[{}] (update: {}, delete: {})",
            self.source_qualifier,
            self.source_field,
            self.reference_qualifier,
            self.reference_field,
            self.on_update,
            self.on_delete
        )
    }
}
