//! Schema labels.
//!
//! A label names a type in the schema. Role types are scoped by the relation
//! type that declares them, e.g. `employment:employee`.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A schema type label, with an optional scope for role types.
///
/// Cloning is O(1).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Label {
    name: Arc<str>,
    scope: Option<Arc<str>>,
}

impl Label {
    /// Creates an unscoped label.
    #[must_use]
    pub fn of(name: &str) -> Self {
        Self {
            name: name.into(),
            scope: None,
        }
    }

    /// Creates a label scoped by `scope`, as used for role types.
    #[must_use]
    pub fn scoped(scope: &str, name: &str) -> Self {
        Self {
            name: name.into(),
            scope: Some(scope.into()),
        }
    }

    /// Returns the unscoped name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Returns true if this label is scoped (a role type).
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({self})")
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{scope}:{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
