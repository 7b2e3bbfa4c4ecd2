//! Concept handles.
//!
//! Concepts are owned by the storage collaborator and are only meaningful
//! inside the transaction that produced them.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::label::Label;
use crate::value::Value;

/// Identifier of a thing (entity, relation or attribute instance).
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThingId(pub u64);

impl fmt::Debug for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThingId({})", self.0)
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A concept an answer can bind a variable to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Concept {
    /// A data instance. Attributes carry their value.
    Thing {
        /// Instance identifier.
        id: ThingId,
        /// Most specific type of the instance.
        type_label: Label,
        /// Attribute value, `None` for entities and relations.
        value: Option<Value>,
    },
    /// A schema type.
    Type(Label),
}

impl Concept {
    /// Returns the thing identifier, if this is a thing.
    #[must_use]
    pub fn thing_id(&self) -> Option<ThingId> {
        match self {
            Self::Thing { id, .. } => Some(*id),
            Self::Type(_) => None,
        }
    }

    /// Returns the type of a thing, or the type itself.
    #[must_use]
    pub fn type_label(&self) -> &Label {
        match self {
            Self::Thing { type_label, .. } | Self::Type(type_label) => type_label,
        }
    }

    /// Returns the attribute value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Thing { value, .. } => value.as_ref(),
            Self::Type(_) => None,
        }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thing {
                id,
                type_label,
                value: Some(value),
            } => write!(f, "{type_label}{id}={value}"),
            Self::Thing { id, type_label, .. } => write!(f, "{type_label}{id}"),
            Self::Type(label) => write!(f, "type {label}"),
        }
    }
}
