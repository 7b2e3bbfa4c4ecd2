//! Typed pattern variables.

use std::collections::BTreeSet;

use deduce_foundation::{Label, ValueType};

use super::reference::Reference;

/// Whether a variable ranges over instances or over types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableKind {
    /// Ranges over entities, relations and attributes.
    Thing,
    /// Ranges over schema types (including role types).
    Type,
}

/// A variable of a pattern together with what is known about its types.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    /// How the pattern refers to this variable.
    pub reference: Reference,
    /// Thing or type variable.
    pub kind: VariableKind,
    /// Declared value type (type variables of attribute types).
    pub value_type: Option<ValueType>,
    /// Concrete types this variable may take. Empty means unconstrained.
    pub hints: BTreeSet<Label>,
}

impl Variable {
    /// Creates a thing variable.
    #[must_use]
    pub fn thing(reference: Reference) -> Self {
        Self {
            reference,
            kind: VariableKind::Thing,
            value_type: None,
            hints: BTreeSet::new(),
        }
    }

    /// Creates a type variable.
    #[must_use]
    pub fn type_variable(reference: Reference) -> Self {
        Self {
            reference,
            kind: VariableKind::Type,
            value_type: None,
            hints: BTreeSet::new(),
        }
    }

    /// Returns true for thing variables.
    #[must_use]
    pub fn is_thing(&self) -> bool {
        self.kind == VariableKind::Thing
    }

    /// Returns the label of a label-fixed type variable.
    #[must_use]
    pub fn label(&self) -> Option<&Label> {
        self.reference.as_label()
    }

    /// Returns true if the hints allow `label`.
    #[must_use]
    pub fn admits(&self, label: &Label) -> bool {
        self.hints.is_empty() || self.hints.contains(label)
    }

    /// Returns true if the two variables can take a common type.
    #[must_use]
    pub fn hints_intersect(&self, other: &Self) -> bool {
        hints_intersect(&self.hints, &other.hints)
    }
}

/// Returns true if two hint sets share a type. An empty set is unconstrained.
#[must_use]
pub fn hints_intersect(a: &BTreeSet<Label>, b: &BTreeSet<Label>) -> bool {
    a.is_empty() || b.is_empty() || !a.is_disjoint(b)
}
