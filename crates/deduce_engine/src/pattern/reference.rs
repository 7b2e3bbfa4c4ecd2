//! Variable references.

use std::fmt;
use std::sync::Arc;

use deduce_foundation::Label;

/// How a pattern refers to one of its variables.
///
/// Only [`Reference::Name`] is bindable: answers carry concepts for named
/// references and nothing else.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reference {
    /// A named variable, e.g. `$x`.
    Name(Arc<str>),
    /// An anonymous variable, e.g. `$_`. The number keeps distinct
    /// anonymous variables apart within one pattern.
    Anonymous(u32),
    /// A type variable fixed to a schema label.
    Label(Label),
    /// A placeholder introduced while generalizing a rule head.
    System(Arc<str>),
}

impl Reference {
    /// Creates a named reference.
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self::Name(name.into())
    }

    /// Creates a label reference.
    #[must_use]
    pub fn label(label: Label) -> Self {
        Self::Label(label)
    }

    /// Returns true for named references.
    #[must_use]
    pub fn is_name(&self) -> bool {
        matches!(self, Self::Name(_))
    }

    /// Returns true for anonymous references.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous(_))
    }

    /// Returns true for label references.
    #[must_use]
    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label(_))
    }

    /// Returns true for generalization placeholders.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Returns the label of a label reference.
    #[must_use]
    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "${name}"),
            Self::Anonymous(n) => write!(f, "$_{n}"),
            Self::Label(label) => write!(f, "{label}"),
            Self::System(name) => write!(f, "$~{name}"),
        }
    }
}
