//! The four constraint kinds a pattern is built from.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use deduce_foundation::{Label, Value};

use super::reference::Reference;

/// Comparison used by value constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl Predicate {
    /// Returns true if `ordering` (left compared to right) satisfies this
    /// predicate.
    #[must_use]
    pub fn test(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Neq => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }

    /// Evaluates `left <predicate> right`.
    ///
    /// Incomparable values only satisfy `!=`.
    #[must_use]
    pub fn evaluate(self, left: &Value, right: &Value) -> bool {
        match left.compare(right) {
            Some(ordering) => self.test(ordering),
            None => self == Self::Neq,
        }
    }

    /// Returns true if two equal values satisfy this predicate.
    #[must_use]
    pub fn admits_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Gte | Self::Lte)
    }

    /// Returns the operator symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// Right-hand side of a value constraint.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operand {
    /// A literal value.
    Literal(Value),
    /// Another thing variable.
    Variable(Reference),
}

/// One entry of a relation constraint.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RolePlayer {
    /// Role type variable, `None` if the role is unspecified.
    pub role_type: Option<Reference>,
    /// The player thing variable.
    pub player: Reference,
    /// Role types this entry may take. Empty means unconstrained.
    pub role_hints: BTreeSet<Label>,
}

impl RolePlayer {
    /// Creates a role-player entry without hints.
    #[must_use]
    pub fn new(role_type: Option<Reference>, player: Reference) -> Self {
        Self {
            role_type,
            player,
            role_hints: BTreeSet::new(),
        }
    }
}

/// Discriminant of [`Constraint`], used for ordering and statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintKind {
    /// Relation constraint.
    Relation,
    /// Ownership constraint.
    Has,
    /// Type constraint.
    Isa,
    /// Value comparison.
    Value,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relation => write!(f, "relation"),
            Self::Has => write!(f, "has"),
            Self::Isa => write!(f, "isa"),
            Self::Value => write!(f, "value"),
        }
    }
}

/// A single constraint over pattern variables.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Constraint {
    /// `$owner isa $ty` (`isa!` when explicit, matching the exact type only).
    Isa {
        /// Thing variable being typed.
        owner: Reference,
        /// Type variable.
        ty: Reference,
        /// Exact-type match.
        explicit: bool,
    },
    /// `$owner has $attribute`.
    Has {
        /// Owner thing variable.
        owner: Reference,
        /// Attribute thing variable.
        attribute: Reference,
    },
    /// `$owner (role: $player, ...)`.
    Relation {
        /// Relation thing variable.
        owner: Reference,
        /// Role-players in pattern order.
        role_players: Vec<RolePlayer>,
    },
    /// `$owner <predicate> operand`.
    Value {
        /// Attribute thing variable.
        owner: Reference,
        /// Comparison.
        predicate: Predicate,
        /// Right-hand side.
        operand: Operand,
    },
}

impl Constraint {
    /// Returns the owner variable.
    #[must_use]
    pub fn owner(&self) -> &Reference {
        match self {
            Self::Isa { owner, .. }
            | Self::Has { owner, .. }
            | Self::Relation { owner, .. }
            | Self::Value { owner, .. } => owner,
        }
    }

    /// Returns the constraint kind.
    #[must_use]
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::Isa { .. } => ConstraintKind::Isa,
            Self::Has { .. } => ConstraintKind::Has,
            Self::Relation { .. } => ConstraintKind::Relation,
            Self::Value { .. } => ConstraintKind::Value,
        }
    }

    /// Returns the thing variables this constraint relates, owner first.
    #[must_use]
    pub fn thing_references(&self) -> Vec<&Reference> {
        match self {
            Self::Isa { owner, .. } => vec![owner],
            Self::Has { owner, attribute } => vec![owner, attribute],
            Self::Relation {
                owner,
                role_players,
            } => std::iter::once(owner)
                .chain(role_players.iter().map(|rp| &rp.player))
                .collect(),
            Self::Value { owner, operand, .. } => match operand {
                Operand::Variable(other) => vec![owner, other],
                Operand::Literal(_) => vec![owner],
            },
        }
    }

    /// Returns every reference this constraint mentions, in a stable order.
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Self::Isa { owner, ty, .. } => vec![owner, ty],
            Self::Relation {
                owner,
                role_players,
            } => {
                let mut refs = vec![owner];
                for rp in role_players {
                    if let Some(role) = &rp.role_type {
                        refs.push(role);
                    }
                    refs.push(&rp.player);
                }
                refs
            }
            Self::Has { .. } | Self::Value { .. } => self.thing_references(),
        }
    }

    /// Returns a copy with every reference passed through `f`.
    #[must_use]
    pub fn map_references(&self, f: &mut impl FnMut(&Reference) -> Reference) -> Self {
        match self {
            Self::Isa { owner, ty, explicit } => Self::Isa {
                owner: f(owner),
                ty: f(ty),
                explicit: *explicit,
            },
            Self::Has { owner, attribute } => Self::Has {
                owner: f(owner),
                attribute: f(attribute),
            },
            Self::Relation {
                owner,
                role_players,
            } => Self::Relation {
                owner: f(owner),
                role_players: role_players
                    .iter()
                    .map(|rp| RolePlayer {
                        role_type: rp.role_type.as_ref().map(&mut *f),
                        player: f(&rp.player),
                        role_hints: rp.role_hints.clone(),
                    })
                    .collect(),
            },
            Self::Value {
                owner,
                predicate,
                operand,
            } => Self::Value {
                owner: f(owner),
                predicate: *predicate,
                operand: match operand {
                    Operand::Literal(value) => Operand::Literal(value.clone()),
                    Operand::Variable(other) => Operand::Variable(f(other)),
                },
            },
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isa { owner, ty, explicit } => {
                let keyword = if *explicit { "isa!" } else { "isa" };
                write!(f, "{owner} {keyword} {ty}")
            }
            Self::Has { owner, attribute } => write!(f, "{owner} has {attribute}"),
            Self::Relation {
                owner,
                role_players,
            } => {
                write!(f, "{owner} (")?;
                for (i, rp) in role_players.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match &rp.role_type {
                        Some(role) => write!(f, "{role}: {}", rp.player)?,
                        None => write!(f, "{}", rp.player)?,
                    }
                }
                write!(f, ")")
            }
            Self::Value {
                owner,
                predicate,
                operand,
            } => match operand {
                Operand::Literal(value) => write!(f, "{owner} {} {value}", predicate.symbol()),
                Operand::Variable(other) => write!(f, "{owner} {} {other}", predicate.symbol()),
            },
        }
    }
}
