//! Conjunctions of constraints and a builder for writing them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use deduce_foundation::{Label, Value};

use super::constraint::{Constraint, Operand, Predicate, RolePlayer};
use super::reference::Reference;
use super::variable::Variable;

/// A negated block: one or more alternative conjunctions, none of which may
/// match.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Negation {
    /// Alternatives. Only a single alternative can be evaluated.
    pub disjunction: Vec<Conjunction>,
}

/// A flat conjunction of constraints over typed variables.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Conjunction {
    variables: BTreeMap<Reference, Variable>,
    constraints: Vec<Constraint>,
    negations: Vec<Negation>,
}

impl Conjunction {
    /// Creates a conjunction from its parts.
    ///
    /// Every reference mentioned by a constraint must have a variable entry.
    #[must_use]
    pub fn new(
        variables: BTreeMap<Reference, Variable>,
        constraints: Vec<Constraint>,
        negations: Vec<Negation>,
    ) -> Self {
        Self {
            variables,
            constraints,
            negations,
        }
    }

    /// Starts building a conjunction.
    #[must_use]
    pub fn builder() -> ConjunctionBuilder {
        ConjunctionBuilder::default()
    }

    /// Returns the variable table.
    #[must_use]
    pub fn variables(&self) -> &BTreeMap<Reference, Variable> {
        &self.variables
    }

    /// Returns a variable by reference.
    #[must_use]
    pub fn variable(&self, reference: &Reference) -> Option<&Variable> {
        self.variables.get(reference)
    }

    /// Returns the constraints in pattern order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns the negated blocks.
    #[must_use]
    pub fn negations(&self) -> &[Negation] {
        &self.negations
    }

    pub(crate) fn variables_mut(&mut self) -> &mut BTreeMap<Reference, Variable> {
        &mut self.variables
    }

    pub(crate) fn constraints_mut(&mut self) -> &mut Vec<Constraint> {
        &mut self.constraints
    }

    pub(crate) fn negations_mut(&mut self) -> &mut Vec<Negation> {
        &mut self.negations
    }

    /// Returns the named references, which are the ones answers bind.
    #[must_use]
    pub fn named_references(&self) -> BTreeSet<Reference> {
        self.variables
            .keys()
            .filter(|r| r.is_name())
            .cloned()
            .collect()
    }

    /// Returns the isa constraint on `owner`, if any.
    #[must_use]
    pub fn isa_of(&self, owner: &Reference) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| matches!(c, Constraint::Isa { owner: o, .. } if o == owner))
    }

    /// Returns the value constraints on `owner`.
    pub fn values_of<'a>(&'a self, owner: &'a Reference) -> impl Iterator<Item = &'a Constraint> {
        self.constraints
            .iter()
            .filter(move |c| matches!(c, Constraint::Value { owner: o, .. } if o == owner))
    }

    /// Returns true if the conjunction has no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for constraint in &self.constraints {
            write!(f, "{constraint}; ")?;
        }
        for negation in &self.negations {
            write!(f, "not ")?;
            for (i, branch) in negation.disjunction.iter().enumerate() {
                if i > 0 {
                    write!(f, " or ")?;
                }
                write!(f, "{branch}")?;
            }
            write!(f, "; ")?;
        }
        write!(f, "}}")
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds conjunctions from variable names and type labels.
///
/// A variable name of `"_"` creates a fresh anonymous variable each time.
/// Role names may be scoped (`"employment:employee"`) or bare (`"employee"`).
///
/// ```
/// use deduce_engine::pattern::Conjunction;
///
/// let query = Conjunction::builder()
///     .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
///     .isa("_", "is-located-in")
///     .has_value("x", "name", "Warsaw")
///     .build();
/// assert_eq!(query.named_references().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ConjunctionBuilder {
    variables: BTreeMap<Reference, Variable>,
    constraints: Vec<Constraint>,
    negations: Vec<Negation>,
    anonymous: u32,
    /// The last anonymous variable created, so that `"_"` in a follow-up
    /// `isa` refers to the relation or attribute just added.
    last_anonymous: Option<Reference>,
}

impl ConjunctionBuilder {
    fn thing(&mut self, name: &str) -> Reference {
        let reference = if name == "_" {
            let reference = Reference::Anonymous(self.anonymous);
            self.anonymous += 1;
            self.last_anonymous = Some(reference.clone());
            reference
        } else {
            Reference::name(name)
        };
        self.variables
            .entry(reference.clone())
            .or_insert_with(|| Variable::thing(reference.clone()));
        reference
    }

    /// Refers to the most recent anonymous variable for `"_"`.
    fn existing(&mut self, name: &str) -> Reference {
        match (name, &self.last_anonymous) {
            ("_", Some(last)) => last.clone(),
            _ => self.thing(name),
        }
    }

    fn type_reference(&mut self, ty: &str) -> Reference {
        let reference = if let Some(name) = ty.strip_prefix('$') {
            Reference::name(name)
        } else {
            Reference::label(parse_label(ty))
        };
        self.variables
            .entry(reference.clone())
            .or_insert_with(|| Variable::type_variable(reference.clone()));
        reference
    }

    /// Adds `$owner isa type`. A type starting with `$` is a type variable.
    ///
    /// `"_"` as owner refers to the most recently created anonymous variable.
    #[must_use]
    pub fn isa(mut self, owner: &str, ty: &str) -> Self {
        let owner = self.existing(owner);
        let ty = self.type_reference(ty);
        self.constraints.push(Constraint::Isa {
            owner,
            ty,
            explicit: false,
        });
        self
    }

    /// Adds `$owner isa! type`.
    #[must_use]
    pub fn isa_exact(mut self, owner: &str, ty: &str) -> Self {
        let owner = self.existing(owner);
        let ty = self.type_reference(ty);
        self.constraints.push(Constraint::Isa {
            owner,
            ty,
            explicit: true,
        });
        self
    }

    /// Adds `$owner has $attribute`, with `$attribute isa attribute_type`
    /// when a type is given.
    #[must_use]
    pub fn has(mut self, owner: &str, attribute_type: Option<&str>, attribute: &str) -> Self {
        let owner = self.thing(owner);
        let attribute = self.thing(attribute);
        self.constraints.push(Constraint::Has {
            owner,
            attribute: attribute.clone(),
        });
        if let Some(ty) = attribute_type {
            let ty = self.type_reference(ty);
            self.constraints.push(Constraint::Isa {
                owner: attribute,
                ty,
                explicit: false,
            });
        }
        self
    }

    /// Adds `$owner has attribute_type value` through a fresh anonymous
    /// attribute variable.
    #[must_use]
    pub fn has_value(mut self, owner: &str, attribute_type: &str, value: impl Into<Value>) -> Self {
        let owner = self.thing(owner);
        let attribute = self.thing("_");
        let ty = self.type_reference(attribute_type);
        self.constraints.push(Constraint::Has {
            owner,
            attribute: attribute.clone(),
        });
        self.constraints.push(Constraint::Isa {
            owner: attribute.clone(),
            ty,
            explicit: false,
        });
        self.constraints.push(Constraint::Value {
            owner: attribute,
            predicate: Predicate::Eq,
            operand: Operand::Literal(value.into()),
        });
        self
    }

    /// Adds a relation constraint. A role starting with `$` is a role type
    /// variable; `None` leaves the role unspecified.
    #[must_use]
    pub fn relation(mut self, owner: &str, role_players: &[(Option<&str>, &str)]) -> Self {
        let owner = self.thing(owner);
        let role_players = role_players
            .iter()
            .map(|(role, player)| {
                let role_type = role.map(|role| self.type_reference(role));
                RolePlayer::new(role_type, self.thing(player))
            })
            .collect();
        self.last_anonymous = owner.is_anonymous().then(|| owner.clone());
        self.constraints.push(Constraint::Relation {
            owner,
            role_players,
        });
        self
    }

    /// Adds `$owner <predicate> value`.
    #[must_use]
    pub fn value(mut self, owner: &str, predicate: Predicate, value: impl Into<Value>) -> Self {
        let owner = self.existing(owner);
        self.constraints.push(Constraint::Value {
            owner,
            predicate,
            operand: Operand::Literal(value.into()),
        });
        self
    }

    /// Adds `$owner <predicate> $other`.
    #[must_use]
    pub fn value_var(mut self, owner: &str, predicate: Predicate, other: &str) -> Self {
        let owner = self.existing(owner);
        let other = self.thing(other);
        self.constraints.push(Constraint::Value {
            owner,
            predicate,
            operand: Operand::Variable(other),
        });
        self
    }

    /// Adds a negated block.
    #[must_use]
    pub fn not(mut self, negated: Conjunction) -> Self {
        self.negations.push(Negation {
            disjunction: vec![negated],
        });
        self
    }

    /// Adds a negated disjunction of several blocks.
    #[must_use]
    pub fn not_any(mut self, alternatives: Vec<Conjunction>) -> Self {
        self.negations.push(Negation {
            disjunction: alternatives,
        });
        self
    }

    /// Finishes the conjunction.
    #[must_use]
    pub fn build(self) -> Conjunction {
        Conjunction {
            variables: self.variables,
            constraints: self.constraints,
            negations: self.negations,
        }
    }
}

/// Parses `"scope:name"` into a scoped label and anything else into a plain
/// one.
fn parse_label(text: &str) -> Label {
    match text.split_once(':') {
        Some((scope, name)) => Label::scoped(scope, name),
        None => Label::of(text),
    }
}
