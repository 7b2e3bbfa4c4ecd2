//! Concludables: the units of unification.
//!
//! A concludable is one constraint of a conjunction together with copies of
//! the isa and value constraints on the thing variables it touches. It owns
//! everything it needs, so it can be hashed, compared and used as a cache
//! key without reference to the pattern it came from.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use deduce_foundation::{Error, Label, Result};

use crate::pattern::{Conjunction, Constraint, ConstraintKind, Reference, RolePlayer, Variable};

/// Maps references of one variable space to another.
pub type Renaming = BTreeMap<Reference, Reference>;

/// One constraint plus the context needed to interpret it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Concludable {
    constraint: Constraint,
    context: Vec<Constraint>,
    variables: BTreeMap<Reference, Variable>,
}

impl Concludable {
    /// Builds a concludable for `constraint`, copying the isa and value
    /// constraints of its thing variables out of `conjunction`.
    ///
    /// # Errors
    ///
    /// Returns `IllegalConcludable` for a relation without role players and
    /// `Internal` if a reference has no variable in `conjunction`.
    pub fn new(constraint: Constraint, conjunction: &Conjunction) -> Result<Self> {
        if let Constraint::Relation { role_players, .. } = &constraint
            && role_players.is_empty()
        {
            return Err(Error::illegal_concludable(format!(
                "relation without role players: {constraint}"
            )));
        }

        let mut context: Vec<Constraint> = Vec::new();
        for reference in constraint.thing_references() {
            let candidates = conjunction
                .isa_of(reference)
                .into_iter()
                .chain(conjunction.values_of(reference));
            for candidate in candidates {
                if *candidate == constraint || context.contains(candidate) {
                    continue;
                }
                if let (
                    Constraint::Value { owner, .. },
                    Constraint::Value { owner: other, .. },
                ) = (&constraint, candidate)
                    && owner == other
                {
                    continue;
                }
                context.push(candidate.clone());
            }
        }

        let mut variables = BTreeMap::new();
        for reference in std::iter::once(&constraint)
            .chain(&context)
            .flat_map(Constraint::references)
        {
            let variable = conjunction.variable(reference).ok_or_else(|| {
                Error::internal(format!("{reference} has no variable in {conjunction}"))
            })?;
            variables.insert(reference.clone(), variable.clone());
        }

        Ok(Self {
            constraint,
            context,
            variables,
        })
    }

    /// Assembles a concludable from parts already known to be consistent.
    pub(crate) fn from_parts(
        constraint: Constraint,
        context: Vec<Constraint>,
        variables: BTreeMap<Reference, Variable>,
    ) -> Self {
        Self {
            constraint,
            context,
            variables,
        }
    }

    /// The constraint this concludable is about.
    #[must_use]
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// The copied isa and value constraints.
    #[must_use]
    pub fn context(&self) -> &[Constraint] {
        &self.context
    }

    /// Variables of the constraint and its context.
    #[must_use]
    pub fn variables(&self) -> &BTreeMap<Reference, Variable> {
        &self.variables
    }

    /// Returns the variable for `reference`.
    #[must_use]
    pub fn variable(&self, reference: &Reference) -> Option<&Variable> {
        self.variables.get(reference)
    }

    /// Kind of the main constraint.
    #[must_use]
    pub fn kind(&self) -> ConstraintKind {
        self.constraint.kind()
    }

    /// The isa on `reference` among the context constraints.
    #[must_use]
    pub fn context_isa(&self, reference: &Reference) -> Option<&Constraint> {
        self.context
            .iter()
            .find(|c| matches!(c, Constraint::Isa { owner, .. } if owner == reference))
    }

    /// Value constraints on `reference` among the context constraints.
    pub fn context_values<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> impl Iterator<Item = &'a Constraint> {
        self.context
            .iter()
            .filter(move |c| matches!(c, Constraint::Value { owner, .. } if owner == reference))
    }

    /// Type hints of `reference`, empty when unconstrained or unknown.
    #[must_use]
    pub fn hints(&self, reference: &Reference) -> BTreeSet<Label> {
        self.variables
            .get(reference)
            .map(|v| v.hints.clone())
            .unwrap_or_default()
    }

    /// The named references, which answers to this concludable bind.
    #[must_use]
    pub fn named_references(&self) -> BTreeSet<Reference> {
        self.variables
            .keys()
            .filter(|r| r.is_name())
            .cloned()
            .collect()
    }

    /// The constraint and its context as a standalone conjunction.
    #[must_use]
    pub fn to_conjunction(&self) -> Conjunction {
        let constraints = std::iter::once(self.constraint.clone())
            .chain(self.context.iter().cloned())
            .collect();
        Conjunction::new(self.variables.clone(), constraints, Vec::new())
    }

    /// Returns a copy with every reference passed through `f`.
    #[must_use]
    pub fn map_references(&self, f: &mut impl FnMut(&Reference) -> Reference) -> Self {
        let constraint = self.constraint.map_references(f);
        let context = self.context.iter().map(|c| c.map_references(f)).collect();
        let variables = self
            .variables
            .values()
            .map(|variable| {
                let reference = f(&variable.reference);
                let mut variable = variable.clone();
                variable.reference = reference.clone();
                (reference, variable)
            })
            .collect();
        Self {
            constraint,
            context,
            variables,
        }
    }

    /// Returns a copy with role players and context constraints sorted by
    /// their shape, so the order they were written in does not matter.
    fn canonical_order(&self) -> Self {
        let mut constraint = self.constraint.clone();
        if let Constraint::Relation { role_players, .. } = &mut constraint {
            role_players.sort_by_cached_key(|rp| RolePlayer {
                role_type: rp.role_type.as_ref().map(|r| self.shape(r)),
                player: self.shape(&rp.player),
                role_hints: rp.role_hints.clone(),
            });
        }
        let mut context = self.context.clone();
        context.sort_by_cached_key(|c| c.map_references(&mut |r| self.shape(r)));
        Self {
            constraint,
            context,
            variables: self.variables.clone(),
        }
    }

    /// A stand-in for `reference` that keeps its kind and type hints but
    /// not its name. Labels are their own shape.
    fn shape(&self, reference: &Reference) -> Reference {
        let rank = match reference {
            Reference::Label(_) => return reference.clone(),
            Reference::Name(_) => 0,
            Reference::Anonymous(_) => 1,
            Reference::System(_) => 2,
        };
        let hints: Vec<String> = self.hints(reference).iter().map(ToString::to_string).collect();
        Reference::System(format!("{rank}[{}]", hints.join(",")).into())
    }

    /// Every reference in order of first appearance, main constraint first.
    fn references_in_order(&self) -> Vec<&Reference> {
        let mut seen = BTreeSet::new();
        std::iter::once(&self.constraint)
            .chain(&self.context)
            .flat_map(Constraint::references)
            .filter(|r| seen.insert(*r))
            .collect()
    }
}

impl fmt::Display for Concludable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constraint)?;
        for constraint in &self.context {
            write!(f, "; {constraint}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Fingerprints
// =============================================================================

/// The alpha-renamed canonical form of a concludable.
///
/// Two concludables that differ only in the names of their variables, the
/// order of their role players or the order of their context constraints
/// share a fingerprint. Label references are kept, since they carry meaning.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(Arc<Concludable>);

impl Fingerprint {
    /// Computes the fingerprint of `concludable` and the renaming from its
    /// references to the canonical ones.
    #[must_use]
    pub fn of(concludable: &Concludable) -> (Self, Renaming) {
        let ordered = concludable.canonical_order();
        let mut renaming = Renaming::new();
        for (i, reference) in ordered.references_in_order().into_iter().enumerate() {
            let canonical = match reference {
                Reference::Name(_) => Reference::name(&format!("v{i}")),
                Reference::Anonymous(_) => Reference::Anonymous(u32::try_from(i).unwrap_or(u32::MAX)),
                Reference::System(_) => Reference::System(format!("s{i}").into()),
                Reference::Label(_) => reference.clone(),
            };
            renaming.insert(reference.clone(), canonical);
        }
        let mut canonical =
            ordered.map_references(&mut |r| renaming.get(r).cloned().unwrap_or_else(|| r.clone()));
        // context constraints of equal shape are ordered by their renamed form
        canonical.context.sort();
        (Self(Arc::new(canonical)), renaming)
    }

    /// The canonical concludable.
    #[must_use]
    pub fn concludable(&self) -> &Concludable {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inverts a renaming.
#[must_use]
pub fn invert(renaming: &Renaming) -> Renaming {
    renaming.iter().map(|(a, b)| (b.clone(), a.clone())).collect()
}

// =============================================================================
// Extraction
// =============================================================================

/// A concludable extracted from a query conjunction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConjunctionConcludable(Concludable);

impl ConjunctionConcludable {
    /// Wraps a concludable built from a query.
    #[must_use]
    pub fn new(concludable: Concludable) -> Self {
        Self(concludable)
    }

    /// Unwraps the concludable.
    #[must_use]
    pub fn into_inner(self) -> Concludable {
        self.0
    }
}

impl Deref for ConjunctionConcludable {
    type Target = Concludable;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ConjunctionConcludable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Splits a conjunction into concludables.
///
/// Relations and ownerships always yield one. An isa yields one only when
/// no relation or ownership already types its owner, and a value only when
/// nothing already carries it as context. Relations cover their owner's
/// type; ownerships cover their attribute's type, and its values when the
/// attribute is typed.
///
/// # Errors
///
/// Propagates errors from [`Concludable::new`].
pub fn extract(conjunction: &Conjunction) -> Result<Vec<ConjunctionConcludable>> {
    let mut isa_covered: BTreeSet<&Reference> = BTreeSet::new();
    let mut value_covered: BTreeSet<&Reference> = BTreeSet::new();
    let mut concludables = Vec::new();

    let of_kind = |kind: ConstraintKind| {
        conjunction
            .constraints()
            .iter()
            .filter(move |c| c.kind() == kind)
    };

    for relation in of_kind(ConstraintKind::Relation) {
        isa_covered.insert(relation.owner());
        concludables.push(relation);
    }
    for has in of_kind(ConstraintKind::Has) {
        if let Constraint::Has { attribute, .. } = has {
            isa_covered.insert(attribute);
            if conjunction.isa_of(attribute).is_some() {
                value_covered.insert(attribute);
            }
        }
        concludables.push(has);
    }
    for isa in of_kind(ConstraintKind::Isa) {
        if isa_covered.insert(isa.owner()) {
            value_covered.insert(isa.owner());
            concludables.push(isa);
        }
    }
    for value in of_kind(ConstraintKind::Value) {
        if !value_covered.contains(value.owner()) {
            concludables.push(value);
        }
    }

    concludables
        .into_iter()
        .map(|c| Concludable::new(c.clone(), conjunction).map(ConjunctionConcludable))
        .collect()
}
