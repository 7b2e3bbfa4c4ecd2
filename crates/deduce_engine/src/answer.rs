//! Answers and their explanations.
//!
//! Every answer carries its own provenance as an immutable [`Explanation`].
//! Explanations share sub-answers through `Arc`, so the provenance of a
//! resolution forms a DAG rather than a tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use deduce_foundation::{Concept, Error, Result, SemanticLimit};

use crate::concludable::Renaming;
use crate::pattern::Reference;
use crate::unify::Unifier;

// =============================================================================
// Concept Maps
// =============================================================================

/// Bindings from references to concepts.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConceptMap(BTreeMap<Reference, Concept>);

impl ConceptMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the concept bound to `reference`.
    #[must_use]
    pub fn get(&self, reference: &Reference) -> Option<&Concept> {
        self.0.get(reference)
    }

    /// Binds `reference` to `concept`, replacing any previous binding.
    pub fn insert(&mut self, reference: Reference, concept: Concept) {
        self.0.insert(reference, concept);
    }

    /// Returns true if `reference` is bound.
    #[must_use]
    pub fn contains(&self, reference: &Reference) -> bool {
        self.0.contains_key(reference)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates bindings in reference order.
    pub fn iter(&self) -> impl Iterator<Item = (&Reference, &Concept)> {
        self.0.iter()
    }

    /// Returns the bound references.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.0.keys()
    }

    /// Keeps only the given references.
    #[must_use]
    pub fn project(&self, references: &BTreeSet<Reference>) -> Self {
        self.0
            .iter()
            .filter(|(r, _)| references.contains(r))
            .map(|(r, c)| (r.clone(), c.clone()))
            .collect()
    }

    /// Renames references. References missing from `renaming` keep their
    /// name.
    #[must_use]
    pub fn rename(&self, renaming: &Renaming) -> Self {
        self.0
            .iter()
            .map(|(r, c)| (renaming.get(r).unwrap_or(r).clone(), c.clone()))
            .collect()
    }

    /// Returns true if both maps bind their shared references to the same
    /// concepts.
    #[must_use]
    pub fn agrees_with(&self, other: &Self) -> bool {
        self.0
            .iter()
            .all(|(r, c)| other.get(r).is_none_or(|o| o == c))
    }

    /// Returns true if the maps bind at least one common reference.
    #[must_use]
    pub fn shares_reference_with(&self, other: &Self) -> bool {
        self.0.keys().any(|r| other.contains(r))
    }

    /// Combines two maps, or returns `None` if they disagree.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Option<Self> {
        if !self.agrees_with(other) {
            return None;
        }
        let mut merged = self.clone();
        for (r, c) in other.iter() {
            merged.0.insert(r.clone(), c.clone());
        }
        Some(merged)
    }
}

impl FromIterator<(Reference, Concept)> for ConceptMap {
    fn from_iter<I: IntoIterator<Item = (Reference, Concept)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ConceptMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (r, c)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{r}={c}")?;
        }
        write!(f, "}}")
    }
}

// =============================================================================
// Explanations
// =============================================================================

/// How an answer was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Explanation {
    /// Read directly from stored facts.
    Lookup,
    /// Derived by firing `rule` on `premise`, an answer to the rule body.
    RuleApplication {
        /// Label of the rule that fired.
        rule: Arc<str>,
        /// How the query was matched against the rule head.
        unifier: Unifier,
        /// The body answer the rule fired on.
        premise: Answer,
    },
    /// The combination of two answers that agree on their shared variables.
    Join {
        /// Left side.
        left: Answer,
        /// Right side.
        right: Answer,
    },
}

impl Explanation {
    /// Returns true for lookups.
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup)
    }

    /// Returns the rule label of a rule application.
    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::RuleApplication { rule, .. } => Some(rule),
            _ => None,
        }
    }

    /// Number of rule applications on the deepest path to a lookup.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Lookup => 0,
            Self::RuleApplication { premise, .. } => 1 + premise.explanation.depth(),
            Self::Join { left, right } => left.explanation.depth().max(right.explanation.depth()),
        }
    }

    /// Returns true if every join in this explanation combines answers that
    /// share a variable.
    #[must_use]
    pub fn check_connected(&self) -> bool {
        let mut pending = vec![self];
        while let Some(explanation) = pending.pop() {
            match explanation {
                Explanation::Lookup => {}
                Explanation::RuleApplication { premise, .. } => {
                    pending.push(&premise.explanation);
                }
                Explanation::Join { left, right } => {
                    if !left.concepts.shares_reference_with(&right.concepts) {
                        return false;
                    }
                    pending.push(&left.explanation);
                    pending.push(&right.explanation);
                }
            }
        }
        true
    }
}

// =============================================================================
// Answers
// =============================================================================

/// An answer: bindings for the named references of a query, plus where they
/// came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    /// The bindings.
    pub concepts: ConceptMap,
    /// Provenance of the bindings.
    pub explanation: Arc<Explanation>,
}

impl Answer {
    /// Creates an answer read from stored facts.
    #[must_use]
    pub fn lookup(concepts: ConceptMap) -> Self {
        Self {
            concepts,
            explanation: Arc::new(Explanation::Lookup),
        }
    }

    /// Creates an answer derived by a rule.
    #[must_use]
    pub fn derived(concepts: ConceptMap, rule: Arc<str>, unifier: Unifier, premise: Answer) -> Self {
        Self {
            concepts,
            explanation: Arc::new(Explanation::RuleApplication {
                rule,
                unifier,
                premise,
            }),
        }
    }

    /// Creates the join of two answers, or `None` if they disagree.
    #[must_use]
    pub fn join(left: &Answer, right: &Answer) -> Option<Self> {
        let concepts = left.concepts.merge(&right.concepts)?;
        Some(Self {
            concepts,
            explanation: Arc::new(Explanation::Join {
                left: left.clone(),
                right: right.clone(),
            }),
        })
    }

    /// Renames this answer into another variable space.
    ///
    /// The query side of rule application unifiers and both sides of joins
    /// are renamed along with the bindings; rule premises stay in the rule
    /// body's space.
    #[must_use]
    pub fn rename(&self, renaming: &Renaming) -> Self {
        let explanation = match self.explanation.as_ref() {
            Explanation::Lookup => Arc::clone(&self.explanation),
            Explanation::RuleApplication {
                rule,
                unifier,
                premise,
            } => Arc::new(Explanation::RuleApplication {
                rule: Arc::clone(rule),
                unifier: unifier.rename_query(renaming),
                premise: premise.clone(),
            }),
            Explanation::Join { left, right } => Arc::new(Explanation::Join {
                left: left.rename(renaming),
                right: right.rename(renaming),
            }),
        };
        Self {
            concepts: self.concepts.rename(renaming),
            explanation,
        }
    }

    /// Keeps only the given references in the bindings. The explanation is
    /// unchanged.
    #[must_use]
    pub fn project(&self, references: &BTreeSet<Reference>) -> Self {
        Self {
            concepts: self.concepts.project(references),
            explanation: Arc::clone(&self.explanation),
        }
    }

    /// Walks the explanation and checks that it bottoms out in lookups
    /// within `max_depth` rule applications. Returns the depth used.
    ///
    /// # Errors
    ///
    /// Returns a `MaxExplanationDepth` limit error naming the rule whose
    /// application went too deep.
    pub fn check_complete(&self, max_depth: usize) -> Result<usize> {
        let mut deepest = 0;
        let mut pending = vec![(&*self.explanation, 0usize)];
        while let Some((explanation, depth)) = pending.pop() {
            match explanation {
                Explanation::Lookup => deepest = deepest.max(depth),
                Explanation::RuleApplication { rule, premise, .. } => {
                    if depth + 1 > max_depth {
                        return Err(Error::limit_exceeded(SemanticLimit::MaxExplanationDepth {
                            limit: max_depth,
                            rule: Some(rule.to_string()),
                        }));
                    }
                    pending.push((&premise.explanation, depth + 1));
                }
                Explanation::Join { left, right } => {
                    pending.push((&left.explanation, depth));
                    pending.push((&right.explanation, depth));
                }
            }
        }
        Ok(deepest)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.concepts)
    }
}
