//! Inference rules.
//!
//! A rule concludes one relation or one ownership (its head) whenever its
//! body matches. The head is generalized once, when the rule is built, and
//! the variants are reused for every query unified against the rule.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use deduce_foundation::{Error, ErrorContext, Result};
use tracing::trace;

use crate::concludable::Concludable;
use crate::generalize::{HeadConcludable, generalize};
use crate::pattern::{Conjunction, Constraint, Reference};
use crate::unify::{Unifier, unify};

// =============================================================================
// Rule
// =============================================================================

/// A validated rule with its generalized head.
#[derive(Clone, Debug)]
pub struct Rule {
    label: Arc<str>,
    when: Conjunction,
    then: Conjunction,
    heads: Vec<HeadConcludable>,
}

impl Rule {
    /// Builds a rule from its body (`when`) and head (`then`).
    ///
    /// # Errors
    ///
    /// Returns `IllegalConcludable` if the head concludes neither a relation
    /// nor an ownership, contains a negation, or uses a named thing variable
    /// the body does not bind (relation owners excepted, since the rule
    /// creates them).
    pub fn new(label: &str, when: Conjunction, then: Conjunction) -> Result<Self> {
        let context = || ErrorContext::new().with_rule(label).with_pattern(then.to_string());

        let conclusion = then
            .constraints()
            .iter()
            .find(|c| matches!(c, Constraint::Relation { .. } | Constraint::Has { .. }))
            .ok_or_else(|| {
                Error::illegal_concludable("rule head concludes neither a relation nor an ownership")
                    .with_context(context())
            })?;
        if !then.negations().is_empty() {
            return Err(Error::illegal_concludable("rule head contains a negation").with_context(context()));
        }

        let created = match conclusion {
            Constraint::Relation { owner, .. } => Some(owner),
            _ => None,
        };
        for constraint in then.constraints() {
            for reference in constraint.thing_references() {
                if reference.is_name() && Some(reference) != created && when.variable(reference).is_none() {
                    return Err(Error::illegal_concludable(format!(
                        "{reference} in the rule head is not bound by the rule body"
                    ))
                    .with_context(context()));
                }
            }
        }

        let mut heads = Vec::new();
        for constraint in then.constraints() {
            let concludable = Concludable::new(constraint.clone(), &then)
                .map_err(|e| e.with_context(context()))?;
            heads.extend(generalize(&concludable));
        }
        trace!(rule = label, heads = heads.len(), "generalized rule head");

        Ok(Self {
            label: label.into(),
            when,
            then,
            heads,
        })
    }

    /// The rule label.
    #[must_use]
    pub fn label(&self) -> &Arc<str> {
        &self.label
    }

    /// The rule body.
    #[must_use]
    pub fn when(&self) -> &Conjunction {
        &self.when
    }

    /// The rule head.
    #[must_use]
    pub fn then(&self) -> &Conjunction {
        &self.then
    }

    /// The relation or ownership the rule concludes.
    #[must_use]
    pub fn conclusion(&self) -> Option<&Constraint> {
        self.then
            .constraints()
            .iter()
            .find(|c| matches!(c, Constraint::Relation { .. } | Constraint::Has { .. }))
    }

    /// Every generalized variant of every head constraint.
    #[must_use]
    pub fn heads(&self) -> &[HeadConcludable] {
        &self.heads
    }

    /// Returns true if the head mentions `reference`.
    #[must_use]
    pub fn head_mentions(&self, reference: &Reference) -> bool {
        self.then.variable(reference).is_some()
    }

    /// All distinct unifiers of `query` with this rule's head.
    #[must_use]
    pub fn unifiers(&self, query: &Concludable) -> Vec<Unifier> {
        let unifiers: BTreeSet<Unifier> = self
            .heads
            .iter()
            .flat_map(|head| unify(query, head))
            .collect();
        unifiers.into_iter().collect()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {}: when {} then {}", self.label, self.when, self.then)
    }
}
