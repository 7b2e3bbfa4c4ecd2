//! "Why" queries: the chain of rule applications behind an answer.
//!
//! The chain follows one path from the answer down to stored facts. At a
//! join it descends into the side with the deeper derivation, so the chain
//! ends at the lookup that the longest line of reasoning rests on.

use std::sync::Arc;

use deduce_engine::{Answer, ConceptMap, Explanation};

// =============================================================================
// Derivation Step
// =============================================================================

/// One rule application in a derivation chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivationStep {
    /// The rule that fired.
    pub rule: Arc<str>,
    /// What the rule application answered.
    pub conclusion: ConceptMap,
    /// The rule body answer it fired on.
    pub premise: ConceptMap,
}

// =============================================================================
// Derivation Chain
// =============================================================================

/// A chain of rule applications, the answer's own rule first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DerivationChain {
    /// The steps, outermost first.
    pub steps: Vec<DerivationStep>,
    /// True if the chain was cut off by the depth limit.
    pub truncated: bool,
}

impl DerivationChain {
    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The rule application that produced the answer.
    #[must_use]
    pub fn immediate_cause(&self) -> Option<&DerivationStep> {
        self.steps.first()
    }

    /// The innermost rule application reached.
    #[must_use]
    pub fn root_cause(&self) -> Option<&DerivationStep> {
        self.steps.last()
    }

    /// Rule labels along the chain, outermost first.
    #[must_use]
    pub fn rules(&self) -> Vec<&str> {
        self.steps.iter().map(|step| &*step.rule).collect()
    }
}

// =============================================================================
// Why Result
// =============================================================================

/// Result of a "why" query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WhyResult {
    /// The answer was read from stored facts only.
    Stored,
    /// The answer rests on rule applications.
    Derived(DerivationChain),
}

impl WhyResult {
    /// Returns true if a rule was involved.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Derived(_))
    }

    /// Returns the rule that produced the answer, if any.
    #[must_use]
    pub fn last_rule(&self) -> Option<&str> {
        match self {
            Self::Derived(chain) => chain.immediate_cause().map(|step| &*step.rule),
            Self::Stored => None,
        }
    }
}

// =============================================================================
// Why Query
// =============================================================================

/// Answers "why does this answer hold?"
#[derive(Clone, Copy, Debug)]
pub struct WhyQuery {
    depth: usize,
}

impl WhyQuery {
    /// Creates a query that follows at most `depth` rule applications.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Traces the derivation chain of `answer`.
    #[must_use]
    pub fn why(&self, answer: &Answer) -> WhyResult {
        let mut chain = DerivationChain::default();
        let mut current = answer;
        loop {
            match current.explanation.as_ref() {
                Explanation::Lookup => break,
                Explanation::Join { left, right } => {
                    current = if right.explanation.depth() > left.explanation.depth() {
                        right
                    } else {
                        left
                    };
                }
                Explanation::RuleApplication { rule, premise, .. } => {
                    if chain.steps.len() == self.depth {
                        chain.truncated = true;
                        break;
                    }
                    chain.steps.push(DerivationStep {
                        rule: Arc::clone(rule),
                        conclusion: current.concepts.clone(),
                        premise: premise.concepts.clone(),
                    });
                    current = premise;
                }
            }
        }
        if chain.is_empty() && !chain.truncated {
            WhyResult::Stored
        } else {
            WhyResult::Derived(chain)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
