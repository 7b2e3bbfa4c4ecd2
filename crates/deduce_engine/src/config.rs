//! Configuration for the reasoner.

/// Limits and switches for resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReasonerConfig {
    /// Maximum fixpoint iterations before giving up.
    pub max_iterations: u32,

    /// Insert conclusions into the shared storage instead of a scratch copy
    /// owned by the resolution.
    pub persist_conclusions: bool,

    /// Maximum rule applications on one explanation path.
    pub max_explanation_depth: usize,

    /// Check every answer's explanation before returning it: each branch
    /// must end in a lookup within `max_explanation_depth` rule
    /// applications, and when the query is connected every join must
    /// combine answers that share a variable.
    pub validate_explanations: bool,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 32,
            persist_conclusions: false,
            max_explanation_depth: 64,
            validate_explanations: false,
        }
    }
}

impl ReasonerConfig {
    /// Creates a configuration that validates every explanation.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            validate_explanations: true,
            ..Self::default()
        }
    }

    /// Creates a configuration that keeps concluded facts in storage.
    #[must_use]
    pub fn persistent() -> Self {
        Self {
            persist_conclusions: true,
            ..Self::default()
        }
    }

    /// Builder method to set the iteration limit.
    #[must_use]
    pub fn with_max_iterations(mut self, limit: u32) -> Self {
        self.max_iterations = limit;
        self
    }

    /// Builder method to persist conclusions.
    #[must_use]
    pub fn with_persist_conclusions(mut self, persist: bool) -> Self {
        self.persist_conclusions = persist;
        self
    }

    /// Builder method to set the explanation depth limit.
    #[must_use]
    pub fn with_max_explanation_depth(mut self, depth: usize) -> Self {
        self.max_explanation_depth = depth;
        self
    }

    /// Builder method to enable explanation validation.
    #[must_use]
    pub fn with_validate_explanations(mut self, validate: bool) -> Self {
        self.validate_explanations = validate;
        self
    }
}
