//! Error types for deduce.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::label::Label;

/// The main error type for reasoning operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an illegal concludable error.
    #[must_use]
    pub fn illegal_concludable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalConcludable(message.into()))
    }

    /// Creates an unresolved type error.
    #[must_use]
    pub fn unresolved_type(label: Label) -> Self {
        Self::new(ErrorKind::UnresolvedType(label))
    }

    /// Creates an unsupported negation error.
    #[must_use]
    pub fn unsupported_negation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedNegationShape(message.into()))
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage(message.into()))
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A rule conclusion or concludable has a shape that cannot be inferred.
    #[error("illegal concludable: {0}")]
    IllegalConcludable(String),

    /// A type label does not exist in the schema.
    #[error("unresolved type: {0}")]
    UnresolvedType(Label),

    /// A negated block is not a single pattern over already-bound variables.
    #[error("unsupported negation: {0}")]
    UnsupportedNegationShape(String),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Semantic limit exceeded (kill switch triggered).
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// Fixpoint iteration did not converge within the limit.
    MaxIterations {
        /// The configured limit.
        limit: u32,
    },
    /// An explanation nested deeper than the limit.
    MaxExplanationDepth {
        /// The configured limit.
        limit: usize,
        /// The rule whose application went too deep, if known.
        rule: Option<String>,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxIterations { limit } => {
                write!(f, "max iterations ({limit}) exceeded")
            }
            Self::MaxExplanationDepth { limit, rule } => {
                write!(f, "max explanation depth ({limit}) exceeded")?;
                if let Some(rule) = rule {
                    write!(f, " in rule {rule}")?;
                }
                Ok(())
            }
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule label, if the error arose while handling a rule.
    pub rule: Option<String>,
    /// The pattern being processed, rendered for humans.
    pub pattern: Option<String>,
    /// Stack of resolution steps leading to the error.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "in rule {rule}")?;
        }
        if let Some(pattern) = &self.pattern {
            write!(f, " at {pattern}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
