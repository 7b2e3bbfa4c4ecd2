//! Resolution events for tracing and debugging.

use std::sync::Arc;

use crate::concludable::Fingerprint;
use crate::conclusion::Fact;

/// Something that happened while resolving a query.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolutionEvent {
    /// Resolution of a query began.
    Started {
        /// The query, rendered.
        query: String,
    },
    /// A fixpoint iteration began (the first iteration is 1).
    IterationStarted {
        /// Iteration number.
        iteration: u32,
    },
    /// An atomic query had no usable cache entry.
    CacheMiss {
        /// The atomic query.
        fingerprint: Fingerprint,
    },
    /// An atomic query was served from the cache.
    CacheHit {
        /// The atomic query.
        fingerprint: Fingerprint,
    },
    /// A rule was unified with an atomic query.
    Unified {
        /// Rule label.
        rule: Arc<str>,
        /// The atomic query, rendered.
        query: String,
        /// Number of distinct unifiers.
        unifiers: usize,
    },
    /// A rule fired and concluded a fact.
    Concluded {
        /// Rule label.
        rule: Arc<str>,
        /// The concluded fact.
        fact: Fact,
    },
    /// A new answer was appended to a cache entry.
    AnswerRecorded {
        /// The atomic query.
        fingerprint: Fingerprint,
        /// Answers now in the entry.
        total: usize,
    },
    /// A reader re-entered an atomic query that is still being produced and
    /// got no further answers from it in this iteration.
    CycleCut {
        /// The atomic query.
        fingerprint: Fingerprint,
    },
    /// Resolution of the query finished.
    Finished {
        /// Distinct answers produced.
        answers: usize,
        /// Fixpoint iterations used.
        iterations: u32,
    },
}

impl ResolutionEvent {
    /// Short name of the event kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::IterationStarted { .. } => "iteration",
            Self::CacheMiss { .. } => "cache-miss",
            Self::CacheHit { .. } => "cache-hit",
            Self::Unified { .. } => "unified",
            Self::Concluded { .. } => "concluded",
            Self::AnswerRecorded { .. } => "recorded",
            Self::CycleCut { .. } => "cycle-cut",
            Self::Finished { .. } => "finished",
        }
    }
}

/// Receives resolution events.
///
/// Resolution is single-threaded; observers are shared through `Rc` and use
/// interior mutability to record what they see.
pub trait Observer {
    /// Called for every event, in order.
    fn on_event(&self, event: &ResolutionEvent);
}
