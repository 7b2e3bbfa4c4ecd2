//! Trace records.
//!
//! A record wraps one [`ResolutionEvent`] with its position in the session:
//! a sequence id, the fixpoint iteration it happened in, and a timestamp.

use deduce_engine::ResolutionEvent;

/// Coarse grouping of resolution events, used for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// Query start and finish, iteration boundaries.
    Lifecycle,
    /// Cache hits, misses, recorded answers and cycle cuts.
    Cache,
    /// Unification and conclusions.
    Rule,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lifecycle => write!(f, "lifecycle"),
            Self::Cache => write!(f, "cache"),
            Self::Rule => write!(f, "rule"),
        }
    }
}

/// Returns the category of an event.
#[must_use]
pub fn category(event: &ResolutionEvent) -> EventCategory {
    match event {
        ResolutionEvent::Started { .. }
        | ResolutionEvent::IterationStarted { .. }
        | ResolutionEvent::Finished { .. } => EventCategory::Lifecycle,
        ResolutionEvent::CacheMiss { .. }
        | ResolutionEvent::CacheHit { .. }
        | ResolutionEvent::AnswerRecorded { .. }
        | ResolutionEvent::CycleCut { .. } => EventCategory::Cache,
        ResolutionEvent::Unified { .. } | ResolutionEvent::Concluded { .. } => EventCategory::Rule,
    }
}

// =============================================================================
// Trace Record
// =============================================================================

/// A timestamped resolution event.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    /// Unique record ID within the session.
    pub id: u64,
    /// Fixpoint iteration the event happened in (0 before the first).
    pub iteration: u32,
    /// Timestamp in nanoseconds since the tracer was created.
    pub timestamp_ns: u64,
    /// The event.
    pub event: ResolutionEvent,
}

impl TraceRecord {
    /// Creates a new trace record.
    #[must_use]
    pub fn new(id: u64, iteration: u32, timestamp_ns: u64, event: ResolutionEvent) -> Self {
        Self {
            id,
            iteration,
            timestamp_ns,
            event,
        }
    }

    /// Returns the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event.name()
    }

    /// Returns the event category.
    #[must_use]
    pub fn category(&self) -> EventCategory {
        category(&self.event)
    }

    /// Returns the rule the event concerns, if any.
    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        match &self.event {
            ResolutionEvent::Unified { rule, .. } | ResolutionEvent::Concluded { rule, .. } => Some(rule),
            _ => None,
        }
    }
}
