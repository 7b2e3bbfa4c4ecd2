//! Trace output formatters.
//!
//! Provides human-readable and JSON formatters for trace records.

use std::fmt::Write;

use deduce_engine::ResolutionEvent;

use super::record::TraceRecord;

// =============================================================================
// Trace Formatter Trait
// =============================================================================

/// Trait for formatting trace records.
pub trait TraceFormatter {
    /// Formats a single trace record to a string.
    fn format(&self, record: &TraceRecord) -> String;

    /// Formats multiple records.
    fn format_many(&self, records: &[&TraceRecord]) -> String {
        records
            .iter()
            .map(|r| self.format(r))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Human-Readable Formatter
// =============================================================================

/// Formats trace records in human-readable form.
#[derive(Clone, Debug, Default)]
pub struct HumanFormatter {
    /// Whether to include timestamps.
    pub show_timestamps: bool,
    /// Whether to include record IDs.
    pub show_ids: bool,
}

impl HumanFormatter {
    /// Creates a new human formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to show timestamps.
    #[must_use]
    pub fn with_timestamps(mut self) -> Self {
        self.show_timestamps = true;
        self
    }

    /// Builder method to show record IDs.
    #[must_use]
    pub fn with_ids(mut self) -> Self {
        self.show_ids = true;
        self
    }

    /// Formats timestamp in microseconds.
    #[allow(clippy::cast_precision_loss)]
    fn format_timestamp(ns: u64) -> String {
        let us = ns / 1000;
        if us >= 1_000_000 {
            format!("{:.3}s", us as f64 / 1_000_000.0)
        } else if us >= 1000 {
            format!("{:.3}ms", us as f64 / 1000.0)
        } else {
            format!("{us}us")
        }
    }
}

impl TraceFormatter for HumanFormatter {
    fn format(&self, record: &TraceRecord) -> String {
        let mut prefix = String::new();

        if self.show_ids {
            let _ = write!(prefix, "[{:06}] ", record.id);
        }

        let _ = write!(prefix, "I{:03} ", record.iteration);

        if self.show_timestamps {
            let _ = write!(
                prefix,
                "{:>10} ",
                Self::format_timestamp(record.timestamp_ns)
            );
        }

        let event_str = match &record.event {
            ResolutionEvent::Started { query } => format!("=== RESOLVE {query} ==="),
            ResolutionEvent::IterationStarted { iteration } => format!("  >> iteration {iteration}"),
            ResolutionEvent::CacheMiss { fingerprint } => format!("  MISS {fingerprint}"),
            ResolutionEvent::CacheHit { fingerprint } => format!("  HIT {fingerprint}"),
            ResolutionEvent::Unified {
                rule,
                query,
                unifiers,
            } => format!("  UNIFIED {rule} with {query} ({unifiers} unifiers)"),
            ResolutionEvent::Concluded { rule, fact } => format!("    CONCLUDED ({rule}) {fact}"),
            ResolutionEvent::AnswerRecorded { fingerprint, total } => {
                format!("    RECORDED #{total} {fingerprint}")
            }
            ResolutionEvent::CycleCut { fingerprint } => format!("    CUT {fingerprint}"),
            ResolutionEvent::Finished {
                answers,
                iterations,
            } => format!("=== DONE {answers} answers in {iterations} iterations ==="),
        };

        format!("{prefix}{event_str}")
    }
}

// =============================================================================
// JSON Formatter
// =============================================================================

/// Formats trace records as JSON.
#[derive(Clone, Debug, Default)]
pub struct JsonFormatter {
    /// Whether to lay out lists one record per line.
    pub pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method for pretty printing.
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Escapes a string for JSON.
    fn escape_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    fn string(s: &impl ToString) -> String {
        format!("\"{}\"", Self::escape_string(&s.to_string()))
    }
}

impl TraceFormatter for JsonFormatter {
    fn format(&self, record: &TraceRecord) -> String {
        let event_data = match &record.event {
            ResolutionEvent::Started { query } => format!("\"query\":{}", Self::string(query)),
            ResolutionEvent::IterationStarted { iteration } => format!("\"iteration\":{iteration}"),
            ResolutionEvent::CacheMiss { fingerprint }
            | ResolutionEvent::CacheHit { fingerprint }
            | ResolutionEvent::CycleCut { fingerprint } => {
                format!("\"query\":{}", Self::string(fingerprint))
            }
            ResolutionEvent::Unified {
                rule,
                query,
                unifiers,
            } => format!(
                "\"rule\":{},\"query\":{},\"unifiers\":{unifiers}",
                Self::string(rule),
                Self::string(query)
            ),
            ResolutionEvent::Concluded { rule, fact } => format!(
                "\"rule\":{},\"fact\":{}",
                Self::string(rule),
                Self::string(fact)
            ),
            ResolutionEvent::AnswerRecorded { fingerprint, total } => {
                format!("\"query\":{},\"total\":{total}", Self::string(fingerprint))
            }
            ResolutionEvent::Finished {
                answers,
                iterations,
            } => format!("\"answers\":{answers},\"iterations\":{iterations}"),
        };

        format!(
            "{{\"id\":{},\"iteration\":{},\"timestamp_ns\":{},\"type\":\"{}\",{}}}",
            record.id,
            record.iteration,
            record.timestamp_ns,
            record.event_type(),
            event_data
        )
    }

    fn format_many(&self, records: &[&TraceRecord]) -> String {
        let items: Vec<_> = records.iter().map(|r| self.format(r)).collect();
        if self.pretty {
            format!("[\n  {}\n]", items.join(",\n  "))
        } else {
            format!("[{}]", items.join(","))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
