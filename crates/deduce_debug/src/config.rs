//! Configuration for the observability system.

use crate::explain::WhyQuery;
use crate::trace::{Tracer, TracerConfig};

/// Configuration for the observability system.
///
/// Controls tracing and how much of an explanation is shown.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Whether observability is enabled (false = zero overhead).
    pub enabled: bool,

    /// Trace records to retain.
    pub buffer_size: usize,

    /// Default depth for why-queries.
    pub why_depth: usize,

    /// Output trace to stderr.
    pub trace_to_stderr: bool,

    /// Output format: true for JSON, false for human-readable.
    pub json_output: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer_size: 10000,
            why_depth: 1,
            trace_to_stderr: true,
            json_output: false,
        }
    }
}

impl ObservabilityConfig {
    /// Creates a new configuration with observability enabled.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Creates a configuration for development.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            buffer_size: 10000,
            why_depth: 3,
            trace_to_stderr: true,
            json_output: false,
        }
    }

    /// Creates a configuration for debugging deep derivations.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            enabled: true,
            buffer_size: 100_000,
            why_depth: 64,
            trace_to_stderr: true,
            json_output: false,
        }
    }

    /// Builder method to set enabled state.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the trace buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Builder method to set default why depth.
    #[must_use]
    pub fn with_why_depth(mut self, depth: usize) -> Self {
        self.why_depth = depth;
        self
    }

    /// Builder method to enable/disable stderr tracing.
    #[must_use]
    pub fn with_trace_to_stderr(mut self, trace: bool) -> Self {
        self.trace_to_stderr = trace;
        self
    }

    /// Builder method to enable/disable JSON output.
    #[must_use]
    pub fn with_json_output(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }

    /// Builds a tracer from these settings.
    #[must_use]
    pub fn tracer(&self) -> Tracer {
        let mut config = TracerConfig::new().with_buffer_size(self.buffer_size);
        config.enabled = self.enabled;
        if self.trace_to_stderr {
            config = config.to_stderr();
        }
        if self.json_output {
            config = config.json();
        }
        Tracer::new(config)
    }

    /// Builds a why-query with the default depth.
    #[must_use]
    pub fn why(&self) -> WhyQuery {
        WhyQuery::new(self.why_depth)
    }
}
