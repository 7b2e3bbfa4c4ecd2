//! Tracing of query resolution.
//!
//! A [`Tracer`] is an [`Observer`] for the reasoner. It records every
//! resolution event in a ring buffer and can echo events to stderr or to
//! the `tracing` subscriber as they happen.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use deduce_debug::trace::{Tracer, TracerConfig};
//!
//! let tracer = Rc::new(Tracer::new(TracerConfig::new().enabled()));
//! // let reasoner = Reasoner::new(storage).with_observer(tracer.clone());
//! assert!(tracer.is_enabled());
//! ```

pub mod buffer;
pub mod format;
pub mod record;

pub use buffer::{TraceBuffer, TraceBufferStats};
pub use format::{HumanFormatter, JsonFormatter, TraceFormatter};
pub use record::{EventCategory, TraceRecord, category};

use std::cell::{Cell, Ref, RefCell};
use std::io::{self, Write};
use std::time::Instant;

use deduce_engine::{Observer, ResolutionEvent};

// =============================================================================
// Trace Output
// =============================================================================

/// Where trace output should be sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceOutput {
    /// No output (traces still recorded in buffer).
    #[default]
    None,
    /// Write to stderr.
    Stderr,
    /// Emit as `tracing` events at debug level.
    Log,
}

// =============================================================================
// Tracer Configuration
// =============================================================================

/// Configuration for the tracer.
#[derive(Clone, Debug)]
pub struct TracerConfig {
    /// Whether tracing is enabled.
    pub enabled: bool,
    /// Maximum records to keep in buffer.
    pub buffer_size: usize,
    /// Where to output traces.
    pub output: TraceOutput,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Categories to record (empty = all).
    pub category_filter: Vec<EventCategory>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer_size: 10000,
            output: TraceOutput::None,
            json_format: false,
            category_filter: Vec::new(),
        }
    }
}

impl TracerConfig {
    /// Creates a new tracer configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to enable tracing.
    #[must_use]
    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Builder method to set buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Builder method to output to stderr.
    #[must_use]
    pub fn to_stderr(mut self) -> Self {
        self.output = TraceOutput::Stderr;
        self
    }

    /// Builder method to forward to the `tracing` subscriber.
    #[must_use]
    pub fn to_log(mut self) -> Self {
        self.output = TraceOutput::Log;
        self
    }

    /// Builder method to use JSON format.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Builder method to record only some categories.
    #[must_use]
    pub fn filter_categories(mut self, categories: Vec<EventCategory>) -> Self {
        self.category_filter = categories;
        self
    }
}

// =============================================================================
// Tracer
// =============================================================================

/// Records resolution events.
///
/// Resolution reports events through a shared reference, so the tracer
/// keeps its buffer behind a `RefCell`. Recording is skipped entirely when
/// the tracer is disabled.
pub struct Tracer {
    config: TracerConfig,
    enabled: Cell<bool>,
    buffer: RefCell<TraceBuffer>,
    iteration: Cell<u32>,
    start_time: Instant,
    human_formatter: HumanFormatter,
    json_formatter: JsonFormatter,
}

impl Tracer {
    /// Creates a new tracer with the given configuration.
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        Self {
            enabled: Cell::new(config.enabled),
            buffer: RefCell::new(TraceBuffer::new(config.buffer_size)),
            config,
            iteration: Cell::new(0),
            start_time: Instant::now(),
            human_formatter: HumanFormatter::new().with_timestamps(),
            json_formatter: JsonFormatter::new(),
        }
    }

    /// Creates a tracer with default configuration (disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(TracerConfig::default())
    }

    /// Creates an enabled tracer that outputs to stderr.
    #[must_use]
    pub fn to_stderr() -> Self {
        Self::new(TracerConfig::new().enabled().to_stderr())
    }

    /// Returns whether tracing is enabled.
    #[must_use]
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Enables tracing.
    pub fn enable(&self) {
        self.enabled.set(true);
    }

    /// Disables tracing.
    pub fn disable(&self) {
        self.enabled.set(false);
    }

    /// Returns the iteration of the most recent event.
    #[must_use]
    pub fn current_iteration(&self) -> u32 {
        self.iteration.get()
    }

    /// Records a resolution event.
    #[inline]
    pub fn record(&self, event: &ResolutionEvent) {
        if !self.is_enabled() {
            return;
        }
        self.record_internal(event);
    }

    fn record_internal(&self, event: &ResolutionEvent) {
        match event {
            ResolutionEvent::Started { .. } => self.iteration.set(0),
            ResolutionEvent::IterationStarted { iteration } => self.iteration.set(*iteration),
            _ => {}
        }
        if !self.config.category_filter.is_empty()
            && !self.config.category_filter.contains(&category(event))
        {
            return;
        }

        #[allow(clippy::cast_possible_truncation)]
        let timestamp_ns = self.start_time.elapsed().as_nanos() as u64;
        let mut buffer = self.buffer.borrow_mut();
        buffer.push(self.iteration.get(), timestamp_ns, event.clone());

        if self.config.output == TraceOutput::None {
            return;
        }
        if let Some(record) = buffer.last() {
            let line = self.format_record(record);
            match self.config.output {
                TraceOutput::Stderr => {
                    let _ = writeln!(io::stderr(), "{line}");
                }
                TraceOutput::Log => {
                    tracing::debug!(target: "deduce::trace", event = record.event_type(), "{line}");
                }
                TraceOutput::None => {}
            }
        }
    }

    /// Formats a record using the current format settings.
    #[must_use]
    pub fn format_record(&self, record: &TraceRecord) -> String {
        if self.config.json_format {
            self.json_formatter.format(record)
        } else {
            self.human_formatter.format(record)
        }
    }

    /// Formats every buffered record.
    #[must_use]
    pub fn format_all(&self) -> String {
        let buffer = self.buffer.borrow();
        let records: Vec<_> = buffer.iter().collect();
        if self.config.json_format {
            self.json_formatter.format_many(&records)
        } else {
            self.human_formatter.format_many(&records)
        }
    }

    /// Returns the trace buffer.
    #[must_use]
    pub fn buffer(&self) -> Ref<'_, TraceBuffer> {
        self.buffer.borrow()
    }

    /// Clears the trace buffer.
    pub fn clear(&self) {
        self.buffer.borrow_mut().clear();
    }

    /// Returns buffer statistics.
    #[must_use]
    pub fn stats(&self) -> TraceBufferStats {
        self.buffer.borrow().stats()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Observer for Tracer {
    fn on_event(&self, event: &ResolutionEvent) {
        self.record(event);
    }
}

// =============================================================================
// Tests
// =============================================================================
