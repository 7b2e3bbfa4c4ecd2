//! Cross-layer integration tests for deduce
//!
//! Tests that resolve queries end to end over a graph with rules, and
//! inspect the results with the debug tools.
//!
//! Set `RUST_LOG=deduce_engine=trace` to see resolution logs.

mod fixtures;
mod locations;
mod negation;
mod observability;

/// Installs a test-writer subscriber once per test binary.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
