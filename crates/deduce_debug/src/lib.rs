//! Tracing and explanation tools for deduce.
//!
//! This crate provides:
//! - [`Tracer`] - An observer that records resolution events
//! - [`WhyQuery`] - Derivation chains behind answers
//! - [`explain::render`] - Deduction trees as text

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod explain;
pub mod trace;

pub use config::ObservabilityConfig;
pub use explain::{DerivationChain, ExplanationSummary, WhyQuery, WhyResult};
pub use trace::{Tracer, TracerConfig};
