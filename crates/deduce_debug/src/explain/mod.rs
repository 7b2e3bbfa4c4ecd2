//! Explanations of answers.
//!
//! - [`WhyQuery`] - The chain of rules behind one answer
//! - [`render`] - The whole deduction tree as indented text
//! - [`summarize`] - Rules used, lookups and depth

pub mod tree;
pub mod why;

pub use tree::{ExplanationSummary, render, summarize};
pub use why::{DerivationChain, DerivationStep, WhyQuery, WhyResult};
