//! Deductive reasoning core for deduce.
//!
//! This crate provides:
//! - [`pattern`] - Constraints, conjunctions and a builder for writing them
//! - [`Concludable`] - Atomic units of inference extracted from patterns
//! - [`Rule`] - Validated rules with generalized heads
//! - [`Unifier`] - Query to rule head mappings
//! - [`ConclusionBuilder`] - Facts concluded from rule bodies
//! - [`AnswerCache`] - Memoized answer streams for recursive resolution
//! - [`Reasoner`] - Query resolution with explanations

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod answer;
pub mod cache;
pub mod concludable;
pub mod conclusion;
pub mod config;
pub mod generalize;
pub mod matcher;
pub mod observer;
pub mod pattern;
pub mod resolver;
pub mod rule;
pub mod storage;
pub mod typing;
pub mod unify;

pub use answer::{Answer, ConceptMap, Explanation};
pub use cache::{AnswerCache, AnswerStream};
pub use concludable::{Concludable, ConjunctionConcludable, Fingerprint, extract};
pub use conclusion::{AttributeFact, ConclusionBuilder, Fact};
pub use config::ReasonerConfig;
pub use generalize::{HeadConcludable, generalize};
pub use matcher::Matcher;
pub use observer::{Observer, ResolutionEvent};
pub use resolver::{Answers, Reasoner};
pub use rule::Rule;
pub use storage::{GraphStorage, Storage};
pub use typing::TypeHinter;
pub use unify::{Requirements, Unifier, unify};
