//! deduce - Deductive reasoning core for a typed graph database
//!
//! This crate re-exports all layers of the deduce system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: deduce_debug      — Resolution tracing, explanation rendering
//! Layer 2: deduce_engine     — Concludables, unification, answer cache, resolution
//! Layer 1: deduce_storage    — Schema and persistent fact graph
//! Layer 0: deduce_foundation — Core types (Label, Value, Concept, Error)
//! ```

pub use deduce_debug as debug;
pub use deduce_engine as engine;
pub use deduce_foundation as foundation;
pub use deduce_storage as storage;
