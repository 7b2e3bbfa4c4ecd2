//! Integration tests for Layer 2: Engine
//!
//! Tests for concludable extraction, head generalization, unification,
//! rule conclusions, and the answer cache.

mod cache;
mod concludables;
mod unification;
