//! Integration tests for Layer 1: Storage
//!
//! Tests for the schema hierarchy and the fact graph.

mod graph;
mod schema;
