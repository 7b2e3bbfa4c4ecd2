//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Label, Value, Concept and Error.

mod errors;
mod values;
