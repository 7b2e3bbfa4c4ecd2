//! Core types for deduce.
//!
//! This crate provides:
//! - [`Label`] - Schema type labels, optionally scoped (role types)
//! - [`Value`] - Attribute values and their [`ValueType`]
//! - [`Concept`] - Opaque handles to stored or inferred data
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod concept;
pub mod error;
pub mod label;
pub mod value;

pub use concept::{Concept, ThingId};
pub use error::{Error, ErrorContext, ErrorKind, Result, SemanticLimit};
pub use label::Label;
pub use value::{Value, ValueType};
