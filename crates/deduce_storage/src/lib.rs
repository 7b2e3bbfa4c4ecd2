//! Schema and fact storage for deduce.
//!
//! This crate provides:
//! - [`Schema`] - Type hierarchy with roles, ownerships and players
//! - [`Graph`] - Persistent fact graph with stored and inferred facts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod graph;
pub mod schema;

pub use graph::{Graph, RolePlayer, Thing};
pub use schema::{Schema, TypeKind, TypeSchema};
