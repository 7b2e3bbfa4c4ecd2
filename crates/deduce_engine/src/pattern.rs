//! The pattern model: references, typed variables, constraints and
//! conjunctions.
//!
//! Patterns are immutable values. Everything downstream (concludables,
//! rule heads, cache keys) copies what it needs out of a conjunction rather
//! than pointing into it.

pub mod conjunction;
pub mod constraint;
pub mod reference;
pub mod variable;

pub use conjunction::{Conjunction, ConjunctionBuilder, Negation};
pub use constraint::{Constraint, ConstraintKind, Operand, Predicate, RolePlayer};
pub use reference::Reference;
pub use variable::{Variable, VariableKind, hints_intersect};
