//! Turning a fired rule into a concrete fact.
//!
//! [`ConclusionBuilder::build`] instantiates the rule head with the body
//! answer. [`ConclusionBuilder::materialize`] inserts the fact and returns
//! the head-space bindings the unifier maps back to the query. Head
//! references the body does not bind take their type and value from the
//! head's own isa and value constraints.

use std::collections::BTreeSet;
use std::fmt;

use deduce_foundation::{Concept, Error, ErrorContext, Label, Result, ThingId, Value};
use deduce_storage::Schema;

use crate::answer::ConceptMap;
use crate::pattern::{Conjunction, Constraint, Operand, Predicate, Reference};
use crate::rule::Rule;
use crate::storage::Storage;

// =============================================================================
// Facts
// =============================================================================

/// The attribute side of a concluded ownership.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttributeFact {
    /// An attribute the body bound.
    Existing(ThingId),
    /// An attribute given by type and value in the rule head.
    New {
        /// Attribute type.
        attribute_type: Label,
        /// Attribute value.
        value: Value,
    },
}

/// A fully instantiated rule conclusion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Fact {
    /// A relation of the given type between the given players.
    Relation {
        /// Relation type.
        relation_type: Label,
        /// Scoped role and player, in head order.
        role_players: Vec<(Label, ThingId)>,
    },
    /// An ownership.
    Has {
        /// The owner.
        owner: ThingId,
        /// The owned attribute.
        attribute: AttributeFact,
    },
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relation {
                relation_type,
                role_players,
            } => {
                write!(f, "(")?;
                for (i, (role, player)) in role_players.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {player}", role.name())?;
                }
                write!(f, ") isa {relation_type}")
            }
            Self::Has { owner, attribute } => match attribute {
                AttributeFact::Existing(id) => write!(f, "{owner} has {id}"),
                AttributeFact::New {
                    attribute_type,
                    value,
                } => write!(f, "{owner} has {attribute_type} {value}"),
            },
        }
    }
}

// =============================================================================
// Conclusion Builder
// =============================================================================

/// Builds and materializes rule conclusions.
pub struct ConclusionBuilder;

impl ConclusionBuilder {
    /// Instantiates the head of `rule` with a body answer.
    ///
    /// # Errors
    ///
    /// Returns `IllegalConcludable` if the head's types, roles or attribute
    /// value cannot be determined, and `Internal` if the body answer misses
    /// a head variable.
    pub fn build(rule: &Rule, body: &ConceptMap, schema: &Schema) -> Result<Fact> {
        let context = || ErrorContext::new().with_rule(rule.label().to_string());
        let then = rule.then();
        let conclusion = rule
            .conclusion()
            .ok_or_else(|| Error::internal("rule without conclusion").with_context(context()))?;

        match conclusion {
            Constraint::Relation {
                owner,
                role_players,
            } => {
                let relation_type = head_type(then, owner, body)
                    .ok_or_else(|| {
                        Error::illegal_concludable(format!("{owner} has no relation type"))
                            .with_context(context())
                    })?;
                let role_players = role_players
                    .iter()
                    .map(|rp| {
                        let role = match &rp.role_type {
                            Some(reference) => type_of(reference, body),
                            None => None,
                        }
                        .and_then(|role| resolve_role(schema, &relation_type, &role))
                        .or_else(|| single_role(schema, &rp.role_hints, &relation_type))
                        .ok_or_else(|| {
                            Error::illegal_concludable(format!(
                                "role of {} in {relation_type} is ambiguous",
                                rp.player
                            ))
                            .with_context(context())
                        })?;
                        Ok((role, bound_thing(&rp.player, body)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Fact::Relation {
                    relation_type,
                    role_players,
                })
            }
            Constraint::Has { owner, attribute } => {
                let owner = bound_thing(owner, body)?;
                if let Some(id) = body.get(attribute).and_then(Concept::thing_id) {
                    return Ok(Fact::Has {
                        owner,
                        attribute: AttributeFact::Existing(id),
                    });
                }
                let attribute_type = head_type(then, attribute, body).ok_or_else(|| {
                    Error::illegal_concludable(format!("{attribute} has no attribute type"))
                        .with_context(context())
                })?;
                let value = then
                    .values_of(attribute)
                    .find_map(|c| match c {
                        Constraint::Value {
                            predicate: Predicate::Eq,
                            operand: Operand::Literal(value),
                            ..
                        } => Some(value.clone()),
                        _ => None,
                    })
                    .ok_or_else(|| {
                        Error::illegal_concludable(format!("{attribute} has no value"))
                            .with_context(context())
                    })?;
                Ok(Fact::Has {
                    owner,
                    attribute: AttributeFact::New {
                        attribute_type,
                        value,
                    },
                })
            }
            Constraint::Isa { .. } | Constraint::Value { .. } => Err(Error::illegal_concludable(
                "rule conclusion is not a relation or ownership",
            )
            .with_context(context())),
        }
    }

    /// Inserts `fact` and returns the bindings of the rule head: the body
    /// answer, the concluded thing, and every type label of the head.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn materialize<S: Storage + ?Sized>(
        rule: &Rule,
        fact: &Fact,
        body: &ConceptMap,
        storage: &mut S,
    ) -> Result<ConceptMap> {
        let concluded = storage.insert(fact)?;
        let mut head = body.clone();

        for reference in rule.then().variables().keys() {
            if let Some(label) = reference.as_label() {
                head.insert(reference.clone(), Concept::Type(label.clone()));
            }
        }

        match (rule.conclusion(), fact) {
            (
                Some(Constraint::Relation {
                    owner,
                    role_players,
                }),
                Fact::Relation {
                    role_players: roles,
                    ..
                },
            ) => {
                head.insert(owner.clone(), concluded);
                for (rp, (role, _)) in role_players.iter().zip(roles) {
                    if let Some(reference) = &rp.role_type {
                        head.insert(reference.clone(), Concept::Type(role.clone()));
                    }
                }
            }
            (Some(Constraint::Has { attribute, .. }), Fact::Has { .. }) => {
                head.insert(attribute.clone(), concluded);
            }
            _ => {
                return Err(Error::internal(format!("fact {fact} does not match rule {}", rule.label())));
            }
        }
        Ok(head)
    }
}

/// Type of a head thing variable: its isa label, or the type its type
/// variable is bound to.
fn head_type(then: &Conjunction, owner: &Reference, body: &ConceptMap) -> Option<Label> {
    match then.isa_of(owner)? {
        Constraint::Isa { ty, .. } => type_of(ty, body),
        _ => None,
    }
}

fn type_of(reference: &Reference, body: &ConceptMap) -> Option<Label> {
    match reference {
        Reference::Label(label) => Some(label.clone()),
        _ => match body.get(reference)? {
            Concept::Type(label) => Some(label.clone()),
            Concept::Thing { .. } => None,
        },
    }
}

fn resolve_role(schema: &Schema, relation: &Label, role: &Label) -> Option<Label> {
    if role.is_scoped() {
        Some(role.clone())
    } else {
        schema.role(relation, role.name())
    }
}

/// The only role of `relation` the hints allow, if there is exactly one.
fn single_role(schema: &Schema, hints: &BTreeSet<Label>, relation: &Label) -> Option<Label> {
    let roles = schema.roles(relation);
    let mut candidates = roles
        .iter()
        .filter(|role| hints.is_empty() || hints.contains(*role));
    match (candidates.next(), candidates.next()) {
        (Some(role), None) => Some(role.clone()),
        _ => None,
    }
}

fn bound_thing(reference: &Reference, body: &ConceptMap) -> Result<ThingId> {
    body.get(reference)
        .and_then(Concept::thing_id)
        .ok_or_else(|| Error::internal(format!("{reference} is not bound to a thing by the rule body")))
}
