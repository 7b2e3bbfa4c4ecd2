//! Unification of query concludables with rule head variants.
//!
//! A unifier maps each query reference to the head references it stands
//! for. The query to head direction is authoritative: rules fire through
//! it, and [`Unifier::ununify`] maps the resulting conclusions back.
//! [`Unifier::inverse`] gives the head to query view.
//!
//! A head variant is only compatible with a query if, in every optional
//! slot (a type, a value, a role), it is exactly as specific as the less
//! specific of the query and the original head. Each slot choice of the
//! query is therefore matched by exactly one variant, and what the query
//! asks for beyond the head is recorded as [`Requirements`] and checked on
//! the concluded facts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use deduce_foundation::Label;

use crate::answer::ConceptMap;
use crate::concludable::{Concludable, Renaming};
use crate::generalize::HeadConcludable;
use crate::pattern::{Constraint, Operand, Predicate, Reference, RolePlayer, hints_intersect};

/// Query reference to head references.
pub type Mapping = BTreeMap<Reference, BTreeSet<Reference>>;

// =============================================================================
// Requirements
// =============================================================================

/// What the query asks of a concluded fact beyond what the head states.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Requirements {
    /// Types a query reference may be bound to. An empty set admits any.
    pub types: BTreeMap<Reference, BTreeSet<Label>>,
    /// Value comparisons a query reference must pass.
    pub predicates: BTreeMap<Reference, Vec<(Predicate, Operand)>>,
}

impl Requirements {
    /// Returns true if `answer` (in query space) meets every requirement on
    /// the references it binds.
    #[must_use]
    pub fn satisfied_by(&self, answer: &ConceptMap) -> bool {
        let types_ok = self.types.iter().all(|(reference, labels)| {
            answer
                .get(reference)
                .is_none_or(|c| labels.is_empty() || labels.contains(c.type_label()))
        });
        types_ok
            && self.predicates.iter().all(|(reference, predicates)| {
                let Some(concept) = answer.get(reference) else {
                    return true;
                };
                let Some(value) = concept.value() else {
                    return false;
                };
                predicates.iter().all(|(predicate, operand)| match operand {
                    Operand::Literal(literal) => predicate.evaluate(value, literal),
                    Operand::Variable(other) => answer
                        .get(other)
                        .and_then(|c| c.value())
                        .is_none_or(|other| predicate.evaluate(value, other)),
                })
            })
    }

    fn is_empty(&self) -> bool {
        self.types.is_empty() && self.predicates.is_empty()
    }
}

// =============================================================================
// Unifier
// =============================================================================

/// A mapping from query references to rule head references, with the
/// requirements concluded facts must meet.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Unifier {
    mapping: Mapping,
    requirements: Requirements,
}

impl Unifier {
    /// Creates a unifier from its parts.
    #[must_use]
    pub fn new(mapping: Mapping, requirements: Requirements) -> Self {
        Self {
            mapping,
            requirements,
        }
    }

    /// Query reference to head references.
    #[must_use]
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Requirements on concluded facts.
    #[must_use]
    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    /// The head to query view of the mapping.
    #[must_use]
    pub fn inverse(&self) -> Mapping {
        let mut inverse = Mapping::new();
        for (query, heads) in &self.mapping {
            for head in heads {
                inverse
                    .entry(head.clone())
                    .or_default()
                    .insert(query.clone());
            }
        }
        inverse
    }

    /// Translates a partial query-space answer into head space.
    ///
    /// Returns `None` if two query bindings land on one head reference with
    /// different concepts, or a binding contradicts a head label.
    #[must_use]
    pub fn unify_answer(&self, answer: &ConceptMap) -> Option<ConceptMap> {
        let mut unified = ConceptMap::new();
        for (query, heads) in &self.mapping {
            let Some(concept) = answer.get(query) else {
                continue;
            };
            for head in heads {
                if let Some(label) = head.as_label()
                    && concept.type_label() != label
                {
                    return None;
                }
                if unified.get(head).is_some_and(|bound| bound != concept) {
                    return None;
                }
                unified.insert(head.clone(), concept.clone());
            }
        }
        Some(unified)
    }

    /// Translates a head-space conclusion into an answer for the query.
    ///
    /// Returns `None` if a query reference mapped to several head references
    /// would be bound to different concepts, or the conclusion misses a
    /// requirement.
    #[must_use]
    pub fn ununify(&self, conclusion: &ConceptMap) -> Option<ConceptMap> {
        let mut answer = ConceptMap::new();
        for (query, heads) in &self.mapping {
            let mut bound = heads.iter().filter_map(|head| conclusion.get(head));
            let Some(first) = bound.next() else {
                continue;
            };
            if bound.any(|other| other != first) {
                return None;
            }
            answer.insert(query.clone(), first.clone());
        }
        self.requirements.satisfied_by(&answer).then_some(answer)
    }

    /// Renames the query side.
    #[must_use]
    pub fn rename_query(&self, renaming: &Renaming) -> Self {
        let rename = |r: &Reference| renaming.get(r).unwrap_or(r).clone();
        let mapping = self
            .mapping
            .iter()
            .map(|(query, heads)| (rename(query), heads.clone()))
            .collect();
        let types = self
            .requirements
            .types
            .iter()
            .map(|(r, labels)| (rename(r), labels.clone()))
            .collect();
        let predicates = self
            .requirements
            .predicates
            .iter()
            .map(|(r, predicates)| {
                let predicates = predicates
                    .iter()
                    .map(|(p, operand)| match operand {
                        Operand::Variable(other) => (*p, Operand::Variable(rename(other))),
                        Operand::Literal(_) => (*p, operand.clone()),
                    })
                    .collect();
                (rename(r), predicates)
            })
            .collect();
        Self {
            mapping,
            requirements: Requirements { types, predicates },
        }
    }
}

impl fmt::Display for Unifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (query, heads)) in self.mapping.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{query} -> [")?;
            for (j, head) in heads.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{head}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "}}")?;
        if !self.requirements.is_empty() {
            write!(f, " with requirements")?;
        }
        Ok(())
    }
}

// =============================================================================
// Specificity Levels
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Absent,
    Placeholder,
    Concrete,
}

fn type_level(ty: Option<&Reference>) -> Level {
    match ty {
        None => Level::Absent,
        Some(ty) if ty.is_label() => Level::Concrete,
        Some(_) => Level::Placeholder,
    }
}

fn values_level(values: &[(Predicate, &Operand)]) -> Level {
    if values.is_empty() {
        Level::Absent
    } else if values
        .iter()
        .any(|(_, operand)| matches!(operand, Operand::Literal(_)))
    {
        Level::Concrete
    } else {
        Level::Placeholder
    }
}

/// The isa on `owner`, whether it is the main constraint or context.
fn isa_of<'a>(concludable: &'a Concludable, owner: &Reference) -> Option<&'a Constraint> {
    match concludable.constraint() {
        main @ Constraint::Isa { owner: o, .. } if o == owner => Some(main),
        _ => concludable.context_isa(owner),
    }
}

fn isa_type<'a>(concludable: &'a Concludable, owner: &Reference) -> Option<&'a Reference> {
    match isa_of(concludable, owner) {
        Some(Constraint::Isa { ty, .. }) => Some(ty),
        _ => None,
    }
}

/// Value comparisons on `owner`, from the main constraint and the context.
fn values_on<'a>(concludable: &'a Concludable, owner: &'a Reference) -> Vec<(Predicate, &'a Operand)> {
    std::iter::once(concludable.constraint())
        .chain(concludable.context_values(owner))
        .filter_map(|c| match c {
            Constraint::Value {
                owner: o,
                predicate,
                operand,
            } if o == owner => Some((*predicate, operand)),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Unification
// =============================================================================

/// Pairs one query concludable with one head variant.
struct Pairing<'a> {
    query: &'a Concludable,
    head: &'a HeadConcludable,
}

impl Pairing<'_> {
    fn hints_meet(&self, query: &Reference, head: &Reference) -> bool {
        hints_intersect(&self.query.hints(query), &self.head.hints(head))
    }

    /// Maps a thing reference pair after checking its type and value slots.
    fn thing(&self, query: &Reference, head: &Reference, mapping: &mut Mapping) -> bool {
        if !self.hints_meet(query, head)
            || !self.types(query, head, mapping)
            || !self.values(query, head, mapping)
        {
            return false;
        }
        if !query.is_label() {
            mapping
                .entry(query.clone())
                .or_default()
                .insert(self.head.resolve(head).clone());
        }
        true
    }

    fn types(&self, query: &Reference, head: &Reference, mapping: &mut Mapping) -> bool {
        let query_ty = isa_type(self.query, query);
        let head_ty = isa_type(self.head, head);
        let base_ty = isa_type(self.head.base(), head);
        self.type_slot(query_ty, head_ty, base_ty, mapping)
    }

    fn type_slot(
        &self,
        query_ty: Option<&Reference>,
        head_ty: Option<&Reference>,
        base_ty: Option<&Reference>,
        mapping: &mut Mapping,
    ) -> bool {
        let expected = type_level(query_ty).min(type_level(base_ty));
        if type_level(head_ty) != expected {
            return false;
        }
        let (Some(query_ty), Some(head_ty)) = (query_ty, head_ty) else {
            return true;
        };
        let query_hints = self.query.hints(query_ty);
        let head_hints = self.head.hints(head_ty);
        match expected {
            Level::Concrete if query_hints.is_empty() || head_hints.is_empty() => {
                query_ty == head_ty
            }
            Level::Concrete => hints_intersect(&query_hints, &head_hints),
            Level::Placeholder => {
                if !hints_intersect(&query_hints, &head_hints) {
                    return false;
                }
                if query_ty.is_name() {
                    mapping
                        .entry(query_ty.clone())
                        .or_default()
                        .insert(self.head.resolve(head_ty).clone());
                }
                true
            }
            Level::Absent => true,
        }
    }

    fn values(&self, query: &Reference, head: &Reference, mapping: &mut Mapping) -> bool {
        let query_values = values_on(self.query, query);
        let head_values = values_on(self.head, head);
        let base_values = values_on(self.head.base(), head);
        let expected = values_level(&query_values).min(values_level(&base_values));
        if values_level(&head_values) != expected {
            return false;
        }
        match expected {
            Level::Absent => true,
            Level::Concrete | Level::Placeholder => {
                query_values.iter().all(|(predicate, operand)| match operand {
                    Operand::Literal(literal) => head_values.iter().all(|(head_predicate, head_operand)| {
                        match head_operand {
                            Operand::Literal(head_literal) if *head_predicate == Predicate::Eq => {
                                predicate.evaluate(head_literal, literal)
                            }
                            _ => true,
                        }
                    }),
                    Operand::Variable(other) => {
                        if !predicate.admits_equality() {
                            return false;
                        }
                        if other.is_name() {
                            mapping
                                .entry(other.clone())
                                .or_default()
                                .insert(self.head.resolve(head).clone());
                        }
                        true
                    }
                })
            }
        }
    }

    fn role(&self, query: &RolePlayer, head: &RolePlayer, base: &RolePlayer, mapping: &mut Mapping) -> bool {
        if !hints_intersect(&query.role_hints, &head.role_hints) {
            return false;
        }
        self.type_slot(
            query.role_type.as_ref(),
            head.role_type.as_ref(),
            base.role_type.as_ref(),
            mapping,
        )
    }

    /// Extends `mapping` with every complete assignment of query role
    /// players to distinct head role players.
    fn assign(
        &self,
        query: &[RolePlayer],
        head: &[RolePlayer],
        base: &[RolePlayer],
        used: &mut [bool],
        mapping: &Mapping,
        out: &mut Vec<Mapping>,
    ) {
        let Some((first, rest)) = query.split_first() else {
            out.push(mapping.clone());
            return;
        };
        for j in 0..head.len() {
            if used[j] {
                continue;
            }
            let mut attempt = mapping.clone();
            if self.role(first, &head[j], &base[j], &mut attempt)
                && self.thing(&first.player, &head[j].player, &mut attempt)
            {
                used[j] = true;
                self.assign(rest, head, base, used, &attempt, out);
                used[j] = false;
            }
        }
    }

    fn mappings(&self) -> Vec<Mapping> {
        let mut mapping = Mapping::new();
        match (self.query.constraint(), self.head.constraint()) {
            // the main type of an isa is matched as the owner's type slot
            (Constraint::Isa { owner: q, .. }, Constraint::Isa { owner: h, .. })
            | (Constraint::Value { owner: q, .. }, Constraint::Value { owner: h, .. }) => {
                if self.thing(q, h, &mut mapping) {
                    vec![mapping]
                } else {
                    Vec::new()
                }
            }
            (
                Constraint::Has {
                    owner: q,
                    attribute: q_attribute,
                },
                Constraint::Has {
                    owner: h,
                    attribute: h_attribute,
                },
            ) => {
                if self.thing(q, h, &mut mapping) && self.thing(q_attribute, h_attribute, &mut mapping) {
                    vec![mapping]
                } else {
                    Vec::new()
                }
            }
            (
                Constraint::Relation {
                    owner: q,
                    role_players: query_players,
                },
                Constraint::Relation {
                    owner: h,
                    role_players: head_players,
                },
            ) => {
                let Constraint::Relation {
                    role_players: base_players,
                    ..
                } = self.head.base().constraint()
                else {
                    return Vec::new();
                };
                if query_players.len() > head_players.len() || !self.thing(q, h, &mut mapping) {
                    return Vec::new();
                }
                let mut used = vec![false; head_players.len()];
                let mut out = Vec::new();
                self.assign(query_players, head_players, base_players, &mut used, &mapping, &mut out);
                out
            }
            _ => Vec::new(),
        }
    }

    fn requirements(&self, mapping: &Mapping) -> Requirements {
        let mut requirements = Requirements::default();
        for query in mapping.keys() {
            if let Some(Constraint::Isa { ty, explicit, .. }) = isa_of(self.query, query) {
                let hints = self.query.hints(ty);
                let labels = match ty.as_label() {
                    Some(label) if *explicit || hints.is_empty() => BTreeSet::from([label.clone()]),
                    _ => hints,
                };
                if !labels.is_empty() {
                    requirements.types.insert(query.clone(), labels);
                }
            }
            let predicates: Vec<(Predicate, Operand)> = values_on(self.query, query)
                .into_iter()
                .map(|(predicate, operand)| (predicate, operand.clone()))
                .collect();
            if !predicates.is_empty() {
                requirements.predicates.insert(query.clone(), predicates);
            }
        }
        requirements
    }
}

/// Computes every way `query` unifies with the head variant `head`.
///
/// An empty result means this variant is irrelevant to the query.
pub fn unify<'a>(query: &'a Concludable, head: &'a HeadConcludable) -> impl Iterator<Item = Unifier> + 'a {
    let pairing = Pairing { query, head };
    let mappings = if query.kind() == head.kind() {
        pairing.mappings()
    } else {
        Vec::new()
    };
    mappings.into_iter().map(move |mapping| {
        let requirements = pairing.requirements(&mapping);
        Unifier::new(mapping, requirements)
    })
}
