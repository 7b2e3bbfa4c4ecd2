//! Lookup of conjunctions over stored facts.
//!
//! [`Matcher`] walks the constraints depth first over a snapshot of the
//! graph and yields one answer at a time. Inferred things and ownerships
//! are invisible to it.

use std::collections::BTreeMap;
use std::vec;

use deduce_foundation::{Concept, Label, Result, ThingId};
use deduce_storage::{Graph, Thing, TypeKind};

use crate::answer::ConceptMap;
use crate::pattern::{Conjunction, Constraint, Operand, Predicate, Reference, RolePlayer, Variable};

type Bindings = BTreeMap<Reference, Concept>;

/// Lazy stream of the answers of a conjunction over stored facts.
///
/// Answers bind every named and anonymous variable.
pub struct Matcher {
    graph: Graph,
    variables: BTreeMap<Reference, Variable>,
    steps: Vec<Constraint>,
    /// Each frame holds the candidate bindings for the constraints before
    /// its step.
    stack: Vec<(usize, vec::IntoIter<Bindings>)>,
}

impl Matcher {
    /// Starts matching `pattern` against `graph`.
    #[must_use]
    pub fn new(graph: Graph, pattern: &Conjunction) -> Self {
        let mut steps = pattern.constraints().to_vec();
        steps.sort_by_key(Constraint::kind);
        Self {
            graph,
            variables: pattern.variables().clone(),
            steps,
            stack: vec![(0, vec![Bindings::new()].into_iter())],
        }
    }

    fn extend(&self, step: &Constraint, bindings: &Bindings) -> Vec<Bindings> {
        match step {
            Constraint::Relation {
                owner,
                role_players,
            } => self.match_relation(owner, role_players, bindings),
            Constraint::Has { owner, attribute } => self.match_has(owner, attribute, bindings),
            Constraint::Isa { owner, ty, explicit } => self.match_isa(owner, ty, *explicit, bindings),
            Constraint::Value {
                owner,
                predicate,
                operand,
            } => self.match_value(owner, *predicate, operand, bindings),
        }
    }

    // =========================================================================
    // Candidates
    // =========================================================================

    fn stored(&self) -> impl Iterator<Item = &Thing> {
        self.graph.things().filter(|thing| !thing.inferred)
    }

    fn stored_thing(&self, id: ThingId) -> Option<&Thing> {
        self.graph.thing(id).filter(|thing| !thing.inferred)
    }

    fn bound_thing(&self, reference: &Reference, bindings: &Bindings) -> Option<ThingId> {
        bindings.get(reference).and_then(Concept::thing_id)
    }

    /// Stored things a variable may be bound to, narrowed by its hints.
    fn candidates(&self, reference: &Reference, kind: impl Fn(TypeKind) -> bool) -> Vec<&Thing> {
        let hints = self
            .variables
            .get(reference)
            .map(|v| &v.hints)
            .filter(|hints| !hints.is_empty());
        match hints {
            Some(hints) => hints
                .iter()
                .flat_map(|label| self.graph.instances_of(label))
                .filter(|thing| !thing.inferred)
                .collect(),
            None => self
                .stored()
                .filter(|thing| self.graph.schema().kind(&thing.type_label).is_some_and(&kind))
                .collect(),
        }
    }

    // =========================================================================
    // Steps
    // =========================================================================

    fn match_relation(&self, owner: &Reference, role_players: &[RolePlayer], bindings: &Bindings) -> Vec<Bindings> {
        let relations: Vec<ThingId> = if let Some(id) = self.bound_thing(owner, bindings) {
            vec![id]
        } else if let Some(player) = role_players
            .iter()
            .find_map(|rp| self.bound_thing(&rp.player, bindings))
        {
            self.graph.relations_of(player).collect()
        } else {
            self.candidates(owner, |kind| kind == TypeKind::Relation)
                .iter()
                .map(|thing| thing.id)
                .collect()
        };

        let mut results = Vec::new();
        for id in relations {
            let Some(relation) = self.stored_thing(id) else {
                continue;
            };
            let mut start = bindings.clone();
            if !bind(&mut start, owner, relation.concept()) {
                continue;
            }
            let edges: Vec<_> = self.graph.role_players(id).cloned().collect();
            let mut used = vec![false; edges.len()];
            self.assign_role_players(role_players, &edges, &mut used, start, &mut results);
        }
        results
    }

    /// Assigns query role players to distinct edges of one relation.
    fn assign_role_players(
        &self,
        role_players: &[RolePlayer],
        edges: &[deduce_storage::RolePlayer],
        used: &mut [bool],
        bindings: Bindings,
        results: &mut Vec<Bindings>,
    ) {
        let Some((first, rest)) = role_players.split_first() else {
            results.push(bindings);
            return;
        };
        for (i, edge) in edges.iter().enumerate() {
            if used[i] {
                continue;
            }
            let Some(player) = self.stored_thing(edge.player) else {
                continue;
            };
            let mut attempt = bindings.clone();
            if !self.role_matches(first, &edge.role, &mut attempt)
                || !bind(&mut attempt, &first.player, player.concept())
            {
                continue;
            }
            used[i] = true;
            self.assign_role_players(rest, edges, used, attempt, results);
            used[i] = false;
        }
    }

    fn role_matches(&self, rp: &RolePlayer, role: &Label, bindings: &mut Bindings) -> bool {
        if !rp.role_hints.is_empty() && !rp.role_hints.contains(role) {
            return false;
        }
        match &rp.role_type {
            None => true,
            Some(Reference::Label(label)) => {
                label == role
                    || (!label.is_scoped() && label.name() == role.name())
                    || self
                        .variables
                        .get(&Reference::Label(label.clone()))
                        .is_some_and(|v| v.hints.contains(role))
            }
            Some(variable) => bind(bindings, variable, Concept::Type(role.clone())),
        }
    }

    fn match_has(&self, owner: &Reference, attribute: &Reference, bindings: &Bindings) -> Vec<Bindings> {
        let pairs: Vec<(ThingId, ThingId)> = match (
            self.bound_thing(owner, bindings),
            self.bound_thing(attribute, bindings),
        ) {
            (Some(o), Some(a)) => vec![(o, a)],
            (Some(o), None) => self.graph.attributes_of(o).map(|(a, _)| (o, a)).collect(),
            (None, Some(a)) => self.graph.owners_of(a).map(|o| (o, a)).collect(),
            (None, None) => self
                .candidates(owner, |_| true)
                .iter()
                .flat_map(|thing| self.graph.attributes_of(thing.id).map(|(a, _)| (thing.id, a)))
                .collect(),
        };

        pairs
            .into_iter()
            .filter(|(o, a)| self.graph.ownership(*o, *a) == Some(false))
            .filter_map(|(o, a)| {
                let mut extended = bindings.clone();
                let owner_thing = self.stored_thing(o)?;
                let attribute_thing = self.stored_thing(a)?;
                (bind(&mut extended, owner, owner_thing.concept())
                    && bind(&mut extended, attribute, attribute_thing.concept()))
                .then_some(extended)
            })
            .collect()
    }

    fn match_isa(&self, owner: &Reference, ty: &Reference, explicit: bool, bindings: &Bindings) -> Vec<Bindings> {
        let things: Vec<&Thing> = match self.bound_thing(owner, bindings) {
            // Already bound - only check its type
            Some(id) => self.stored_thing(id).into_iter().collect(),
            None => self.candidates(owner, |_| true),
        };

        let mut results = Vec::new();
        for thing in things {
            let mut extended = bindings.clone();
            let accepted = match ty {
                Reference::Label(label) => self.type_accepts(label, &thing.type_label, explicit),
                _ => match extended.get(ty) {
                    Some(Concept::Type(label)) => self.type_accepts(label, &thing.type_label, explicit),
                    Some(Concept::Thing { .. }) => false,
                    None => {
                        extended.insert(ty.clone(), Concept::Type(thing.type_label.clone()));
                        true
                    }
                },
            };
            if accepted && bind(&mut extended, owner, thing.concept()) {
                results.push(extended);
            }
        }
        results
    }

    fn type_accepts(&self, ty: &Label, actual: &Label, explicit: bool) -> bool {
        if explicit {
            ty == actual
        } else {
            self.graph.schema().is_subtype_of(actual, ty)
        }
    }

    fn match_value(&self, owner: &Reference, predicate: Predicate, operand: &Operand, bindings: &Bindings) -> Vec<Bindings> {
        let is_attribute = |kind: TypeKind| matches!(kind, TypeKind::Attribute(_));
        let owners: Vec<&Thing> = match self.bound_thing(owner, bindings) {
            Some(id) => self.stored_thing(id).into_iter().collect(),
            None => self.candidates(owner, is_attribute),
        };

        let mut results = Vec::new();
        for thing in owners {
            let Some(value) = &thing.value else {
                continue;
            };
            let mut extended = bindings.clone();
            if !bind(&mut extended, owner, thing.concept()) {
                continue;
            }
            match operand {
                Operand::Literal(literal) => {
                    if predicate.evaluate(value, literal) {
                        results.push(extended);
                    }
                }
                Operand::Variable(other) => match extended.get(other).and_then(Concept::value) {
                    Some(other_value) => {
                        if predicate.evaluate(value, other_value) {
                            results.push(extended);
                        }
                    }
                    // Unbound operand - enumerate the attributes it could be
                    None => {
                        for candidate in self.candidates(other, is_attribute) {
                            let Some(candidate_value) = &candidate.value else {
                                continue;
                            };
                            let mut with_other = extended.clone();
                            if predicate.evaluate(value, candidate_value)
                                && bind(&mut with_other, other, candidate.concept())
                            {
                                results.push(with_other);
                            }
                        }
                    }
                },
            }
        }
        results
    }
}

impl Iterator for Matcher {
    type Item = Result<ConceptMap>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, frame) = self.stack.last_mut()?;
            let depth = *depth;
            let Some(bindings) = frame.next() else {
                self.stack.pop();
                continue;
            };
            let Some(step) = self.steps.get(depth) else {
                let answer = bindings
                    .into_iter()
                    .filter(|(reference, _)| reference.is_name() || reference.is_anonymous())
                    .collect();
                return Some(Ok(answer));
            };
            let extensions = self.extend(step, &bindings);
            self.stack.push((depth + 1, extensions.into_iter()));
        }
    }
}

/// Binds `reference` to `concept`, or checks an existing binding agrees.
fn bind(bindings: &mut Bindings, reference: &Reference, concept: Concept) -> bool {
    match bindings.get(reference) {
        Some(existing) => *existing == concept,
        None => {
            bindings.insert(reference.clone(), concept);
            true
        }
    }
}
