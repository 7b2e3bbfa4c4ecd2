//! Type hinting.
//!
//! Fills in the concrete types each variable of a conjunction may take, as
//! far as the schema tells. Hints drive the compatibility checks of
//! unification: two references whose hints are disjoint can never unify.

use std::collections::{BTreeMap, BTreeSet};

use deduce_foundation::{Error, Label, Result, Value, ValueType};
use deduce_storage::{Schema, TypeKind};
use tracing::debug;

use crate::pattern::{Conjunction, Constraint, Negation, Operand, Reference, Variable};

/// Assigns type hints from a schema.
#[derive(Clone, Copy, Debug)]
pub struct TypeHinter<'a> {
    schema: &'a Schema,
}

impl<'a> TypeHinter<'a> {
    /// Creates a hinter over `schema`.
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Returns a copy of `conjunction` with hints filled in.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedType` if a label is not in the schema.
    pub fn hint(&self, conjunction: &Conjunction) -> Result<Conjunction> {
        let mut hinted = conjunction.clone();
        self.hint_labels(hinted.variables_mut())?;

        let constraints = hinted.constraints().to_vec();
        for constraint in constraints.iter().filter(|c| matches!(c, Constraint::Isa { .. })) {
            self.hint_isa(hinted.variables_mut(), constraint);
        }
        let mut relations = Vec::new();
        for constraint in &constraints {
            match constraint {
                Constraint::Relation { .. } => relations.push(self.hint_relation(hinted.variables_mut(), constraint)),
                Constraint::Has { owner, attribute } => self.hint_has(hinted.variables_mut(), owner, attribute),
                Constraint::Value {
                    owner,
                    operand: Operand::Literal(value),
                    ..
                } => self.hint_value(hinted.variables_mut(), owner, value),
                Constraint::Isa { .. } | Constraint::Value { .. } => {}
            }
        }
        let mut relations = relations.into_iter();
        for constraint in hinted.constraints_mut() {
            if matches!(constraint, Constraint::Relation { .. })
                && let Some(hinted_relation) = relations.next()
            {
                *constraint = hinted_relation;
            }
        }

        let negations = conjunction
            .negations()
            .iter()
            .map(|negation| {
                Ok(Negation {
                    disjunction: negation
                        .disjunction
                        .iter()
                        .map(|branch| self.hint(branch))
                        .collect::<Result<_>>()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        *hinted.negations_mut() = negations;
        Ok(hinted)
    }

    fn hint_labels(&self, variables: &mut BTreeMap<Reference, Variable>) -> Result<()> {
        for variable in variables.values_mut() {
            let Some(label) = variable.reference.as_label().cloned() else {
                continue;
            };
            variable.hints = match self.schema.kind(&label) {
                Some(TypeKind::Role) => BTreeSet::from([label]),
                Some(TypeKind::Attribute(value_type)) => {
                    variable.value_type = Some(value_type);
                    self.schema.subtypes(&label)
                }
                Some(_) => self.schema.subtypes(&label),
                None if !label.is_scoped() => {
                    let roles = self.schema.roles_named(label.name());
                    if roles.is_empty() {
                        return Err(Error::unresolved_type(label));
                    }
                    roles
                }
                None => return Err(Error::unresolved_type(label)),
            };
        }
        Ok(())
    }

    fn hint_isa(&self, variables: &mut BTreeMap<Reference, Variable>, isa: &Constraint) {
        let Constraint::Isa { owner, ty, explicit } = isa else {
            return;
        };
        let allowed = match (ty.as_label(), explicit) {
            (Some(label), true) => BTreeSet::from([label.clone()]),
            _ => hints_of(variables, ty),
        };
        narrow(variables, owner, &allowed);
        // a type variable ranges over the owner's possible types
        if !ty.is_label() {
            let owner_hints = hints_of(variables, owner);
            narrow(variables, ty, &owner_hints);
        }
    }

    /// Returns the relation with role hints filled in.
    fn hint_relation(&self, variables: &mut BTreeMap<Reference, Variable>, relation: &Constraint) -> Constraint {
        let Constraint::Relation { owner, role_players } = relation else {
            return relation.clone();
        };
        let relation_types: BTreeSet<Label> = hints_of(variables, owner)
            .into_iter()
            .filter(|label| self.schema.kind(label) == Some(TypeKind::Relation))
            .collect();

        let mut hinted_players = Vec::with_capacity(role_players.len());
        for rp in role_players {
            let mut candidates = match &rp.role_type {
                Some(role) => hints_of(variables, role),
                None => BTreeSet::new(),
            };
            if candidates.is_empty() {
                candidates = relation_types
                    .iter()
                    .flat_map(|relation| self.schema.roles(relation))
                    .collect();
            }
            if !relation_types.is_empty() {
                candidates.retain(|role| {
                    !self
                        .schema
                        .relations_with_role(role)
                        .is_disjoint(&relation_types)
                });
            }

            let players: BTreeSet<Label> = candidates
                .iter()
                .flat_map(|role| self.schema.players(role))
                .collect();
            narrow(variables, &rp.player, &players);

            let mut hinted = rp.clone();
            hinted.role_hints = candidates;
            hinted_players.push(hinted);
        }

        for rp in &hinted_players {
            if rp.role_hints.is_empty() {
                continue;
            }
            let relations: BTreeSet<Label> = rp
                .role_hints
                .iter()
                .flat_map(|role| self.schema.relations_with_role(role))
                .collect();
            narrow(variables, owner, &relations);
        }

        Constraint::Relation {
            owner: owner.clone(),
            role_players: hinted_players,
        }
    }

    fn hint_has(&self, variables: &mut BTreeMap<Reference, Variable>, owner: &Reference, attribute: &Reference) {
        let mut attribute_types = hints_of(variables, attribute);
        if attribute_types.is_empty() {
            attribute_types = self.schema.attribute_types();
            narrow(variables, attribute, &attribute_types);
        }
        let owners: BTreeSet<Label> = attribute_types
            .iter()
            .flat_map(|attribute| self.schema.owners(attribute))
            .collect();
        narrow(variables, owner, &owners);
    }

    fn hint_value(&self, variables: &mut BTreeMap<Reference, Variable>, owner: &Reference, value: &Value) {
        let compatible: BTreeSet<Label> = self
            .schema
            .attribute_types()
            .into_iter()
            .filter(|label| {
                self.schema
                    .value_type(label)
                    .is_some_and(|value_type| comparable(value_type, value.value_type()))
            })
            .collect();
        narrow(variables, owner, &compatible);
    }
}

fn comparable(a: ValueType, b: ValueType) -> bool {
    let numeric = |t| matches!(t, ValueType::Long | ValueType::Double);
    a == b || (numeric(a) && numeric(b))
}

fn hints_of(variables: &BTreeMap<Reference, Variable>, reference: &Reference) -> BTreeSet<Label> {
    variables
        .get(reference)
        .map(|v| v.hints.clone())
        .unwrap_or_default()
}

/// Intersects the hints of `reference` with `allowed`. An empty `allowed`
/// carries no information. An empty intersection leaves the hints as they
/// were, so that the query simply finds no answers.
fn narrow(variables: &mut BTreeMap<Reference, Variable>, reference: &Reference, allowed: &BTreeSet<Label>) {
    if allowed.is_empty() {
        return;
    }
    let Some(variable) = variables.get_mut(reference) else {
        return;
    };
    if variable.hints.is_empty() {
        variable.hints = allowed.clone();
        return;
    }
    let narrowed: BTreeSet<Label> = variable.hints.intersection(allowed).cloned().collect();
    if narrowed.is_empty() {
        debug!(variable = %reference, "type hints are unsatisfiable, keeping previous hints");
    } else {
        variable.hints = narrowed;
    }
}
