//! Rule head generalization.
//!
//! A rule head is written at one level of detail, but queries can ask about
//! it at any level: with or without the types, values and roles the head
//! states. [`generalize`] produces every variant of a head concludable with
//! each optional piece kept, abstracted to a placeholder, or dropped. The
//! pieces vary independently, so the variants are the cartesian product of
//! the per-slot choices.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::concludable::Concludable;
use crate::pattern::{Constraint, Operand, Reference, Variable};

// =============================================================================
// Head Concludables
// =============================================================================

/// One generalized variant of a rule head concludable.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadConcludable {
    variant: Concludable,
    /// Placeholder references mapped back to the head reference they stand
    /// for.
    origin: BTreeMap<Reference, Reference>,
    base: Arc<Concludable>,
}

impl HeadConcludable {
    /// The ungeneralized head.
    #[must_use]
    pub fn base(&self) -> &Concludable {
        &self.base
    }

    /// Returns true for the variant identical to the head.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.variant == *self.base
    }

    /// Maps a variant reference to the head reference it stands for.
    #[must_use]
    pub fn resolve<'a>(&'a self, reference: &'a Reference) -> &'a Reference {
        self.origin.get(reference).unwrap_or(reference)
    }
}

impl Deref for HeadConcludable {
    type Target = Concludable;

    fn deref(&self) -> &Self::Target {
        &self.variant
    }
}

impl fmt::Display for HeadConcludable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variant)
    }
}

// =============================================================================
// Slots
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    ContextIsa(usize),
    ContextValue(usize),
    Role(usize),
    MainType,
    MainOperand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Toggle {
    AsIs,
    Placeholder,
    Absent,
}

fn slots(head: &Concludable) -> Vec<(Slot, Vec<Toggle>)> {
    use Toggle::{Absent, AsIs, Placeholder};

    let mut slots = Vec::new();
    match head.constraint() {
        Constraint::Isa { ty, .. } => {
            let options = if ty.is_label() {
                vec![AsIs, Placeholder]
            } else {
                vec![AsIs]
            };
            slots.push((Slot::MainType, options));
        }
        Constraint::Value {
            operand: Operand::Literal(_),
            ..
        } => slots.push((Slot::MainOperand, vec![AsIs, Placeholder])),
        Constraint::Relation { role_players, .. } => {
            for (i, rp) in role_players.iter().enumerate() {
                match &rp.role_type {
                    Some(role) if role.is_label() => {
                        slots.push((Slot::Role(i), vec![AsIs, Placeholder, Absent]));
                    }
                    Some(_) => slots.push((Slot::Role(i), vec![AsIs, Absent])),
                    None => {}
                }
            }
        }
        Constraint::Has { .. } | Constraint::Value { .. } => {}
    }

    for (i, constraint) in head.context().iter().enumerate() {
        match constraint {
            Constraint::Isa { ty, .. } if ty.is_label() => {
                slots.push((Slot::ContextIsa(i), vec![AsIs, Placeholder, Absent]));
            }
            Constraint::Isa { .. } => slots.push((Slot::ContextIsa(i), vec![AsIs, Absent])),
            Constraint::Value {
                operand: Operand::Literal(_),
                ..
            } => slots.push((Slot::ContextValue(i), vec![AsIs, Placeholder, Absent])),
            Constraint::Value { .. } => slots.push((Slot::ContextValue(i), vec![AsIs, Absent])),
            Constraint::Has { .. } | Constraint::Relation { .. } => {}
        }
    }
    slots
}

// =============================================================================
// Variant Construction
// =============================================================================

struct VariantBuilder<'a> {
    base: &'a Arc<Concludable>,
    origin: BTreeMap<Reference, Reference>,
    placeholders: BTreeMap<Reference, Variable>,
}

impl<'a> VariantBuilder<'a> {
    fn new(base: &'a Arc<Concludable>) -> Self {
        Self {
            base,
            origin: BTreeMap::new(),
            placeholders: BTreeMap::new(),
        }
    }

    /// Mints a placeholder standing for `original`, typed like `like`.
    fn placeholder(&mut self, name: String, original: &Reference, like: &Reference) -> Reference {
        let reference = Reference::System(name.into());
        let mut variable = self
            .base
            .variable(like)
            .cloned()
            .unwrap_or_else(|| Variable::type_variable(like.clone()));
        variable.reference = reference.clone();
        self.placeholders.insert(reference.clone(), variable);
        self.origin.insert(reference.clone(), original.clone());
        reference
    }

    fn value_placeholder(&mut self, n: usize, owner: &Reference, operand: &mut Operand) {
        let reference = self.placeholder(format!("v{n}"), owner, owner);
        *operand = Operand::Variable(reference);
    }

    fn build(mut self, choice: &[(Slot, Toggle)]) -> HeadConcludable {
        let mut constraint = self.base.constraint().clone();
        let mut context: Vec<Option<Constraint>> =
            self.base.context().iter().cloned().map(Some).collect();

        for (n, (slot, toggle)) in choice.iter().enumerate() {
            match (slot, toggle) {
                (_, Toggle::AsIs) => {}
                (Slot::ContextIsa(i) | Slot::ContextValue(i), Toggle::Absent) => context[*i] = None,
                (Slot::ContextIsa(i), Toggle::Placeholder) => {
                    if let Some(Constraint::Isa { ty, .. }) = &mut context[*i] {
                        let original = ty.clone();
                        *ty = self.placeholder(format!("t{n}"), &original, &original);
                    }
                }
                (Slot::ContextValue(i), Toggle::Placeholder) => {
                    if let Some(Constraint::Value { owner, operand, .. }) = &mut context[*i] {
                        self.value_placeholder(n, owner, operand);
                    }
                }
                (Slot::MainType, _) => {
                    if let Constraint::Isa { ty, .. } = &mut constraint {
                        let original = ty.clone();
                        *ty = self.placeholder(format!("t{n}"), &original, &original);
                    }
                }
                (Slot::MainOperand, _) => {
                    if let Constraint::Value { owner, operand, .. } = &mut constraint {
                        self.value_placeholder(n, owner, operand);
                    }
                }
                (Slot::Role(i), toggle) => {
                    if let Constraint::Relation { role_players, .. } = &mut constraint
                        && let Some(rp) = role_players.get_mut(*i)
                    {
                        rp.role_type = match (toggle, rp.role_type.take()) {
                            (Toggle::Placeholder, Some(role)) => {
                                Some(self.placeholder(format!("r{n}"), &role, &role))
                            }
                            _ => None,
                        };
                    }
                }
            }
        }

        let context: Vec<Constraint> = context.into_iter().flatten().collect();
        let variables = std::iter::once(&constraint)
            .chain(&context)
            .flat_map(Constraint::references)
            .filter_map(|r| {
                self.placeholders
                    .get(r)
                    .or_else(|| self.base.variable(r))
                    .map(|v| (r.clone(), v.clone()))
            })
            .collect();

        HeadConcludable {
            variant: Concludable::from_parts(constraint, context, variables),
            origin: self.origin,
            base: Arc::clone(self.base),
        }
    }
}

/// Produces every generalized variant of a rule head concludable, the head
/// itself included.
#[must_use]
pub fn generalize(head: &Concludable) -> BTreeSet<HeadConcludable> {
    let slots = slots(head);
    let base = Arc::new(head.clone());

    let mut choices: Vec<Vec<(Slot, Toggle)>> = vec![Vec::new()];
    for (slot, options) in &slots {
        let mut next = Vec::with_capacity(choices.len() * options.len());
        for choice in &choices {
            for toggle in options {
                let mut extended = choice.clone();
                extended.push((*slot, *toggle));
                next.push(extended);
            }
        }
        choices = next;
    }

    choices
        .iter()
        .map(|choice| VariantBuilder::new(&base).build(choice))
        .collect()
}
