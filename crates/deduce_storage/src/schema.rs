//! Schema definitions for entity, relation, attribute and role types.
//!
//! The schema is a single-inheritance type hierarchy. Role types are scoped
//! by the relation type that declares them, and are inherited by relation
//! subtypes.

use std::collections::BTreeSet;

use im::{OrdMap, OrdSet, Vector};

use deduce_foundation::{Error, Label, Result, ValueType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of a schema type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TypeKind {
    /// Entity type.
    Entity,
    /// Relation type.
    Relation,
    /// Attribute type holding values of the given value type.
    Attribute(ValueType),
    /// Role type, scoped by its relation.
    Role,
}

/// Schema definition for a single type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeSchema {
    /// Type label.
    pub label: Label,
    /// What kind of type this is.
    pub kind: TypeKind,
    /// Direct supertype, if any.
    pub supertype: Option<Label>,
}

/// The type hierarchy with role, ownership and playing declarations.
///
/// Cloning is cheap (structural sharing).
#[derive(Clone, Debug, Default)]
pub struct Schema {
    types: OrdMap<Label, TypeSchema>,
    /// Direct subtypes by supertype.
    subtypes: OrdMap<Label, OrdSet<Label>>,
    /// Roles declared by each relation type.
    relates: OrdMap<Label, Vector<Label>>,
    /// Declared player types by role.
    plays: OrdMap<Label, OrdSet<Label>>,
    /// Declared owner types by attribute type.
    owns: OrdMap<Label, OrdSet<Label>>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines an entity type.
    ///
    /// # Errors
    ///
    /// Returns an error if the type already exists or the supertype is not
    /// an entity type.
    pub fn define_entity(&mut self, name: &str, supertype: Option<&str>) -> Result<()> {
        let supertype = self.check_supertype(supertype, |kind| kind == TypeKind::Entity)?;
        self.insert_type(Label::of(name), TypeKind::Entity, supertype)
    }

    /// Defines a relation type with the given role names.
    ///
    /// Roles are scoped by `name`. Roles of the supertype are inherited.
    ///
    /// # Errors
    ///
    /// Returns an error if the type already exists, the supertype is not a
    /// relation type, or the relation would have no roles at all.
    pub fn define_relation(
        &mut self,
        name: &str,
        roles: &[&str],
        supertype: Option<&str>,
    ) -> Result<()> {
        let supertype = self.check_supertype(supertype, |kind| kind == TypeKind::Relation)?;
        if roles.is_empty() && supertype.is_none() {
            return Err(Error::storage(format!("relation type {name} declares no roles")));
        }
        let label = Label::of(name);
        self.insert_type(label.clone(), TypeKind::Relation, supertype)?;

        let mut declared = Vector::new();
        for role in roles {
            let role_label = Label::scoped(name, role);
            self.insert_type(role_label.clone(), TypeKind::Role, None)?;
            declared.push_back(role_label);
        }
        self.relates.insert(label, declared);
        Ok(())
    }

    /// Defines an attribute type.
    ///
    /// # Errors
    ///
    /// Returns an error if the type already exists or the supertype is not
    /// an attribute type with the same value type.
    pub fn define_attribute(
        &mut self,
        name: &str,
        value_type: ValueType,
        supertype: Option<&str>,
    ) -> Result<()> {
        let supertype =
            self.check_supertype(supertype, |kind| kind == TypeKind::Attribute(value_type))?;
        self.insert_type(Label::of(name), TypeKind::Attribute(value_type), supertype)
    }

    /// Declares that `player` can play `relation:role`.
    ///
    /// # Errors
    ///
    /// Returns an error if either type is unknown.
    pub fn define_plays(&mut self, player: &str, relation: &str, role: &str) -> Result<()> {
        let player = self.require(&Label::of(player))?;
        let role = self
            .role(&Label::of(relation), role)
            .ok_or_else(|| Error::unresolved_type(Label::scoped(relation, role)))?;
        self.plays.entry(role).or_insert_with(OrdSet::new).insert(player);
        Ok(())
    }

    /// Declares that `owner` can own `attribute`.
    ///
    /// # Errors
    ///
    /// Returns an error if either type is unknown or `attribute` is not an
    /// attribute type.
    pub fn define_owns(&mut self, owner: &str, attribute: &str) -> Result<()> {
        let owner = self.require(&Label::of(owner))?;
        let attribute = self.require(&Label::of(attribute))?;
        if self.value_type(&attribute).is_none() {
            return Err(Error::storage(format!("{attribute} is not an attribute type")));
        }
        self.owns.entry(attribute).or_insert_with(OrdSet::new).insert(owner);
        Ok(())
    }

    fn check_supertype(
        &self,
        supertype: Option<&str>,
        accepts: impl Fn(TypeKind) -> bool,
    ) -> Result<Option<Label>> {
        let Some(name) = supertype else {
            return Ok(None);
        };
        let label = self.require(&Label::of(name))?;
        match self.types.get(&label) {
            Some(schema) if accepts(schema.kind) => Ok(Some(label)),
            _ => Err(Error::storage(format!("{name} cannot be a supertype here"))),
        }
    }

    fn insert_type(
        &mut self,
        label: Label,
        kind: TypeKind,
        supertype: Option<Label>,
    ) -> Result<()> {
        if self.types.contains_key(&label) {
            return Err(Error::storage(format!("type already defined: {label}")));
        }
        if let Some(parent) = &supertype {
            self.subtypes
                .entry(parent.clone())
                .or_insert_with(OrdSet::new)
                .insert(label.clone());
        }
        self.types.insert(
            label.clone(),
            TypeSchema {
                label,
                kind,
                supertype,
            },
        );
        Ok(())
    }

    fn require(&self, label: &Label) -> Result<Label> {
        if self.contains(label) {
            Ok(label.clone())
        } else {
            Err(Error::unresolved_type(label.clone()))
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the schema for a type.
    #[must_use]
    pub fn get(&self, label: &Label) -> Option<&TypeSchema> {
        self.types.get(label)
    }

    /// Returns true if the type exists.
    #[must_use]
    pub fn contains(&self, label: &Label) -> bool {
        self.types.contains_key(label)
    }

    /// Returns the kind of a type.
    #[must_use]
    pub fn kind(&self, label: &Label) -> Option<TypeKind> {
        self.types.get(label).map(|schema| schema.kind)
    }

    /// Returns the value type of an attribute type.
    #[must_use]
    pub fn value_type(&self, label: &Label) -> Option<ValueType> {
        match self.kind(label)? {
            TypeKind::Attribute(value_type) => Some(value_type),
            _ => None,
        }
    }

    /// Returns the type and all of its transitive subtypes.
    ///
    /// Empty if the type is unknown.
    #[must_use]
    pub fn subtypes(&self, label: &Label) -> BTreeSet<Label> {
        let mut closure = BTreeSet::new();
        if !self.contains(label) {
            return closure;
        }
        let mut pending = vec![label.clone()];
        while let Some(current) = pending.pop() {
            if let Some(children) = self.subtypes.get(&current) {
                pending.extend(children.iter().cloned());
            }
            closure.insert(current);
        }
        closure
    }

    /// Returns the type followed by its ancestors, nearest first.
    #[must_use]
    pub fn supertypes(&self, label: &Label) -> Vec<Label> {
        let mut chain = Vec::new();
        let mut current = self.types.get(label);
        while let Some(schema) = current {
            chain.push(schema.label.clone());
            current = schema
                .supertype
                .as_ref()
                .and_then(|parent| self.types.get(parent));
        }
        chain
    }

    /// Returns true if `sub` is `sup` or one of its transitive subtypes.
    #[must_use]
    pub fn is_subtype_of(&self, sub: &Label, sup: &Label) -> bool {
        self.supertypes(sub).iter().any(|label| label == sup)
    }

    /// Returns the roles a relation type relates, including inherited roles.
    #[must_use]
    pub fn roles(&self, relation: &Label) -> BTreeSet<Label> {
        self.supertypes(relation)
            .iter()
            .filter_map(|label| self.relates.get(label))
            .flat_map(|roles| roles.iter().cloned())
            .collect()
    }

    /// Resolves an unscoped role name within a relation type.
    #[must_use]
    pub fn role(&self, relation: &Label, name: &str) -> Option<Label> {
        self.roles(relation)
            .into_iter()
            .find(|role| role.name() == name)
    }

    /// Returns every role type with the given unscoped name.
    #[must_use]
    pub fn roles_named(&self, name: &str) -> BTreeSet<Label> {
        self.relates
            .values()
            .flat_map(|roles| roles.iter())
            .filter(|role| role.name() == name)
            .cloned()
            .collect()
    }

    /// Returns the relation types that relate `role`, including subtypes
    /// that inherit it.
    #[must_use]
    pub fn relations_with_role(&self, role: &Label) -> BTreeSet<Label> {
        role.scope()
            .map(|scope| self.subtypes(&Label::of(scope)))
            .unwrap_or_default()
    }

    /// Returns the types that can play `role`, including their subtypes.
    #[must_use]
    pub fn players(&self, role: &Label) -> BTreeSet<Label> {
        self.plays
            .get(role)
            .into_iter()
            .flat_map(|players| players.iter())
            .flat_map(|player| self.subtypes(player))
            .collect()
    }

    /// Returns the types that can own `attribute` or one of its supertypes,
    /// including their subtypes.
    #[must_use]
    pub fn owners(&self, attribute: &Label) -> BTreeSet<Label> {
        self.supertypes(attribute)
            .iter()
            .filter_map(|label| self.owns.get(label))
            .flat_map(|owners| owners.iter())
            .flat_map(|owner| self.subtypes(owner))
            .collect()
    }

    /// Returns every attribute type.
    #[must_use]
    pub fn attribute_types(&self) -> BTreeSet<Label> {
        self.types
            .values()
            .filter(|schema| matches!(schema.kind, TypeKind::Attribute(_)))
            .map(|schema| schema.label.clone())
            .collect()
    }

    /// Iterates all type schemas in label order.
    pub fn types(&self) -> impl Iterator<Item = &TypeSchema> {
        self.types.values()
    }
}
