//! The fact graph: typed things, ownerships and role-player edges.
//!
//! All indices are persistent maps, so cloning a graph is O(1) and a clone
//! is an independent snapshot. Facts carry an `inferred` flag so that rule
//! conclusions can live next to stored facts without being mistaken for
//! them.

use im::{OrdMap, OrdSet, Vector};

use deduce_foundation::{Concept, Error, Label, Result, ThingId, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::schema::{Schema, TypeKind};

/// A stored or inferred instance.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Thing {
    /// Instance identifier.
    pub id: ThingId,
    /// Most specific type.
    pub type_label: Label,
    /// Attribute value, `None` for entities and relations.
    pub value: Option<Value>,
    /// True if this thing was created by a rule conclusion.
    pub inferred: bool,
}

impl Thing {
    /// Returns the concept handle for this thing.
    #[must_use]
    pub fn concept(&self) -> Concept {
        Concept::Thing {
            id: self.id,
            type_label: self.type_label.clone(),
            value: self.value.clone(),
        }
    }
}

/// One role-player edge of a relation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RolePlayer {
    /// Scoped role type.
    pub role: Label,
    /// The player.
    pub player: ThingId,
}

impl RolePlayer {
    /// Creates a role-player edge.
    #[must_use]
    pub fn new(role: Label, player: ThingId) -> Self {
        Self { role, player }
    }
}

/// In-memory fact graph over a [`Schema`].
#[derive(Clone, Debug)]
pub struct Graph {
    schema: Schema,
    things: OrdMap<ThingId, Thing>,
    /// Instances by exact type.
    instances: OrdMap<Label, OrdSet<ThingId>>,
    role_players: OrdMap<ThingId, Vector<RolePlayer>>,
    /// Player -> relations it plays in.
    playing: OrdMap<ThingId, OrdSet<ThingId>>,
    /// Owner -> attribute -> inferred.
    ownerships: OrdMap<ThingId, OrdMap<ThingId, bool>>,
    /// Attribute -> owners.
    owners: OrdMap<ThingId, OrdSet<ThingId>>,
    attribute_index: OrdMap<(Label, Value), ThingId>,
    next_id: u64,
}

impl Graph {
    /// Creates an empty graph over a schema.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            things: OrdMap::new(),
            instances: OrdMap::new(),
            role_players: OrdMap::new(),
            playing: OrdMap::new(),
            ownerships: OrdMap::new(),
            owners: OrdMap::new(),
            attribute_index: OrdMap::new(),
            next_id: 1,
        }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the number of things.
    #[must_use]
    pub fn len(&self) -> usize {
        self.things.len()
    }

    /// Returns true if the graph holds no things.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    /// Returns the number of inferred things.
    #[must_use]
    pub fn inferred_count(&self) -> usize {
        self.things.values().filter(|thing| thing.inferred).count()
    }

    // =========================================================================
    // Stored facts
    // =========================================================================

    /// Inserts a new entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown or not an entity type.
    pub fn insert_entity(&mut self, type_name: &str) -> Result<ThingId> {
        let label = self.expect_kind(type_name, |kind| kind == TypeKind::Entity)?;
        Ok(self.create(label, None, false))
    }

    /// Puts an attribute: returns the existing instance with this value, or
    /// creates one.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown, not an attribute type, or the
    /// value does not match its value type.
    pub fn insert_attribute(&mut self, type_name: &str, value: impl Into<Value>) -> Result<ThingId> {
        let label = Label::of(type_name);
        self.put_attribute(&label, value.into(), false)
    }

    /// Inserts a new relation with role-players given by unscoped role name.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown, a role is not related by the
    /// relation type, or a player does not exist.
    pub fn insert_relation(
        &mut self,
        type_name: &str,
        role_players: &[(&str, ThingId)],
    ) -> Result<ThingId> {
        let label = self.expect_kind(type_name, |kind| kind == TypeKind::Relation)?;
        let mut edges = Vec::with_capacity(role_players.len());
        for (role, player) in role_players {
            let role = self
                .schema
                .role(&label, role)
                .ok_or_else(|| Error::unresolved_type(Label::scoped(type_name, role)))?;
            edges.push(RolePlayer::new(role, *player));
        }
        self.create_relation(label, &edges, false)
    }

    /// Records that `owner` has `attribute`.
    ///
    /// # Errors
    ///
    /// Returns an error if either thing is missing or `attribute` is not an
    /// attribute.
    pub fn insert_has(&mut self, owner: ThingId, attribute: ThingId) -> Result<()> {
        self.put_has(owner, attribute, false).map(|_| ())
    }

    // =========================================================================
    // Put semantics (used for rule conclusions)
    // =========================================================================

    /// Finds or creates an attribute of the given type and value.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not an attribute type or the value
    /// type does not match.
    pub fn put_attribute(&mut self, label: &Label, value: Value, inferred: bool) -> Result<ThingId> {
        let expected = self
            .schema
            .value_type(label)
            .ok_or_else(|| Error::unresolved_type(label.clone()))?;
        if value.value_type() != expected {
            return Err(Error::storage(format!(
                "{label} holds {expected} values, got {value}"
            )));
        }
        let key = (label.clone(), value.clone());
        if let Some(id) = self.attribute_index.get(&key) {
            return Ok(*id);
        }
        let id = self.create(label.clone(), Some(value), inferred);
        self.attribute_index.insert(key, id);
        Ok(id)
    }

    /// Finds a relation of exactly this type and role-player multiset, or
    /// creates one. Returns the relation and whether it was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not a relation type, a role is not
    /// related by it, or a player does not exist.
    pub fn put_relation(
        &mut self,
        label: &Label,
        role_players: &[RolePlayer],
        inferred: bool,
    ) -> Result<(ThingId, bool)> {
        if self.schema.kind(label) != Some(TypeKind::Relation) {
            return Err(Error::unresolved_type(label.clone()));
        }
        if let Some(existing) = self.find_relation(label, role_players) {
            return Ok((existing, false));
        }
        let id = self.create_relation(label.clone(), role_players, inferred)?;
        Ok((id, true))
    }

    /// Records an ownership. Returns true if it did not exist before.
    ///
    /// An existing ownership keeps its stored/inferred status.
    ///
    /// # Errors
    ///
    /// Returns an error if either thing is missing or `attribute` is not an
    /// attribute.
    pub fn put_has(&mut self, owner: ThingId, attribute: ThingId, inferred: bool) -> Result<bool> {
        self.require(owner)?;
        let attr = self.require(attribute)?;
        if attr.value.is_none() {
            return Err(Error::storage(format!("{attribute} is not an attribute")));
        }
        let owned = self.ownerships.entry(owner).or_insert_with(OrdMap::new);
        if owned.contains_key(&attribute) {
            return Ok(false);
        }
        owned.insert(attribute, inferred);
        self.owners
            .entry(attribute)
            .or_insert_with(OrdSet::new)
            .insert(owner);
        Ok(true)
    }

    fn find_relation(&self, label: &Label, role_players: &[RolePlayer]) -> Option<ThingId> {
        let mut wanted: Vec<&RolePlayer> = role_players.iter().collect();
        wanted.sort();
        let first = role_players.first()?;
        self.playing
            .get(&first.player)?
            .iter()
            .copied()
            .find(|relation| {
                self.things
                    .get(relation)
                    .is_some_and(|thing| &thing.type_label == label)
                    && self.role_players.get(relation).is_some_and(|edges| {
                        let mut existing: Vec<&RolePlayer> = edges.iter().collect();
                        existing.sort();
                        existing == wanted
                    })
            })
    }

    fn create_relation(
        &mut self,
        label: Label,
        role_players: &[RolePlayer],
        inferred: bool,
    ) -> Result<ThingId> {
        if role_players.is_empty() {
            return Err(Error::storage(format!("relation {label} needs role-players")));
        }
        let roles = self.schema.roles(&label);
        for edge in role_players {
            if !roles.contains(&edge.role) {
                return Err(Error::unresolved_type(edge.role.clone()));
            }
            self.require(edge.player)?;
        }
        let id = self.create(label, None, inferred);
        for edge in role_players {
            self.playing
                .entry(edge.player)
                .or_insert_with(OrdSet::new)
                .insert(id);
        }
        self.role_players
            .insert(id, role_players.iter().cloned().collect());
        Ok(id)
    }

    fn create(&mut self, type_label: Label, value: Option<Value>, inferred: bool) -> ThingId {
        let id = ThingId(self.next_id);
        self.next_id += 1;
        self.instances
            .entry(type_label.clone())
            .or_insert_with(OrdSet::new)
            .insert(id);
        self.things.insert(
            id,
            Thing {
                id,
                type_label,
                value,
                inferred,
            },
        );
        id
    }

    fn expect_kind(&self, name: &str, accepts: impl Fn(TypeKind) -> bool) -> Result<Label> {
        let label = Label::of(name);
        match self.schema.kind(&label) {
            Some(kind) if accepts(kind) => Ok(label),
            Some(_) => Err(Error::storage(format!("{name} has the wrong kind"))),
            None => Err(Error::unresolved_type(label)),
        }
    }

    fn require(&self, id: ThingId) -> Result<&Thing> {
        self.things
            .get(&id)
            .ok_or_else(|| Error::storage(format!("thing not found: {id}")))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns a thing by id.
    #[must_use]
    pub fn thing(&self, id: ThingId) -> Option<&Thing> {
        self.things.get(&id)
    }

    /// Returns the concept for a thing id.
    #[must_use]
    pub fn concept(&self, id: ThingId) -> Option<Concept> {
        self.things.get(&id).map(Thing::concept)
    }

    /// Iterates all things in id order.
    pub fn things(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    /// Iterates the instances whose exact type is `label`.
    pub fn instances_of<'a>(&'a self, label: &Label) -> impl Iterator<Item = &'a Thing> + 'a {
        self.instances
            .get(label)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.things.get(id))
    }

    /// Iterates the role-player edges of a relation.
    pub fn role_players(&self, relation: ThingId) -> impl Iterator<Item = &RolePlayer> {
        self.role_players
            .get(&relation)
            .into_iter()
            .flat_map(|edges| edges.iter())
    }

    /// Iterates the relations a thing plays in.
    pub fn relations_of(&self, player: ThingId) -> impl Iterator<Item = ThingId> + '_ {
        self.playing
            .get(&player)
            .into_iter()
            .flat_map(|relations| relations.iter().copied())
    }

    /// Iterates the attributes of an owner with their inferred flag.
    pub fn attributes_of(&self, owner: ThingId) -> impl Iterator<Item = (ThingId, bool)> + '_ {
        self.ownerships
            .get(&owner)
            .into_iter()
            .flat_map(|owned| owned.iter().map(|(id, inferred)| (*id, *inferred)))
    }

    /// Iterates the owners of an attribute.
    pub fn owners_of(&self, attribute: ThingId) -> impl Iterator<Item = ThingId> + '_ {
        self.owners
            .get(&attribute)
            .into_iter()
            .flat_map(|owners| owners.iter().copied())
    }

    /// Returns whether an ownership is inferred, or `None` if it does not
    /// exist.
    #[must_use]
    pub fn ownership(&self, owner: ThingId, attribute: ThingId) -> Option<bool> {
        self.ownerships
            .get(&owner)
            .and_then(|owned| owned.get(&attribute))
            .copied()
    }

    /// Looks up an attribute by type and value.
    #[must_use]
    pub fn attribute(&self, label: &Label, value: &Value) -> Option<ThingId> {
        self.attribute_index
            .get(&(label.clone(), value.clone()))
            .copied()
    }
}
