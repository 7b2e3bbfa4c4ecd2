//! The storage collaborator the reasoner resolves against.

use std::collections::BTreeSet;
use std::sync::Arc;

use deduce_foundation::{Concept, Error, Label, Result};
use deduce_storage::{Graph, Schema};

use crate::answer::ConceptMap;
use crate::conclusion::{AttributeFact, Fact};
use crate::matcher::Matcher;
use crate::pattern::Conjunction;
use crate::rule::Rule;
use crate::typing::TypeHinter;

/// What the reasoner needs from the database.
///
/// Lookups see stored facts only. Facts inserted through [`Storage::insert`]
/// are inferred and must not be returned by later lookups, since the rules
/// that produced them are re-derived on every resolution.
pub trait Storage {
    /// Lazy stream of lookup answers.
    type Lookup: Iterator<Item = Result<ConceptMap>> + 'static;

    /// The schema.
    fn schema(&self) -> &Schema;

    /// Matches a pattern against stored facts, without inference.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the pattern cannot be evaluated.
    fn lookup(&self, pattern: &Conjunction) -> Result<Self::Lookup>;

    /// The rules eligible for resolution.
    fn rules(&self) -> Vec<Arc<Rule>>;

    /// Inserts a concluded fact with put semantics and returns the concept
    /// concluded: the relation, or the owned attribute.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the fact is inconsistent with the schema.
    fn insert(&mut self, fact: &Fact) -> Result<Concept>;

    /// The concrete types a variable of type `label` may take.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedType` if the schema has no such type.
    fn type_hints(&self, label: &Label) -> Result<BTreeSet<Label>> {
        if self.schema().contains(label) {
            Ok(self.schema().subtypes(label))
        } else {
            Err(Error::unresolved_type(label.clone()))
        }
    }
}

// =============================================================================
// Graph Storage
// =============================================================================

/// [`Storage`] over an in-memory [`Graph`] and a rule list.
#[derive(Clone, Debug)]
pub struct GraphStorage {
    graph: Graph,
    rules: Vec<Arc<Rule>>,
}

impl GraphStorage {
    /// Wraps a graph with no rules.
    #[must_use]
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            rules: Vec::new(),
        }
    }

    /// The underlying graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access for loading stored facts.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Type-checks and adds a rule.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedType` for unknown labels and `IllegalConcludable`
    /// for heads that cannot be concluded.
    pub fn add_rule(&mut self, label: &str, when: &Conjunction, then: &Conjunction) -> Result<()> {
        let hinter = TypeHinter::new(self.graph.schema());
        let when = hinter.hint(when)?;
        let then = hinter.hint(then)?;
        self.rules.push(Arc::new(Rule::new(label, when, then)?));
        Ok(())
    }
}

impl Storage for GraphStorage {
    type Lookup = Matcher;

    fn schema(&self) -> &Schema {
        self.graph.schema()
    }

    fn lookup(&self, pattern: &Conjunction) -> Result<Matcher> {
        Ok(Matcher::new(self.graph.clone(), pattern))
    }

    fn rules(&self) -> Vec<Arc<Rule>> {
        self.rules.clone()
    }

    fn insert(&mut self, fact: &Fact) -> Result<Concept> {
        let id = match fact {
            Fact::Relation {
                relation_type,
                role_players,
            } => {
                let edges: Vec<deduce_storage::RolePlayer> = role_players
                    .iter()
                    .map(|(role, player)| deduce_storage::RolePlayer::new(role.clone(), *player))
                    .collect();
                self.graph.put_relation(relation_type, &edges, true)?.0
            }
            Fact::Has { owner, attribute } => {
                let id = match attribute {
                    AttributeFact::Existing(id) => *id,
                    AttributeFact::New {
                        attribute_type,
                        value,
                    } => self.graph.put_attribute(attribute_type, value.clone(), true)?,
                };
                self.graph.put_has(*owner, id, true)?;
                id
            }
        };
        self.graph
            .concept(id)
            .ok_or_else(|| Error::internal(format!("{id} vanished after insertion")))
    }
}
