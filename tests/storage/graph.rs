//! Integration tests for the fact graph
//!
//! Tests insertion, put semantics, inferred facts and snapshots.

use deduce_foundation::{Label, Value, ValueType};
use deduce_storage::{Graph, RolePlayer, Schema};
use proptest::prelude::*;

fn graph() -> Graph {
    let mut schema = Schema::new();
    schema.define_entity("person", None).unwrap();
    schema.define_entity("company", None).unwrap();
    schema
        .define_relation("employment", &["employee", "employer"], None)
        .unwrap();
    schema.define_plays("person", "employment", "employee").unwrap();
    schema.define_plays("company", "employment", "employer").unwrap();
    schema.define_attribute("name", ValueType::String, None).unwrap();
    schema.define_attribute("age", ValueType::Long, None).unwrap();
    schema.define_owns("person", "name").unwrap();
    schema.define_owns("person", "age").unwrap();
    Graph::new(schema)
}

fn employee() -> Label {
    Label::scoped("employment", "employee")
}

fn employer() -> Label {
    Label::scoped("employment", "employer")
}

#[test]
fn insert_and_read_back() {
    let mut graph = graph();
    let alice = graph.insert_entity("person").unwrap();
    let acme = graph.insert_entity("company").unwrap();
    let job = graph
        .insert_relation("employment", &[("employee", alice), ("employer", acme)])
        .unwrap();
    let name = graph.insert_attribute("name", "Alice").unwrap();
    graph.insert_has(alice, name).unwrap();

    assert_eq!(graph.len(), 4);
    assert_eq!(graph.thing(job).unwrap().type_label, Label::of("employment"));
    assert_eq!(graph.role_players(job).count(), 2);
    assert_eq!(graph.relations_of(alice).collect::<Vec<_>>(), vec![job]);
    assert_eq!(graph.attributes_of(alice).collect::<Vec<_>>(), vec![(name, false)]);
    assert_eq!(graph.owners_of(name).collect::<Vec<_>>(), vec![alice]);
    assert_eq!(graph.attribute(&Label::of("name"), &Value::from("Alice")), Some(name));
    assert_eq!(graph.instances_of(&Label::of("person")).count(), 1);
}

#[test]
fn insert_errors() {
    let mut graph = graph();
    assert!(graph.insert_entity("employment").is_err());
    assert!(graph.insert_entity("planet").is_err());
    assert!(graph.insert_attribute("age", "old").is_err());
    let alice = graph.insert_entity("person").unwrap();
    assert!(graph.insert_relation("employment", &[("boss", alice)]).is_err());
    assert!(graph.insert_has(alice, alice).is_err());
}

#[test]
fn put_relation_is_idempotent() {
    let mut graph = graph();
    let alice = graph.insert_entity("person").unwrap();
    let acme = graph.insert_entity("company").unwrap();
    let edges = [RolePlayer::new(employer(), acme), RolePlayer::new(employee(), alice)];

    let (first, created) = graph
        .put_relation(&Label::of("employment"), &edges, true)
        .unwrap();
    assert!(created);
    let reversed = [edges[1].clone(), edges[0].clone()];
    let (second, created) = graph
        .put_relation(&Label::of("employment"), &reversed, true)
        .unwrap();
    assert!(!created);
    assert_eq!(first, second);
    assert_eq!(graph.inferred_count(), 1);
}

#[test]
fn put_has_keeps_stored_status() {
    let mut graph = graph();
    let alice = graph.insert_entity("person").unwrap();
    let age = graph.insert_attribute("age", 30).unwrap();
    graph.insert_has(alice, age).unwrap();

    assert!(!graph.put_has(alice, age, true).unwrap());
    assert_eq!(graph.ownership(alice, age), Some(false));

    let other = graph.put_attribute(&Label::of("age"), Value::Long(31), true).unwrap();
    assert!(graph.put_has(alice, other, true).unwrap());
    assert_eq!(graph.ownership(alice, other), Some(true));
    assert!(graph.thing(other).unwrap().inferred);
}

#[test]
fn clones_are_snapshots() {
    let mut graph = graph();
    graph.insert_entity("person").unwrap();
    let snapshot = graph.clone();
    graph.insert_entity("person").unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(graph.len(), 2);
}

#[test]
fn concepts_carry_values() {
    let mut graph = graph();
    let age = graph.insert_attribute("age", 42).unwrap();
    let concept = graph.concept(age).unwrap();
    assert_eq!(concept.value(), Some(&Value::Long(42)));
    assert_eq!(concept.thing_id(), Some(age));
}

proptest! {
    #[test]
    fn attribute_put_dedupes(values in proptest::collection::vec(0i64..20, 1..40)) {
        let mut graph = graph();
        let ids: Vec<_> = values
            .iter()
            .map(|v| graph.insert_attribute("age", *v).unwrap())
            .collect();
        let distinct: std::collections::BTreeSet<_> = values.iter().collect();
        prop_assert_eq!(graph.len(), distinct.len());
        for (value, id) in values.iter().zip(&ids) {
            prop_assert_eq!(graph.attribute(&Label::of("age"), &Value::Long(*value)), Some(*id));
        }
    }
}
