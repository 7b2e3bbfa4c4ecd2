//! Integration tests for head generalization and unification
//!
//! Tests that rule heads are generalized into every variant and that
//! queries unify with exactly the variants that can answer them.

use std::collections::BTreeSet;

use deduce_engine::pattern::{Conjunction, ConstraintKind, Predicate, Reference};
use deduce_engine::{Concludable, GraphStorage, Rule, Storage, TypeHinter, extract, generalize, unify};
use deduce_storage::{Graph, Schema};

fn employment_rule() -> Rule {
    let when = Conjunction::builder()
        .relation("c", &[(Some("party"), "x"), (Some("provider"), "y")])
        .isa("c", "contract")
        .build();
    let then = Conjunction::builder()
        .relation("_", &[(Some("employee"), "x"), (Some("employer"), "y")])
        .isa("_", "employment")
        .build();
    Rule::new("employment-from-contract", when, then).unwrap()
}

/// A graph with the employment rule registered, so both sides of the rule
/// carry type hints from the schema.
fn hinted_storage() -> GraphStorage {
    let mut schema = Schema::new();
    schema.define_entity("person", None).unwrap();
    schema.define_entity("company", None).unwrap();
    schema
        .define_relation("contract", &["party", "provider"], None)
        .unwrap();
    schema
        .define_relation("employment", &["employee", "employer"], None)
        .unwrap();
    schema.define_plays("person", "contract", "party").unwrap();
    schema.define_plays("company", "contract", "provider").unwrap();
    schema.define_plays("person", "employment", "employee").unwrap();
    schema.define_plays("company", "employment", "employer").unwrap();

    let mut storage = GraphStorage::new(Graph::new(schema));
    let rule = employment_rule();
    storage
        .add_rule("employment-from-contract", rule.when(), rule.then())
        .unwrap();
    storage
}

fn hinted_unifier_count(conjunction: &Conjunction) -> usize {
    let storage = hinted_storage();
    let hinted = TypeHinter::new(storage.schema()).hint(conjunction).unwrap();
    let rule = storage.rules().remove(0);
    rule.unifiers(&query(&hinted)).len()
}

fn query(conjunction: &Conjunction) -> Concludable {
    extract(conjunction).unwrap().remove(0).into_inner()
}

fn relation_head(then: &Conjunction) -> Concludable {
    let constraint = then
        .constraints()
        .iter()
        .find(|c| c.kind() == ConstraintKind::Relation)
        .unwrap()
        .clone();
    Concludable::new(constraint, then).unwrap()
}

// =============================================================================
// Generalization
// =============================================================================

#[test]
fn relation_head_has_every_variant() {
    let then = Conjunction::builder()
        .relation("_", &[(Some("employee"), "x"), (Some("employer"), "y")])
        .isa("_", "employment")
        .build();
    let variants = generalize(&relation_head(&then));
    assert_eq!(variants.len(), 27);
    assert_eq!(variants.iter().filter(|v| v.is_base()).count(), 1);
}

#[test]
fn untyped_head_has_fewer_variants() {
    let then = Conjunction::builder()
        .relation("_", &[(None, "x"), (None, "y")])
        .build();
    let variants = generalize(&relation_head(&then));
    assert!(variants.len() < 27);
    assert!(!variants.is_empty());
}

// =============================================================================
// Unification
// =============================================================================

#[test]
fn untyped_query_unifies_in_both_role_orders() {
    let rule = employment_rule();
    let query = query(
        &Conjunction::builder()
            .relation("_", &[(None, "a"), (None, "b")])
            .build(),
    );
    let unifiers = rule.unifiers(&query);
    assert_eq!(unifiers.len(), 2);

    let targets: BTreeSet<_> = unifiers
        .iter()
        .map(|u| u.mapping()[&Reference::name("a")].clone())
        .collect();
    assert_eq!(
        targets,
        BTreeSet::from([
            BTreeSet::from([Reference::name("x")]),
            BTreeSet::from([Reference::name("y")]),
        ])
    );
}

#[test]
fn one_typed_role_fixes_the_assignment() {
    let rule = employment_rule();
    let query = query(
        &Conjunction::builder()
            .relation("_", &[(Some("employee"), "a"), (None, "b")])
            .build(),
    );
    let unifiers = rule.unifiers(&query);
    assert_eq!(unifiers.len(), 1);
    assert_eq!(
        unifiers[0].mapping()[&Reference::name("b")],
        BTreeSet::from([Reference::name("y")])
    );
}

#[test]
fn repeated_role_cannot_be_assigned_twice() {
    let rule = employment_rule();
    let query = query(
        &Conjunction::builder()
            .relation("_", &[(Some("employer"), "a"), (Some("employer"), "b")])
            .build(),
    );
    assert!(rule.unifiers(&query).is_empty());
}

#[test]
fn ownership_queries_do_not_unify_with_relation_heads() {
    let rule = employment_rule();
    let query = query(&Conjunction::builder().has("p", Some("salary"), "s").build());
    assert!(rule.unifiers(&query).is_empty());
}

#[test]
fn literal_heads_are_checked_against_query_values() {
    let then = Conjunction::builder().has_value("p", "rating", 4).build();
    let head = then
        .constraints()
        .iter()
        .find(|c| c.kind() == ConstraintKind::Has)
        .unwrap()
        .clone();
    let variants = generalize(&Concludable::new(head, &then).unwrap());
    let count = |conjunction: Conjunction| {
        let query = query(&conjunction);
        variants.iter().map(|v| unify(&query, v).count()).sum::<usize>()
    };

    let good = Conjunction::builder()
        .has("x", Some("rating"), "r")
        .value("r", Predicate::Gte, 3)
        .build();
    let poor = Conjunction::builder()
        .has("x", Some("rating"), "r")
        .value("r", Predicate::Lt, 3)
        .build();
    assert_eq!(count(good), 1);
    assert_eq!(count(poor), 0);
}

// =============================================================================
// Type Hints
// =============================================================================

#[test]
fn players_of_the_wrong_type_do_not_unify() {
    let companies = Conjunction::builder()
        .relation("_", &[(None, "a"), (None, "b")])
        .isa("a", "company")
        .isa("b", "company")
        .build();
    assert_eq!(hinted_unifier_count(&companies), 0);
}

#[test]
fn relation_of_another_type_does_not_unify() {
    let contract = Conjunction::builder()
        .relation("r", &[(None, "a"), (None, "b")])
        .isa("r", "contract")
        .build();
    assert_eq!(hinted_unifier_count(&contract), 0);
}

#[test]
fn compatible_player_type_fixes_the_assignment() {
    let employee = Conjunction::builder()
        .relation("_", &[(None, "a"), (None, "b")])
        .isa("a", "person")
        .build();
    assert_eq!(hinted_unifier_count(&employee), 1);
}
