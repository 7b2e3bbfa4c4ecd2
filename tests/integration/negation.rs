//! Integration tests for negation and query validation
//!
//! Tests negated blocks over stored and derived facts, and the shapes of
//! query that are rejected before resolution starts.

use deduce_engine::pattern::Conjunction;
use deduce_engine::Reasoner;
use deduce_foundation::{ErrorKind, Label};

use crate::fixtures::{add_transitivity, bound, geography, located_in};

fn named(name: &str) -> Conjunction {
    Conjunction::builder().has_value("y", "name", name).build()
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn negation_filters_stored_attributes() {
    let (mut storage, places) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage);

    let query = Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
        .isa("_", "is-located-in")
        .not(named("Europe"))
        .build();
    let answers: Vec<_> = reasoner.resolve(&query).unwrap().map(Result::unwrap).collect();
    assert_eq!(answers.len(), 3);
    assert!(answers.iter().all(|a| bound(a, "y") != places.europe));
}

#[test]
fn negation_sees_derived_facts() {
    let (mut storage, places) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage);

    let inside_poland = Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "p")])
        .isa("_", "is-located-in")
        .has_value("p", "name", "Poland")
        .build();
    let query = Conjunction::builder()
        .isa("x", "location")
        .not(inside_poland)
        .build();
    let mut found: Vec<_> = reasoner
        .resolve(&query)
        .unwrap()
        .map(|a| bound(&a.unwrap(), "x"))
        .collect();
    found.sort();
    assert_eq!(found, vec![places.poland, places.europe]);
}

// =============================================================================
// Rejected Queries
// =============================================================================

#[test]
fn disjunctive_negation_is_rejected() {
    let (storage, _) = geography();
    let reasoner = Reasoner::new(storage);
    let query = Conjunction::builder()
        .isa("y", "location")
        .not_any(vec![named("Europe"), named("Poland")])
        .build();
    let error = reasoner.resolve(&query).err().unwrap();
    assert!(matches!(error.kind, ErrorKind::UnsupportedNegationShape(_)));
}

#[test]
fn nested_negation_is_rejected() {
    let (storage, _) = geography();
    let reasoner = Reasoner::new(storage);
    let inner = Conjunction::builder()
        .isa("y", "country")
        .not(named("Poland"))
        .build();
    let query = Conjunction::builder().isa("y", "location").not(inner).build();
    let error = reasoner.resolve(&query).err().unwrap();
    assert!(matches!(error.kind, ErrorKind::UnsupportedNegationShape(_)));
}

#[test]
fn rule_bodies_are_checked_too() {
    let (mut storage, _) = geography();
    let when = Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
        .isa("_", "is-located-in")
        .not_any(vec![named("Europe"), named("Asia")])
        .build();
    let then = Conjunction::builder()
        .relation("_", &[(Some("located"), "y"), (Some("location"), "x")])
        .isa("_", "is-located-in")
        .build();
    storage.add_rule("inverted", &when, &then).unwrap();
    let reasoner = Reasoner::new(storage);

    let error = reasoner.resolve(&located_in()).err().unwrap();
    assert!(matches!(error.kind, ErrorKind::UnsupportedNegationShape(_)));
    assert_eq!(error.context.and_then(|c| c.rule).as_deref(), Some("inverted"));
}

#[test]
fn unknown_types_are_rejected() {
    let (storage, _) = geography();
    let reasoner = Reasoner::new(storage);
    let query = Conjunction::builder().isa("x", "planet").build();
    let error = reasoner.resolve(&query).err().unwrap();
    assert!(matches!(error.kind, ErrorKind::UnresolvedType(ref label) if *label == Label::of("planet")));
}
