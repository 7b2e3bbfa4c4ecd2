//! Integration tests for concludable extraction
//!
//! Tests how conjunctions split into concludables and how concludables are
//! fingerprinted.

use deduce_engine::pattern::{Conjunction, ConstraintKind, Predicate, Reference};
use deduce_engine::{Fingerprint, extract};
use deduce_foundation::ErrorKind;

fn kinds(conjunction: &Conjunction) -> Vec<ConstraintKind> {
    extract(conjunction)
        .unwrap()
        .iter()
        .map(|c| c.kind())
        .collect()
}

// =============================================================================
// Partitioning
// =============================================================================

#[test]
fn typed_relation_and_named_attribute() {
    let query = Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
        .isa("_", "is-located-in")
        .has_value("x", "name", "Warsaw")
        .build();
    assert_eq!(kinds(&query), vec![ConstraintKind::Relation, ConstraintKind::Has]);
}

#[test]
fn every_constraint_is_covered() {
    let query = Conjunction::builder()
        .relation("r", &[(None, "x"), (None, "y")])
        .isa("r", "friendship")
        .isa("x", "person")
        .has("x", Some("age"), "a")
        .value("a", Predicate::Gt, 18)
        .isa("y", "person")
        .build();
    let concludables = extract(&query).unwrap();
    for constraint in query.constraints() {
        let covered = concludables
            .iter()
            .any(|c| c.constraint() == constraint || c.context().contains(constraint));
        assert!(covered, "{constraint} is not covered");
    }
}

#[test]
fn role_player_isa_stays_separate() {
    let query = Conjunction::builder()
        .relation("r", &[(None, "x")])
        .isa("r", "membership")
        .isa("x", "person")
        .build();
    // x is only a role player, so its isa stays a concludable of its own
    assert_eq!(kinds(&query), vec![ConstraintKind::Relation, ConstraintKind::Isa]);
}

#[test]
fn value_ranges_stay_separate() {
    let query = Conjunction::builder()
        .value("n", Predicate::Gt, 5)
        .value("n", Predicate::Lte, 10)
        .build();
    assert_eq!(kinds(&query), vec![ConstraintKind::Value, ConstraintKind::Value]);
}

#[test]
fn relation_without_players_is_illegal() {
    let query = Conjunction::builder().relation("r", &[]).isa("r", "marriage").build();
    let error = extract(&query).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::IllegalConcludable(_)));
}

// =============================================================================
// Fingerprints
// =============================================================================

#[test]
fn renamed_concludables_share_fingerprint() {
    let first = Conjunction::builder()
        .has("p", Some("age"), "a")
        .value("a", Predicate::Gte, 18)
        .build();
    let second = Conjunction::builder()
        .has("q", Some("age"), "b")
        .value("b", Predicate::Gte, 18)
        .build();
    let (a, to_first) = Fingerprint::of(&extract(&first).unwrap()[0]);
    let (b, to_second) = Fingerprint::of(&extract(&second).unwrap()[0]);
    assert_eq!(a, b);
    assert_eq!(to_first[&Reference::name("p")], to_second[&Reference::name("q")]);
}

#[test]
fn different_values_differ() {
    let adult = Conjunction::builder()
        .has("p", Some("age"), "a")
        .value("a", Predicate::Gte, 18)
        .build();
    let senior = Conjunction::builder()
        .has("p", Some("age"), "a")
        .value("a", Predicate::Gte, 65)
        .build();
    let (a, _) = Fingerprint::of(&extract(&adult).unwrap()[0]);
    let (b, _) = Fingerprint::of(&extract(&senior).unwrap()[0]);
    assert_ne!(a, b);
}

#[test]
fn role_player_order_does_not_matter() {
    let written = Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
        .isa("_", "is-located-in")
        .build();
    let permuted = Conjunction::builder()
        .relation("_", &[(Some("location"), "b"), (Some("located"), "a")])
        .isa("_", "is-located-in")
        .build();
    let (a, to_written) = Fingerprint::of(&extract(&written).unwrap()[0]);
    let (b, to_permuted) = Fingerprint::of(&extract(&permuted).unwrap()[0]);
    assert_eq!(a, b);
    assert_eq!(to_written[&Reference::name("x")], to_permuted[&Reference::name("a")]);
    assert_eq!(to_written[&Reference::name("y")], to_permuted[&Reference::name("b")]);
}

#[test]
fn value_order_does_not_matter() {
    let ascending = Conjunction::builder()
        .has("p", Some("age"), "n")
        .value("n", Predicate::Gt, 5)
        .value("n", Predicate::Lt, 10)
        .build();
    let descending = Conjunction::builder()
        .has("q", Some("age"), "m")
        .value("m", Predicate::Lt, 10)
        .value("m", Predicate::Gt, 5)
        .build();
    let (a, _) = Fingerprint::of(&extract(&ascending).unwrap()[0]);
    let (b, _) = Fingerprint::of(&extract(&descending).unwrap()[0]);
    assert_eq!(a, b);
}
