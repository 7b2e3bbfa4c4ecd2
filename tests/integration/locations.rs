//! End-to-end resolution over a transitive location hierarchy
//!
//! Tests answers, their explanations, fixpoint iteration and persistence of
//! conclusions.

use deduce_engine::pattern::Conjunction;
use deduce_engine::{Answer, Explanation, Reasoner, ReasonerConfig};
use deduce_foundation::{ErrorKind, Result, SemanticLimit};

use crate::fixtures::{add_transitivity, bound, geography, located_in};
use crate::init_logging;

fn in_warsaw() -> Conjunction {
    Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
        .isa("_", "is-located-in")
        .has_value("x", "name", "Warsaw")
        .build()
}

/// The rule application inside an answer, looking through joins.
fn application(answer: &Answer) -> Option<&Answer> {
    match answer.explanation.as_ref() {
        Explanation::Lookup => None,
        Explanation::RuleApplication { .. } => Some(answer),
        Explanation::Join { left, right } => application(left).or_else(|| application(right)),
    }
}

// =============================================================================
// Answers
// =============================================================================

#[test]
fn warsaw_is_located_in_every_enclosing_place() {
    init_logging();
    let (mut storage, places) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage);

    let answers: Vec<Answer> = reasoner
        .resolve(&in_warsaw())
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    let mut found: Vec<_> = answers.iter().map(|a| bound(a, "y")).collect();
    found.sort();
    assert_eq!(found, vec![places.masovia, places.poland, places.europe]);
    assert!(answers.iter().all(|a| bound(a, "x") == places.warsaw));
}

#[test]
fn explanations_follow_the_derivation() {
    let (mut storage, places) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage);
    let answers: Vec<Answer> = reasoner
        .resolve(&in_warsaw())
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    let answer_for = |place| answers.iter().find(|a| bound(a, "y") == place).unwrap();

    let masovia = answer_for(places.masovia);
    assert!(application(masovia).is_none());
    assert_eq!(masovia.explanation.depth(), 0);

    let poland = answer_for(places.poland);
    let Explanation::RuleApplication { rule, premise, .. } =
        application(poland).unwrap().explanation.as_ref()
    else {
        unreachable!()
    };
    assert_eq!(&**rule, "transitive-location");
    let Explanation::Join { left, right } = premise.explanation.as_ref() else {
        panic!("premise should be a join, got {premise}");
    };
    assert!(left.explanation.is_lookup());
    assert!(right.explanation.is_lookup());

    let europe = answer_for(places.europe);
    assert_eq!(europe.explanation.depth(), 2);
    assert!(reasoner.explain(europe).check_connected());
}

#[test]
fn all_pairs_mix_stored_and_derived() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage);
    let answers: Vec<Answer> = reasoner
        .resolve(&located_in())
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(answers.len(), 6);
    let stored = answers.iter().filter(|a| a.explanation.is_lookup()).count();
    assert_eq!(stored, 3);
}

#[test]
fn without_rules_only_stored_facts_answer() {
    let (storage, _) = geography();
    let reasoner = Reasoner::new(storage);
    assert_eq!(reasoner.resolve(&in_warsaw()).unwrap().count(), 1);
}

#[test]
fn answers_are_pulled_lazily() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage);
    let first: Vec<_> = reasoner.resolve(&located_in()).unwrap().take(1).collect();
    assert_eq!(first.len(), 1);
    assert!(first[0].is_ok());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn conclusions_stay_private_by_default() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage);
    let _ = reasoner.resolve(&located_in()).unwrap().count();
    assert_eq!(reasoner.storage().graph().inferred_count(), 0);
}

#[test]
fn persistent_conclusions_are_written_once() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage).with_config(ReasonerConfig::persistent());

    assert_eq!(reasoner.resolve(&located_in()).unwrap().count(), 6);
    assert_eq!(reasoner.storage().graph().inferred_count(), 3);

    assert_eq!(reasoner.resolve(&located_in()).unwrap().count(), 6);
    assert_eq!(reasoner.storage().graph().inferred_count(), 3);
}

#[test]
fn strict_validation_accepts_complete_explanations() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage).with_config(ReasonerConfig::strict());
    let answers: Result<Vec<_>> = reasoner.resolve(&located_in()).unwrap().collect();
    assert_eq!(answers.unwrap().len(), 6);
}

#[test]
fn strict_validation_checks_joins_of_connected_queries() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let reasoner = Reasoner::new(storage).with_config(ReasonerConfig::strict());
    let answers = reasoner
        .resolve(&in_warsaw())
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(answers.len(), 3);
    assert!(answers.iter().all(|a| a.explanation.check_connected()));
}

#[test]
fn strict_validation_allows_disconnected_queries() {
    let (storage, places) = geography();
    let reasoner = Reasoner::new(storage).with_config(ReasonerConfig::strict());
    let query = Conjunction::builder().isa("x", "city").isa("y", "country").build();
    let answers = reasoner
        .resolve(&query)
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(bound(&answers[0], "x"), places.warsaw);
    assert_eq!(bound(&answers[0], "y"), places.poland);
}

#[test]
fn explanation_depth_limit_names_the_rule() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let config = ReasonerConfig::default()
        .with_validate_explanations(true)
        .with_max_explanation_depth(1);
    let reasoner = Reasoner::new(storage).with_config(config);

    let error = reasoner
        .resolve(&in_warsaw())
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap_err();
    let ErrorKind::LimitExceeded(SemanticLimit::MaxExplanationDepth { limit, rule }) = error.kind else {
        panic!("unexpected error: {error}");
    };
    assert_eq!(limit, 1);
    assert_eq!(rule.as_deref(), Some("transitive-location"));
}

#[test]
fn iteration_limit_stops_recursion() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let reasoner =
        Reasoner::new(storage).with_config(ReasonerConfig::default().with_max_iterations(1));
    let result: Result<Vec<_>> = reasoner.resolve(&located_in()).unwrap().collect();
    let error = result.unwrap_err();
    assert!(matches!(
        error.kind,
        ErrorKind::LimitExceeded(SemanticLimit::MaxIterations { limit: 1 })
    ));
}
