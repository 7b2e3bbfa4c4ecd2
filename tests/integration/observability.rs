//! Integration tests for tracing and explanation tools
//!
//! Tests the tracer as a resolution observer and the why/render views of
//! derived answers.

use std::rc::Rc;

use deduce_debug::explain::{render, summarize};
use deduce_debug::{ObservabilityConfig, Tracer, TracerConfig, WhyQuery, WhyResult};
use deduce_engine::pattern::Conjunction;
use deduce_engine::{Answer, Reasoner, ResolutionEvent};
use deduce_foundation::Result;

use crate::fixtures::{Places, add_transitivity, bound, geography};

fn in_warsaw() -> Conjunction {
    Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
        .isa("_", "is-located-in")
        .has_value("x", "name", "Warsaw")
        .build()
}

fn resolved() -> (Vec<Answer>, Places) {
    let (mut storage, places) = geography();
    add_transitivity(&mut storage);
    let answers = Reasoner::new(storage)
        .resolve(&in_warsaw())
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    (answers, places)
}

// =============================================================================
// Tracing
// =============================================================================

#[test]
fn tracer_records_a_whole_resolution() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let tracer = Rc::new(Tracer::new(TracerConfig::new().enabled()));
    let reasoner = Reasoner::new(storage).with_observer(tracer.clone());

    let count = reasoner.resolve(&in_warsaw()).unwrap().count();
    assert_eq!(count, 3);

    let buffer = tracer.buffer();
    assert_eq!(buffer.by_event_type("started").len(), 1);
    assert!(!buffer.by_event_type("cycle-cut").is_empty());
    assert!(!buffer.by_rule("transitive-location").is_empty());

    let last = buffer.last().unwrap();
    let ResolutionEvent::Finished { answers, iterations } = &last.event else {
        panic!("last event should be finished, got {}", last.event_type());
    };
    assert_eq!(*answers, 3);
    assert!(*iterations >= 2);
    assert_eq!(
        buffer.by_event_type("iteration").len(),
        usize::try_from(*iterations).unwrap()
    );
}

#[test]
fn disabled_tracer_records_nothing() {
    let (mut storage, _) = geography();
    add_transitivity(&mut storage);
    let tracer = Rc::new(Tracer::disabled());
    let reasoner = Reasoner::new(storage).with_observer(tracer.clone());
    let _ = reasoner.resolve(&in_warsaw()).unwrap().count();
    assert!(tracer.buffer().is_empty());
}

#[test]
fn trace_output_is_readable() {
    let (storage, _) = geography();
    let tracer = Rc::new(ObservabilityConfig::enabled().tracer());
    let reasoner = Reasoner::new(storage).with_observer(tracer.clone());
    let _ = reasoner.resolve(&in_warsaw()).unwrap().count();

    let text = tracer.format_all();
    assert!(text.contains("RESOLVE"));
    assert!(text.contains("DONE 1 answers"));
}

// =============================================================================
// Explanations
// =============================================================================

#[test]
fn stored_answers_need_no_rule() {
    let (answers, places) = resolved();
    let masovia = answers.iter().find(|a| bound(a, "y") == places.masovia).unwrap();
    assert!(matches!(WhyQuery::new(8).why(masovia), WhyResult::Stored));
}

#[test]
fn derivation_chain_follows_nested_rules() {
    let (answers, places) = resolved();
    let europe = answers.iter().find(|a| bound(a, "y") == places.europe).unwrap();

    let WhyResult::Derived(chain) = WhyQuery::new(8).why(europe) else {
        panic!("europe should be derived");
    };
    assert_eq!(chain.len(), 2);
    assert!(!chain.truncated);
    assert_eq!(chain.rules(), vec!["transitive-location", "transitive-location"]);

    let shallow = ObservabilityConfig::enabled().with_why_depth(1).why().why(europe);
    let WhyResult::Derived(chain) = shallow else {
        panic!("europe should be derived");
    };
    assert_eq!(chain.len(), 1);
    assert!(chain.truncated);
}

#[test]
fn summaries_count_rules_and_lookups() {
    let (answers, places) = resolved();
    let poland = answers.iter().find(|a| bound(a, "y") == places.poland).unwrap();
    let summary = summarize(poland);
    assert_eq!(summary.applications, 1);
    assert_eq!(summary.depth, 1);
    // two premises plus the name lookup
    assert_eq!(summary.lookups, 3);
    assert!(summary.rules.contains("transitive-location"));
}

#[test]
fn rendered_tree_shows_every_step() {
    let (answers, places) = resolved();
    let europe = answers.iter().find(|a| bound(a, "y") == places.europe).unwrap();

    let full = render(europe, 8);
    assert!(full.contains("by rule transitive-location"));
    assert!(full.contains("from storage"));
    assert!(full.contains("by join"));
    assert!(!full.contains("..."));

    let cut = render(europe, 0);
    assert!(cut.contains("..."));
}
