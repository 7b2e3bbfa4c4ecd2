//! Integration tests for labels, values and concepts
//!
//! Tests construction, comparison, ordering and display.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use deduce_foundation::{Concept, Label, ThingId, Value, ValueType};
use proptest::prelude::*;

// =============================================================================
// Labels
// =============================================================================

#[test]
fn plain_label() {
    let label = Label::of("city");
    assert_eq!(label.name(), "city");
    assert_eq!(label.scope(), None);
    assert!(!label.is_scoped());
    assert_eq!(label.to_string(), "city");
}

#[test]
fn scoped_label() {
    let role = Label::scoped("employment", "employee");
    assert_eq!(role.name(), "employee");
    assert_eq!(role.scope(), Some("employment"));
    assert!(role.is_scoped());
    assert_eq!(role.to_string(), "employment:employee");
    assert_ne!(role, Label::of("employee"));
}

// =============================================================================
// Values
// =============================================================================

#[test]
fn value_types() {
    assert_eq!(Value::from(true).value_type(), ValueType::Boolean);
    assert_eq!(Value::from(3).value_type(), ValueType::Long);
    assert_eq!(Value::from(2.5).value_type(), ValueType::Double);
    assert_eq!(Value::from("Warsaw").value_type(), ValueType::String);
    assert_eq!(ValueType::String.to_string(), "string");
}

#[test]
fn numeric_values_compare_across_types() {
    assert_eq!(Value::Long(2).compare(&Value::Double(2.5)), Some(Ordering::Less));
    assert_eq!(Value::Double(3.0).compare(&Value::Long(3)), Some(Ordering::Equal));
    assert_eq!(Value::from("a").compare(&Value::Long(1)), None);
}

#[test]
fn value_display() {
    assert_eq!(Value::from("Poland").to_string(), "\"Poland\"");
    assert_eq!(Value::Long(7).to_string(), "7");
    assert_eq!(Value::from(false).to_string(), "false");
}

#[test]
fn values_hash_and_order() {
    let set: HashSet<Value> = [Value::Long(1), Value::Long(1), Value::Double(1.0)]
        .into_iter()
        .collect();
    // Long and double are distinct values even when numerically equal.
    assert_eq!(set.len(), 2);

    let ordered: BTreeSet<Value> = [Value::from("b"), Value::from(true), Value::from("a")]
        .into_iter()
        .collect();
    assert_eq!(ordered.into_iter().next(), Some(Value::Boolean(true)));
}

// =============================================================================
// Concepts
// =============================================================================

#[test]
fn thing_concepts() {
    let name = Concept::Thing {
        id: ThingId(4),
        type_label: Label::of("name"),
        value: Some(Value::from("Warsaw")),
    };
    assert_eq!(name.thing_id(), Some(ThingId(4)));
    assert_eq!(name.type_label(), &Label::of("name"));
    assert_eq!(name.value(), Some(&Value::from("Warsaw")));
    assert_eq!(name.to_string(), "name#4=\"Warsaw\"");
}

#[test]
fn type_concepts() {
    let ty = Concept::Type(Label::of("city"));
    assert_eq!(ty.thing_id(), None);
    assert_eq!(ty.type_label(), &Label::of("city"));
    assert_eq!(ty.value(), None);
}

proptest! {
    #[test]
    fn long_comparison_matches_integers(a in any::<i64>(), b in any::<i64>()) {
        prop_assert_eq!(Value::Long(a).compare(&Value::Long(b)), Some(a.cmp(&b)));
    }

    #[test]
    fn compare_is_antisymmetric(a in -1000i64..1000, b in -1000.0f64..1000.0) {
        let left = Value::Long(a).compare(&Value::Double(b));
        let right = Value::Double(b).compare(&Value::Long(a));
        prop_assert_eq!(left.map(Ordering::reverse), right);
    }
}
