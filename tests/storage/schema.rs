//! Integration tests for the schema
//!
//! Tests type definitions, inheritance, roles, players and owners.

use deduce_foundation::{Label, ValueType};
use deduce_storage::{Schema, TypeKind};

fn geography() -> Schema {
    let mut schema = Schema::new();
    schema.define_entity("location", None).unwrap();
    schema.define_entity("city", Some("location")).unwrap();
    schema.define_entity("country", Some("location")).unwrap();
    schema
        .define_relation("is-located-in", &["located", "location"], None)
        .unwrap();
    schema
        .define_relation("is-capital-of", &[], Some("is-located-in"))
        .unwrap();
    schema
        .define_plays("location", "is-located-in", "located")
        .unwrap();
    schema
        .define_plays("location", "is-located-in", "location")
        .unwrap();
    schema.define_attribute("name", ValueType::String, None).unwrap();
    schema.define_owns("location", "name").unwrap();
    schema
}

#[test]
fn kinds_and_value_types() {
    let schema = geography();
    assert_eq!(schema.kind(&Label::of("city")), Some(TypeKind::Entity));
    assert_eq!(schema.kind(&Label::of("is-located-in")), Some(TypeKind::Relation));
    assert_eq!(
        schema.kind(&Label::scoped("is-located-in", "located")),
        Some(TypeKind::Role)
    );
    assert_eq!(schema.value_type(&Label::of("name")), Some(ValueType::String));
    assert_eq!(schema.value_type(&Label::of("city")), None);
}

#[test]
fn subtypes_are_transitive_and_reflexive() {
    let schema = geography();
    let subtypes = schema.subtypes(&Label::of("location"));
    assert_eq!(subtypes.len(), 3);
    assert!(subtypes.contains(&Label::of("location")));
    assert!(schema.subtypes(&Label::of("planet")).is_empty());
    assert!(schema.is_subtype_of(&Label::of("city"), &Label::of("location")));
    assert!(!schema.is_subtype_of(&Label::of("location"), &Label::of("city")));
    assert_eq!(
        schema.supertypes(&Label::of("city")),
        vec![Label::of("city"), Label::of("location")]
    );
}

#[test]
fn roles_are_inherited() {
    let schema = geography();
    let capital = Label::of("is-capital-of");
    assert_eq!(schema.roles(&capital).len(), 2);
    assert_eq!(
        schema.role(&capital, "located"),
        Some(Label::scoped("is-located-in", "located"))
    );
    assert_eq!(
        schema.relations_with_role(&Label::scoped("is-located-in", "location")),
        [Label::of("is-located-in"), capital].into_iter().collect()
    );
    assert_eq!(schema.roles_named("located").len(), 1);
}

#[test]
fn players_and_owners_include_subtypes() {
    let schema = geography();
    let players = schema.players(&Label::scoped("is-located-in", "located"));
    assert!(players.contains(&Label::of("city")));
    assert!(players.contains(&Label::of("country")));
    assert!(schema.owners(&Label::of("name")).contains(&Label::of("city")));
    assert_eq!(schema.attribute_types().len(), 1);
}

#[test]
fn invalid_definitions_fail() {
    let mut schema = geography();
    assert!(schema.define_entity("city", None).is_err());
    assert!(schema.define_entity("town", Some("name")).is_err());
    assert!(schema.define_relation("empty", &[], None).is_err());
    assert!(schema.define_owns("city", "location").is_err());
    assert!(schema.define_plays("city", "is-located-in", "ruler").is_err());
    assert!(
        schema
            .define_attribute("short-name", ValueType::Long, Some("name"))
            .is_err()
    );
}
