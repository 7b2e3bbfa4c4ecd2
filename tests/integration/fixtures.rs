//! Shared graphs and rules.

use deduce_engine::pattern::{Conjunction, Reference};
use deduce_engine::{Answer, GraphStorage};
use deduce_foundation::{Concept, ThingId, ValueType};
use deduce_storage::{Graph, Schema};

/// The geography schema.
pub fn geography_schema() -> Schema {
    let mut schema = Schema::new();
    schema.define_entity("location", None).unwrap();
    schema.define_entity("city", Some("location")).unwrap();
    schema.define_entity("region", Some("location")).unwrap();
    schema.define_entity("country", Some("location")).unwrap();
    schema.define_entity("continent", Some("location")).unwrap();
    schema
        .define_relation("is-located-in", &["located", "location"], None)
        .unwrap();
    schema.define_plays("location", "is-located-in", "located").unwrap();
    schema.define_plays("location", "is-located-in", "location").unwrap();
    schema.define_attribute("name", ValueType::String, None).unwrap();
    schema.define_owns("location", "name").unwrap();
    schema
}

/// Ids of the stored places.
pub struct Places {
    pub warsaw: ThingId,
    pub masovia: ThingId,
    pub poland: ThingId,
    pub europe: ThingId,
}

/// Warsaw in Masovia in Poland in Europe, one stored step at a time.
pub fn geography() -> (GraphStorage, Places) {
    let mut graph = Graph::new(geography_schema());
    let mut place = |ty: &str, name: &str| {
        let id = graph.insert_entity(ty).unwrap();
        let name = graph.insert_attribute("name", name).unwrap();
        graph.insert_has(id, name).unwrap();
        id
    };
    let places = Places {
        warsaw: place("city", "Warsaw"),
        masovia: place("region", "Masovia"),
        poland: place("country", "Poland"),
        europe: place("continent", "Europe"),
    };
    for (inner, outer) in [
        (places.warsaw, places.masovia),
        (places.masovia, places.poland),
        (places.poland, places.europe),
    ] {
        graph
            .insert_relation("is-located-in", &[("located", inner), ("location", outer)])
            .unwrap();
    }
    (GraphStorage::new(graph), places)
}

/// `(located: $x, location: $z) isa is-located-in` whenever there is a
/// `$y` in between.
pub fn add_transitivity(storage: &mut GraphStorage) {
    let when = Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
        .isa("_", "is-located-in")
        .relation("_", &[(Some("located"), "y"), (Some("location"), "z")])
        .isa("_", "is-located-in")
        .build();
    let then = Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "z")])
        .isa("_", "is-located-in")
        .build();
    storage
        .add_rule("transitive-location", &when, &then)
        .unwrap();
}

/// `(located: $x, location: $y) isa is-located-in`.
pub fn located_in() -> Conjunction {
    Conjunction::builder()
        .relation("_", &[(Some("located"), "x"), (Some("location"), "y")])
        .isa("_", "is-located-in")
        .build()
}

/// The thing bound to `name` in an answer.
pub fn bound(answer: &Answer, name: &str) -> ThingId {
    answer
        .concepts
        .get(&Reference::name(name))
        .and_then(Concept::thing_id)
        .unwrap()
}
