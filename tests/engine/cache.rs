//! Integration tests for the answer cache
//!
//! Tests the cache over real lookups: recording, replay under renaming,
//! and resuming a partially consumed entry.

use deduce_engine::pattern::{Conjunction, Reference};
use deduce_engine::{Answer, AnswerCache, AnswerStream, Concludable, GraphStorage, Storage, TypeHinter, extract};
use deduce_foundation::{Result, ValueType};
use deduce_storage::{Graph, Schema};

fn storage() -> GraphStorage {
    let mut schema = Schema::new();
    schema.define_entity("city", None).unwrap();
    schema
        .define_relation("road", &["from", "to"], None)
        .unwrap();
    schema.define_plays("city", "road", "from").unwrap();
    schema.define_plays("city", "road", "to").unwrap();
    schema.define_attribute("name", ValueType::String, None).unwrap();
    schema.define_owns("city", "name").unwrap();

    let mut graph = Graph::new(schema);
    let cities: Vec<_> = (0..4).map(|_| graph.insert_entity("city").unwrap()).collect();
    for pair in cities.windows(2) {
        graph
            .insert_relation("road", &[("from", pair[0]), ("to", pair[1])])
            .unwrap();
    }
    GraphStorage::new(graph)
}

/// Two chained roads, `a -> b -> c`, as one concludable each.
fn roads(storage: &GraphStorage) -> (Concludable, Concludable) {
    let conjunction = Conjunction::builder()
        .relation("_", &[(Some("from"), "a"), (Some("to"), "b")])
        .isa("_", "road")
        .relation("_", &[(Some("from"), "b"), (Some("to"), "c")])
        .isa("_", "road")
        .build();
    let hinted = TypeHinter::new(storage.schema()).hint(&conjunction).unwrap();
    let mut concludables = extract(&hinted).unwrap().into_iter().map(|c| c.into_inner());
    (concludables.next().unwrap(), concludables.next().unwrap())
}

fn record(cache: &mut AnswerCache, storage: &GraphStorage, query: &Concludable) -> AnswerStream {
    let lookup = storage.lookup(&query.to_conjunction()).unwrap();
    cache.record(query, Box::new(lookup.map(|concepts| concepts.map(Answer::lookup))))
}

#[test]
fn lookup_answers_are_recorded_once() {
    let storage = storage();
    let mut cache = AnswerCache::new();
    let (query, _) = roads(&storage);
    let answers: Vec<_> = record(&mut cache, &storage, &query)
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(answers.len(), 3);
    assert_eq!(cache.entry_size(&query), 3);
    assert!(cache.is_complete(&query));

    let replayed = cache.get_answer_stream(&query).unwrap().count();
    assert_eq!(replayed, 3);
}

#[test]
fn replay_renames_into_the_reader() {
    let storage = storage();
    let mut cache = AnswerCache::new();
    let (first, second) = roads(&storage);
    let _ = record(&mut cache, &storage, &first).count();

    // b -> c is the same query as a -> b under renaming
    let answers: Vec<_> = cache
        .get_answer_stream(&second)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(cache.len(), 1);
    assert!(answers.iter().all(|a| {
        a.concepts.contains(&Reference::name("b"))
            && a.concepts.contains(&Reference::name("c"))
            && !a.concepts.contains(&Reference::name("a"))
    }));
}

#[test]
fn partial_entries_resume() {
    let storage = storage();
    let mut cache = AnswerCache::new();
    let (query, _) = roads(&storage);
    let first = record(&mut cache, &storage, &query).take(1).count();
    assert_eq!(first, 1);
    assert!(!cache.is_complete(&query));

    let rest = cache.get_answer_stream(&query).unwrap().count();
    assert_eq!(rest, 3);
    assert!(cache.is_complete(&query));
}

#[test]
fn chained_roads_join_on_the_shared_city() {
    let storage = storage();
    let mut cache = AnswerCache::new();
    let (first, second) = roads(&storage);
    let _ = record(&mut cache, &storage, &second).count();
    let first = cache.get_answer_stream(&first).unwrap();

    let joined: Vec<_> = AnswerCache::join(first, |_| {
        Ok(cache.get_answer_stream(&second).into_iter().flatten())
    })
    .collect::<Result<_>>()
    .unwrap();
    assert_eq!(joined.len(), 2);
    assert!(joined.iter().all(|a| a.explanation.check_connected()));
}
