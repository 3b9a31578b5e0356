//! Type-index decoding, discovery and registration minting.

use crate::helpers::{INDEX, MOVIE_CLASS, MOVIES, date, movie_index_graph};
use graft::store::Document;
use graft::typeindex::{ModelDescriptor, TypeIndex};
use graft::vocab;
use graft::{Graph, Term, Triple};

const RECIPE_CLASS: &str = "https://schema.org/Recipe";

fn models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("Movie", vec![MOVIE_CLASS.to_string()]),
        ModelDescriptor::new("Recipe", vec![RECIPE_CLASS.to_string()]),
    ]
}

fn registration(graph: &mut Graph, id: &str, class: &str, container: &str) {
    let subject = format!("{INDEX}#{id}");
    graph.insert(Triple::new(
        &subject,
        vocab::RDF_TYPE,
        Term::named(vocab::SOLID_TYPE_REGISTRATION),
    ));
    graph.insert(Triple::new(
        &subject,
        vocab::SOLID_FOR_CLASS,
        Term::named(class),
    ));
    graph.insert(Triple::new(
        &subject,
        vocab::SOLID_INSTANCE_CONTAINER,
        Term::named(container),
    ));
}

#[test]
fn decodes_registrations_from_a_document() {
    let document = Document::new(INDEX, movie_index_graph(MOVIES));
    let index = TypeIndex::from_document(&document);
    assert_eq!(index.url, INDEX);
    assert_eq!(index.registrations.len(), 1);
    assert!(index.covers(MOVIES, MOVIE_CLASS));
    assert!(!index.covers(MOVIES, RECIPE_CLASS));
}

#[test]
fn incomplete_registrations_are_skipped() {
    let mut graph = TypeIndex::initial_graph(INDEX);
    // Typed as a registration but missing its container.
    let subject = format!("{INDEX}#broken");
    graph.insert(Triple::new(
        &subject,
        vocab::RDF_TYPE,
        Term::named(vocab::SOLID_TYPE_REGISTRATION),
    ));
    graph.insert(Triple::new(
        &subject,
        vocab::SOLID_FOR_CLASS,
        Term::named(MOVIE_CLASS),
    ));
    registration(&mut graph, "ok", RECIPE_CLASS, "http://pod.example/recipes/");

    let index = TypeIndex::from_document(&Document::new(INDEX, graph));
    assert_eq!(index.registrations.len(), 1);
    assert_eq!(index.registrations[0].for_class, vec![RECIPE_CLASS]);
}

#[test]
fn matching_containers_merges_duplicate_targets() {
    let mut graph = TypeIndex::initial_graph(INDEX);
    registration(&mut graph, "a", MOVIE_CLASS, MOVIES);
    registration(&mut graph, "b", RECIPE_CLASS, MOVIES);
    registration(&mut graph, "c", RECIPE_CLASS, "http://pod.example/recipes/");
    registration(&mut graph, "d", "https://schema.org/Book", "http://pod.example/books/");

    let index = TypeIndex::from_document(&Document::new(INDEX, graph));
    let models = models();
    let containers = index.matching_containers(&models);
    assert_eq!(containers.len(), 2);

    let (first, first_models) = &containers[0];
    assert_eq!(first, MOVIES);
    let names: Vec<&str> = first_models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Movie", "Recipe"]);

    let (second, second_models) = &containers[1];
    assert_eq!(second, "http://pod.example/recipes/");
    assert_eq!(second_models.len(), 1);
}

#[test]
fn initial_graph_declares_an_unlisted_index() {
    let graph = TypeIndex::initial_graph(INDEX);
    let types = graph.types_of(INDEX);
    assert!(types.contains(&vocab::SOLID_TYPE_INDEX));
    assert!(types.contains(&vocab::SOLID_UNLISTED_DOCUMENT));
}

#[test]
fn registration_minting_is_deterministic() {
    let index = TypeIndex::new(INDEX);
    let classes = vec![MOVIE_CLASS.to_string()];
    let (a, operations) = index.registration_operations(MOVIES, &classes, date(1));
    let (b, _) = index.registration_operations(MOVIES, &classes, date(2));
    assert_eq!(a.url, b.url);

    let (other, _) = index.registration_operations("http://pod.example/films/", &classes, date(1));
    assert_ne!(a.url, other.url);

    // Applying the operations yields a registration the decoder accepts.
    let mut graph = TypeIndex::initial_graph(INDEX);
    for operation in &operations {
        operation.apply_to_graph(&mut graph);
    }
    let decoded = TypeIndex::from_document(&Document::new(INDEX, graph));
    assert!(decoded.covers(MOVIES, MOVIE_CLASS));
    assert_eq!(decoded.registrations[0].url, a.url);
}
