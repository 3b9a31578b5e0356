//! Operation log behavior: minting, self-description, decoding, patches.

use crate::helpers::{NAME, date, new_movie};
use graft::op::{self, UpdateBuilder};
use graft::vocab;
use graft::{Graph, Operation, Term, Triple};

const RESOURCE: &str = "http://pod.example/movies/spirited-away#it";

#[test]
fn equal_operations_mint_equal_urls() {
    let a = Operation::set(RESOURCE, NAME, vec![Term::literal("Spirited Away")], date(1));
    let b = Operation::set(RESOURCE, NAME, vec![Term::literal("Spirited Away")], date(1));
    assert_eq!(a.url(), b.url());

    // Any differing input changes the identity.
    let other_value = Operation::set(RESOURCE, NAME, vec![Term::literal("Ponyo")], date(1));
    let other_date = Operation::set(RESOURCE, NAME, vec![Term::literal("Spirited Away")], date(2));
    let unset = Operation::unset(RESOURCE, NAME, date(1));
    assert_ne!(a.url(), other_value.url());
    assert_ne!(a.url(), other_date.url());
    assert_ne!(a.url(), unset.url());
}

#[test]
fn operation_urls_are_derived_from_the_resource() {
    let operation = Operation::set(RESOURCE, NAME, vec![Term::literal("x")], date(1));
    assert!(operation.url().starts_with(RESOURCE));
    assert!(operation.url().contains("-operation-"));
}

#[test]
fn set_replaces_all_values_for_the_property() {
    let mut graph = Graph::new();
    Operation::set(RESOURCE, NAME, vec![Term::literal("old")], date(1)).apply_to_graph(&mut graph);
    Operation::set(
        RESOURCE,
        NAME,
        vec![Term::literal("new a"), Term::literal("new b")],
        date(2),
    )
    .apply_to_graph(&mut graph);

    let names: Vec<&str> = graph
        .objects(RESOURCE, NAME)
        .into_iter()
        .map(Term::lexical_form)
        .collect();
    assert_eq!(names, vec!["new a", "new b"]);
}

#[test]
fn unset_removes_the_property_entirely() {
    let mut graph = Graph::new();
    Operation::set(RESOURCE, NAME, vec![Term::literal("x")], date(1)).apply_to_graph(&mut graph);
    Operation::unset(RESOURCE, NAME, date(2)).apply_to_graph(&mut graph);
    assert!(graph.objects(RESOURCE, NAME).is_empty());
}

#[test]
fn document_operations_round_trip_through_decoding() {
    let mut graph = Graph::new();
    let operations = new_movie(RESOURCE, "Spirited Away", date(1));
    for operation in &operations {
        for description in operation.document_operations() {
            description.apply_to_graph(&mut graph);
        }
    }

    let decoded = op::operations_in_graph(&graph).unwrap();
    assert_eq!(decoded.len(), operations.len());
    for original in &operations {
        let found = decoded.iter().find(|o| o.url() == original.url()).unwrap();
        assert_eq!(found.resource_url(), original.resource_url());
        assert_eq!(found.date(), original.date());
        assert_eq!(found.kind(), original.kind());
    }
}

#[test]
fn decoding_rejects_operations_missing_fields() {
    let mut graph = Graph::new();
    let op_url = format!("{RESOURCE}-operation-deadbeef00000000");
    graph.insert(Triple::new(
        &op_url,
        vocab::RDF_TYPE,
        Term::named(vocab::CRDT_SET_PROPERTY_OPERATION),
    ));
    graph.insert(Triple::new(&op_url, vocab::CRDT_PROPERTY, Term::named(NAME)));

    let error = op::operations_in_graph(&graph).unwrap_err();
    assert!(error.is_missing_field());
}

#[test]
fn decoding_ignores_unrelated_subjects() {
    let mut graph = Graph::new();
    graph.insert(Triple::new(
        RESOURCE,
        vocab::RDF_TYPE,
        Term::named("https://schema.org/Movie"),
    ));
    graph.insert(Triple::new(RESOURCE, NAME, Term::literal("Spirited Away")));
    assert!(op::operations_in_graph(&graph).unwrap().is_empty());
}

#[test]
fn decoded_operations_are_sorted_by_date_then_url() {
    let mut graph = Graph::new();
    let later = Operation::set(RESOURCE, NAME, vec![Term::literal("b")], date(2));
    let earlier = Operation::unset(RESOURCE, NAME, date(1));
    for operation in [&later, &earlier] {
        for description in operation.document_operations() {
            description.apply_to_graph(&mut graph);
        }
    }

    let decoded = op::operations_in_graph(&graph).unwrap();
    let urls: Vec<&str> = decoded.iter().map(Operation::url).collect();
    assert_eq!(urls, vec![earlier.url(), later.url()]);
}

#[test]
fn replaying_a_decoded_log_reproduces_the_document() {
    let operations = new_movie(RESOURCE, "Spirited Away", date(1));
    let mut original = Graph::new();
    for operation in &operations {
        operation.apply_to_graph(&mut original);
        for description in operation.document_operations() {
            description.apply_to_graph(&mut original);
        }
    }

    let mut replayed = Graph::new();
    for operation in op::operations_in_graph(&original).unwrap() {
        operation.apply_to_graph(&mut replayed);
        for description in operation.document_operations() {
            description.apply_to_graph(&mut replayed);
        }
    }
    assert_eq!(original, replayed);
}

#[test]
fn update_builder_cancels_opposing_edits() {
    let keep = Triple::new(RESOURCE, NAME, Term::literal("kept"));
    let mut update = UpdateBuilder::new();
    update.delete(keep.clone());
    update.insert(keep);
    assert!(update.is_empty());
}

#[test]
fn sequential_operations_produce_a_net_patch() {
    let mut current = Graph::new();
    Operation::set(RESOURCE, NAME, vec![Term::literal("old")], date(1))
        .apply_to_graph(&mut current);

    // Two writes to the same property in one update: only the net change
    // should survive in the patch.
    let mut working = current.clone();
    let mut update = UpdateBuilder::new();
    for operation in [
        Operation::set(RESOURCE, NAME, vec![Term::literal("mid")], date(2)),
        Operation::set(RESOURCE, NAME, vec![Term::literal("final")], date(3)),
    ] {
        operation.apply_to_update(&mut update, &working);
        operation.apply_to_graph(&mut working);
    }

    let deletes: Vec<&Triple> = update.deletes().collect();
    let inserts: Vec<&Triple> = update.inserts().collect();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].object, Term::literal("old"));
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].object, Term::literal("final"));

    let sparql = update.to_sparql_update();
    assert!(sparql.contains("DELETE DATA"));
    assert!(sparql.contains("INSERT DATA"));
}
