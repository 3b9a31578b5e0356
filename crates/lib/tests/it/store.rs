//! DocumentStore backend behavior, in-memory and over HTTP.

use crate::helpers::{MOVIES, NAME, authored, date, new_movie, seed};
use graft::store::{DocumentStore, HttpStore, InMemoryStore, server::DocumentServer};
use graft::vocab;
use graft::{Graph, Operation, Term, Triple};
use std::sync::Arc;

const DOC: &str = "http://pod.example/movies/spirited-away";
const RESOURCE: &str = "http://pod.example/movies/spirited-away#it";

#[tokio::test]
async fn in_memory_create_and_read_round_trip() {
    let store = InMemoryStore::new();
    seed(&store, DOC, &new_movie(RESOURCE, "Spirited Away", date(1))).await;

    let document = store.read(DOC).await.unwrap();
    assert_eq!(document.url, DOC);
    assert_eq!(
        document.graph.first_object(RESOURCE, NAME),
        Some(&Term::literal("Spirited Away"))
    );

    let error = store.create(DOC, Graph::new()).await.unwrap_err();
    assert!(error.is_conflict());
}

#[tokio::test]
async fn in_memory_creates_ancestor_containers() {
    let store = InMemoryStore::new();
    seed(&store, DOC, &new_movie(RESOURCE, "Spirited Away", date(1))).await;

    let movies = store.read(MOVIES).await.unwrap();
    assert!(movies.is_container());
    assert!(movies.graph.types_of(MOVIES).contains(&vocab::LDP_CONTAINER));
    assert_eq!(movies.children(), vec![DOC.to_string()]);

    let root = store.read("http://pod.example/").await.unwrap();
    assert_eq!(root.children(), vec![MOVIES.to_string()]);
}

#[tokio::test]
async fn in_memory_rejects_containment_writes() {
    let store = InMemoryStore::new();
    let mut graph = authored(&new_movie(RESOURCE, "Spirited Away", date(1)));
    graph.insert(Triple::new(
        DOC,
        vocab::LDP_CONTAINS,
        Term::named("http://pod.example/movies/forged"),
    ));
    store.create(DOC, graph).await.unwrap();

    let document = store.read(DOC).await.unwrap();
    assert!(document.graph.objects(DOC, vocab::LDP_CONTAINS).is_empty());
}

#[tokio::test]
async fn in_memory_update_applies_operations_in_order() {
    let store = InMemoryStore::new();
    seed(&store, DOC, &new_movie(RESOURCE, "Spirited Away", date(1))).await;

    store
        .update(
            DOC,
            &[
                Operation::set(RESOURCE, NAME, vec![Term::literal("Sen to Chihiro")], date(2)),
                Operation::unset(RESOURCE, NAME, date(3)),
            ],
        )
        .await
        .unwrap();

    let document = store.read(DOC).await.unwrap();
    assert!(document.graph.objects(RESOURCE, NAME).is_empty());

    let error = store
        .update("http://pod.example/movies/missing", &[])
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn in_memory_container_delete_is_recursive() {
    let store = InMemoryStore::new();
    seed(&store, DOC, &new_movie(RESOURCE, "Spirited Away", date(1))).await;

    store.delete(MOVIES).await.unwrap();
    assert!(store.read_if_exists(DOC).await.unwrap().is_none());
    assert!(store.read_if_exists(MOVIES).await.unwrap().is_none());

    let error = store.delete(MOVIES).await.unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn read_if_exists_maps_absence_to_none() {
    let store = InMemoryStore::new();
    assert!(store.read_if_exists(DOC).await.unwrap().is_none());
}

#[tokio::test]
async fn http_store_round_trips_against_the_reference_server() {
    let server = DocumentServer::start("127.0.0.1:0").await.unwrap();
    let store = HttpStore::new();
    let doc_url = format!("{}movies/spirited-away", server.base_url());
    let resource = format!("{doc_url}#it");

    store
        .create(&doc_url, authored(&new_movie(&resource, "Spirited Away", date(1))))
        .await
        .unwrap();
    let error = store.create(&doc_url, Graph::new()).await.unwrap_err();
    assert!(error.is_conflict());

    let document = store.read(&doc_url).await.unwrap();
    assert_eq!(
        document.graph.first_object(&resource, NAME),
        Some(&Term::literal("Spirited Away"))
    );

    store
        .update(
            &doc_url,
            &[Operation::set(
                &resource,
                NAME,
                vec![Term::literal("Sen to Chihiro")],
                date(2),
            )],
        )
        .await
        .unwrap();
    let document = store.read(&doc_url).await.unwrap();
    assert_eq!(
        document.graph.first_object(&resource, NAME),
        Some(&Term::literal("Sen to Chihiro"))
    );

    store.delete(&doc_url).await.unwrap();
    let error = store.read(&doc_url).await.unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn http_container_reads_list_children() {
    let backing = Arc::new(InMemoryStore::new());
    let server = DocumentServer::start_with_store("127.0.0.1:0", backing)
        .await
        .unwrap();
    let store = HttpStore::new();
    let container = format!("{}movies/", server.base_url());
    let doc_url = format!("{container}spirited-away");
    let resource = format!("{doc_url}#it");

    store
        .create(&doc_url, authored(&new_movie(&resource, "Spirited Away", date(1))))
        .await
        .unwrap();

    let listing = store.read(&container).await.unwrap();
    assert_eq!(listing.children(), vec![doc_url]);
}

#[tokio::test]
async fn http_patch_against_a_missing_document_is_not_found() {
    let server = DocumentServer::start("127.0.0.1:0").await.unwrap();
    let store = HttpStore::new();
    let doc_url = format!("{}movies/missing", server.base_url());

    let error = store
        .update(
            &doc_url,
            &[Operation::set(
                "http://pod.example/x",
                NAME,
                vec![Term::literal("x")],
                date(1),
            )],
        )
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn http_store_rejects_invalid_urls() {
    let store = HttpStore::new();
    let error = store.read("not a url").await.unwrap_err();
    assert!(!error.is_not_found());
    assert_eq!(error.module(), "store");
}
