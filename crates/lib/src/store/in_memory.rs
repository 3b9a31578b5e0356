//! In-memory document store backend.
//!
//! A URL-to-graph map behind an async `RwLock`. Parent containers are
//! auto-created on child creation so every document always has a readable
//! ancestor chain, and container listings are projected from the map's keys
//! at read time.

use super::{Document, DocumentLocks, DocumentStore, StoreError, is_container_url, parent_url};
use crate::Result;
use crate::graph::{Graph, Term, Triple};
use crate::op::Operation;
use crate::vocab;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// A URL→graph map backend.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<BTreeMap<String, Graph>>,
    locks: DocumentLocks,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents, containers included.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// All stored document URLs in order.
    pub async fn document_urls(&self) -> Vec<String> {
        self.documents.read().await.keys().cloned().collect()
    }

    /// Replace a document's graph unconditionally, creating it if needed.
    ///
    /// Replace semantics bypass the create/update split; the reference HTTP
    /// server uses this for PUT without `If-None-Match`.
    pub(crate) async fn put_graph(&self, url: &str, graph: Graph) {
        let _guard = self.locks.acquire(url).await;
        let mut documents = self.documents.write().await;
        documents.insert(
            url.to_string(),
            graph.without_predicate(vocab::LDP_CONTAINS),
        );
        ensure_ancestors(&mut documents, url);
    }

    fn direct_children(documents: &BTreeMap<String, Graph>, url: &str) -> Vec<String> {
        documents
            .range(url.to_string()..)
            .take_while(|(key, _)| key.starts_with(url))
            .filter_map(|(key, _)| {
                let rest = &key[url.len()..];
                if rest.is_empty() {
                    return None;
                }
                match rest.find('/') {
                    None => Some(key.clone()),
                    Some(pos) if pos == rest.len() - 1 => Some(key.clone()),
                    Some(_) => None,
                }
            })
            .collect()
    }

    fn container_exists(documents: &BTreeMap<String, Graph>, url: &str) -> bool {
        documents
            .range(url.to_string()..)
            .take_while(|(key, _)| key.starts_with(url))
            .next()
            .is_some()
    }
}

fn ensure_ancestors(documents: &mut BTreeMap<String, Graph>, url: &str) {
    let mut current = parent_url(url);
    while let Some(container) = current {
        documents.entry(container.clone()).or_default();
        current = parent_url(&container);
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create(&self, url: &str, graph: Graph) -> Result<()> {
        let _guard = self.locks.acquire(url).await;
        let mut documents = self.documents.write().await;
        if documents.contains_key(url) {
            return Err(StoreError::already_exists(url).into());
        }
        debug!(url, triples = graph.len(), "creating document");
        documents.insert(
            url.to_string(),
            graph.without_predicate(vocab::LDP_CONTAINS),
        );
        ensure_ancestors(&mut documents, url);
        Ok(())
    }

    async fn read(&self, url: &str) -> Result<Document> {
        let documents = self.documents.read().await;
        if is_container_url(url) {
            if !Self::container_exists(&documents, url) {
                return Err(StoreError::not_found(url).into());
            }
            let mut graph = documents
                .get(url)
                .map(|g| g.without_predicate(vocab::LDP_CONTAINS))
                .unwrap_or_default();
            graph.insert(Triple::new(
                url,
                vocab::RDF_TYPE,
                Term::named(vocab::LDP_CONTAINER),
            ));
            for child in Self::direct_children(&documents, url) {
                graph.insert(Triple::new(url, vocab::LDP_CONTAINS, Term::named(child)));
            }
            return Ok(Document::new(url, graph));
        }
        documents
            .get(url)
            .map(|graph| Document::new(url, graph.clone()))
            .ok_or_else(|| StoreError::not_found(url).into())
    }

    async fn update(&self, url: &str, operations: &[Operation]) -> Result<()> {
        let _guard = self.locks.acquire(url).await;
        let mut documents = self.documents.write().await;
        let graph = documents
            .get_mut(url)
            .ok_or_else(|| StoreError::not_found(url))?;
        debug!(url, operations = operations.len(), "updating document");
        for operation in operations {
            operation.apply_to_graph(graph);
        }
        // An operation could have smuggled in a containment triple; listings
        // are always re-derived on read.
        *graph = graph.without_predicate(vocab::LDP_CONTAINS);
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let _guard = self.locks.acquire(url).await;
        let mut documents = self.documents.write().await;
        if is_container_url(url) {
            let doomed: Vec<String> = documents
                .range(url.to_string()..)
                .take_while(|(key, _)| key.starts_with(url))
                .map(|(key, _)| key.clone())
                .collect();
            if doomed.is_empty() {
                return Err(StoreError::not_found(url).into());
            }
            for key in doomed {
                documents.remove(&key);
            }
            return Ok(());
        }
        documents
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(url).into())
    }
}
