//! Document storage port and backends.
//!
//! The [`DocumentStore`] trait is the storage-agnostic contract the sync
//! engine is written against: create/read/update/delete a named RDF graph by
//! URL, where `update` takes an ordered operation list rather than raw data.
//! Two backends ship with the crate, an in-memory map ([`InMemoryStore`]) and
//! an HTTP document server client ([`HttpStore`]), plus a reference axum
//! server ([`server::DocumentServer`]) for exercising the HTTP backend.
//!
//! Container semantics are uniform across backends: a URL ending in `/` is a
//! container, its `ldp:contains` listing is derived at read time and is never
//! accepted as ordinary data on writes.

pub mod errors;
pub mod http;
pub mod in_memory;
pub mod locks;
pub mod server;

pub use errors::StoreError;
pub use http::HttpStore;
pub use in_memory::InMemoryStore;
pub use locks::DocumentLocks;

use crate::Result;
use crate::graph::{Graph, Term};
use crate::op::Operation;
use crate::vocab;
use async_trait::async_trait;

/// A named RDF graph at a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub graph: Graph,
}

impl Document {
    pub fn new(url: impl Into<String>, graph: Graph) -> Self {
        Self {
            url: url.into(),
            graph,
        }
    }

    /// Whether this document is a container.
    pub fn is_container(&self) -> bool {
        is_container_url(&self.url)
    }

    /// Child resource URLs listed by this container's `ldp:contains` triples.
    pub fn children(&self) -> Vec<String> {
        self.graph
            .objects(&self.url, vocab::LDP_CONTAINS)
            .into_iter()
            .filter_map(Term::as_named)
            .map(str::to_string)
            .collect()
    }
}

/// A document is a container iff its URL ends in `/`.
pub fn is_container_url(url: &str) -> bool {
    url.ends_with('/')
}

/// The parent container URL, or `None` at (or above) the origin root.
pub fn parent_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let slash = trimmed.rfind('/')?;
    let parent = &url[..slash + 1];
    if parent.ends_with("//") || parent == url {
        return None;
    }
    Some(parent.to_string())
}

/// Storage-agnostic contract for a document store.
///
/// Implementations must be `Send + Sync`; the sync engine shares them across
/// concurrent read tasks. Updates are expressed as operation lists so every
/// backend converges on the same end state regardless of its native write
/// protocol, and so re-running an update with the same operations is
/// idempotent.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a new document. Fails with [`StoreError::DocumentAlreadyExists`]
    /// if the URL is taken. The `ldp:contains` predicate is stripped from the
    /// payload; container listings are derived, never written.
    async fn create(&self, url: &str, graph: Graph) -> Result<()>;

    /// Read a document. Fails with [`StoreError::DocumentNotFound`] if absent.
    /// Reading a container URL returns a synthetic graph whose `ldp:contains`
    /// triples reflect the children the backend currently knows about.
    async fn read(&self, url: &str) -> Result<Document>;

    /// Read a document, mapping absence to `None` instead of an error.
    async fn read_if_exists(&self, url: &str) -> Result<Option<Document>> {
        match self.read(url).await {
            Ok(document) => Ok(Some(document)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Apply an ordered list of operations to an existing document. Fails with
    /// [`StoreError::DocumentNotFound`] if the document is absent.
    async fn update(&self, url: &str, operations: &[Operation]) -> Result<()>;

    /// Remove a document (recursively, for containers).
    async fn delete(&self, url: &str) -> Result<()>;
}
