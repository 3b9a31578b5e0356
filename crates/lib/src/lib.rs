//!
//! Graft: a convergent synchronization engine for RDF document stores.
//!
//! Graft reconciles two independently mutable replicas of the same set of RDF
//! resources (typically a local cache and a remote HTTP document server)
//! using a self-describing, timestamp-ordered operation log that is persisted
//! as ordinary triples inside the documents it describes.
//!
//! ## Core Concepts
//!
//! * **Graphs (`graph::Graph`)**: An in-memory set of RDF triples, queryable by
//!   subject and predicate, with structural diffing. A *document* is a graph at
//!   a URL; a document whose URL ends in `/` is a *container* and lists child
//!   documents through derived `ldp:contains` triples.
//! * **Operations (`op::Operation`)**: Immutable, timestamped descriptions of a
//!   single property mutation (Set or Unset). Every operation can apply itself
//!   directly to a graph or emit a DELETE/INSERT patch fragment, and describes
//!   itself as RDF so the log round-trips through storage as plain data.
//! * **Metadata (`meta`)**: Per-resource `createdAt`/`updatedAt` records and
//!   `Tombstone` markers that decide operation freshness and keep deleted
//!   resources from being resurrected by stale operations.
//! * **Document stores (`store::DocumentStore`)**: A pluggable storage port
//!   with in-memory and HTTP backends. Updates take operation lists rather
//!   than raw data, so both backends converge on the same end state.
//! * **Type index (`typeindex`)**: A discovery registry mapping RDF classes to
//!   the containers where their instances live.
//! * **Sync engine (`sync::SyncEngine`)**: The pull/merge/push orchestrator.
//!   Merges are last-writer-wins by the timestamp carried in each operation,
//!   deduplicated by content-derived operation URLs.

pub mod graph;
pub mod meta;
pub mod op;
pub mod store;
pub mod sync;
pub mod typeindex;
pub mod vocab;

pub use graph::{Graph, Literal, Term, Triple};
pub use op::Operation;
pub use store::{Document, DocumentStore};
pub use sync::{SyncEngine, SyncStatus};

/// Result type used throughout the Graft library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Graft library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured graph and RDF text errors from the graph module
    #[error(transparent)]
    Graph(#[from] graph::GraphError),

    /// Structured operation log errors from the op module
    #[error(transparent)]
    Operation(#[from] op::OperationError),

    /// Structured metadata errors from the meta module
    #[error(transparent)]
    Meta(#[from] meta::MetaError),

    /// Structured storage errors from the store module
    #[error(transparent)]
    Store(#[from] store::StoreError),

    /// Structured synchronization errors from the sync module
    #[error(transparent)]
    Sync(#[from] sync::SyncError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Graph(_) => "graph",
            Error::Operation(_) => "op",
            Error::Meta(_) => "meta",
            Error::Store(_) => "store",
            Error::Sync(_) => "sync",
        }
    }

    /// Check if this error indicates a document was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_not_found(),
            Error::Sync(sync_err) => sync_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (document already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_already_exists(),
            _ => false,
        }
    }

    /// Check if this error indicates stored data that could not be decoded.
    pub fn is_malformed(&self) -> bool {
        match self {
            Error::Graph(graph_err) => graph_err.is_parse_error(),
            Error::Operation(_) => true,
            Error::Meta(_) => true,
            Error::Store(store_err) => store_err.is_malformed(),
            _ => false,
        }
    }

    /// Check if this error is a transport/network failure.
    pub fn is_network_error(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_network_error(),
            _ => false,
        }
    }

    /// Check if this error indicates a cancelled sync run.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_cancelled(),
            _ => false,
        }
    }
}
