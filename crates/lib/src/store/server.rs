//! Reference HTTP document server.
//!
//! A small axum service exposing an [`InMemoryStore`] over the same protocol
//! the [`HttpStore`](super::HttpStore) client speaks: N-Triples bodies for GET
//! and PUT, `application/sparql-update` for PATCH. It exists so the HTTP
//! backend has a real counterparty in integration tests and demos; it is not
//! hardened for production use.

use super::in_memory::InMemoryStore;
use super::{DocumentStore, StoreError};
use crate::Result;
use crate::graph::{Graph, ntriples};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

const CONTENT_TYPE_NTRIPLES: &str = "application/n-triples";

/// A running document server bound to a local address.
pub struct DocumentServer {
    store: Arc<InMemoryStore>,
    address: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl DocumentServer {
    /// Start a server with a fresh empty store. Use port 0 to let the OS pick.
    pub async fn start(addr: &str) -> Result<Self> {
        Self::start_with_store(addr, Arc::new(InMemoryStore::new())).await
    }

    /// Start a server over an existing store.
    pub async fn start_with_store(addr: &str, store: Arc<InMemoryStore>) -> Result<Self> {
        let socket_addr: SocketAddr = addr.parse().map_err(|_| StoreError::InvalidUrl {
            url: addr.to_string(),
            reason: "not a socket address".to_string(),
        })?;
        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| StoreError::network(addr, e.to_string()))?;
        let address = listener
            .local_addr()
            .map_err(|e| StoreError::network(addr, e.to_string()))?;

        let router = Router::new()
            .fallback(handle_document)
            .with_state(store.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = result {
                warn!(%error, "document server exited with error");
            }
        });

        debug!(%address, "document server started");
        Ok(Self {
            store,
            address,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Root container URL of this server.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.address)
    }

    /// The store backing this server.
    pub fn store(&self) -> Arc<InMemoryStore> {
        self.store.clone()
    }

    /// Signal the server to shut down gracefully.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for DocumentServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_document(
    State(store): State<Arc<InMemoryStore>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "missing Host header").into_response();
    };
    let url = format!("http://{}{}", host, uri.path());

    match method {
        Method::GET => match store.read(&url).await {
            Ok(document) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, CONTENT_TYPE_NTRIPLES)],
                ntriples::serialize(&document.graph),
            )
                .into_response(),
            Err(error) => error_response(error),
        },
        Method::PUT => {
            let graph = match ntriples::parse(&body) {
                Ok(graph) => graph,
                Err(error) => {
                    return (StatusCode::BAD_REQUEST, error.to_string()).into_response();
                }
            };
            if headers.contains_key(header::IF_NONE_MATCH) {
                match store.create(&url, graph).await {
                    Ok(()) => StatusCode::CREATED.into_response(),
                    Err(error) if error.is_conflict() => {
                        StatusCode::PRECONDITION_FAILED.into_response()
                    }
                    Err(error) => error_response(error),
                }
            } else {
                store.put_graph(&url, graph).await;
                StatusCode::NO_CONTENT.into_response()
            }
        }
        Method::PATCH => match apply_patch(&store, &url, &body).await {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(PatchError::Parse(reason)) => {
                (StatusCode::BAD_REQUEST, reason).into_response()
            }
            Err(PatchError::Store(error)) => error_response(error),
        },
        Method::DELETE => match store.delete(&url).await {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(error) => error_response(error),
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn error_response(error: crate::Error) -> Response {
    if error.is_not_found() {
        StatusCode::NOT_FOUND.into_response()
    } else if error.is_conflict() {
        StatusCode::CONFLICT.into_response()
    } else {
        warn!(%error, "document server internal error");
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from(error.to_string()))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

enum PatchError {
    Parse(String),
    Store(crate::Error),
}

async fn apply_patch(store: &InMemoryStore, url: &str, body: &str) -> std::result::Result<(), PatchError> {
    let (deletes, inserts) = parse_sparql_update(body).map_err(PatchError::Parse)?;
    let current = store.read(url).await.map_err(PatchError::Store)?;

    let mut graph = current.graph;
    for triple in deletes.triples() {
        graph.remove(triple);
    }
    graph.insert_all(inserts.triples().cloned());
    store.put_graph(url, graph).await;
    Ok(())
}

/// Parse `DELETE DATA { ... }` / `INSERT DATA { ... }` blocks.
///
/// Brace matching respects quoted literals, so values containing braces do
/// not derail the scan.
fn parse_sparql_update(body: &str) -> std::result::Result<(Graph, Graph), String> {
    let mut deletes = Graph::new();
    let mut inserts = Graph::new();
    let mut rest = body.trim();

    while !rest.is_empty() {
        rest = rest.trim_start_matches(';').trim_start();
        if rest.is_empty() {
            break;
        }
        let is_delete = if let Some(after) = strip_keyword(rest, "DELETE DATA") {
            rest = after;
            true
        } else if let Some(after) = strip_keyword(rest, "INSERT DATA") {
            rest = after;
            false
        } else {
            return Err(format!("expected DELETE DATA or INSERT DATA near: {rest:.40}"));
        };

        let (block, remainder) = take_block(rest)?;
        let graph = ntriples::parse(block).map_err(|e| e.to_string())?;
        if is_delete {
            deletes.insert_all(graph.triples().cloned());
        } else {
            inserts.insert_all(graph.triples().cloned());
        }
        rest = remainder.trim_start();
    }
    Ok((deletes, inserts))
}

fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    if input.len() >= keyword.len() && input[..keyword.len()].eq_ignore_ascii_case(keyword) {
        Some(input[keyword.len()..].trim_start())
    } else {
        None
    }
}

fn take_block(input: &str) -> std::result::Result<(&str, &str), String> {
    let rest = input
        .strip_prefix('{')
        .ok_or_else(|| "expected '{' after DATA keyword".to_string())?;
    let mut in_string = false;
    let mut escaped = false;
    for (index, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '}' if !in_string => return Ok((&rest[..index], &rest[index + 1..])),
            _ => {}
        }
    }
    Err("unterminated block".to_string())
}
