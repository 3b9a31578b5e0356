//! HTTP document store backend.
//!
//! Talks to an HTTP document server using N-Triples bodies for reads and
//! creates, and `application/sparql-update` patches for updates. The protocol
//! has no native "replace" verb, so updates fetch the current document first
//! to compute the delete set. A 404 is always mapped to
//! [`StoreError::DocumentNotFound`], never surfaced as an application error.

use super::{Document, DocumentLocks, DocumentStore, StoreError};
use crate::Result;
use crate::graph::{Graph, ntriples};
use crate::op::{Operation, UpdateBuilder};
use crate::vocab;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

const CONTENT_TYPE_NTRIPLES: &str = "application/n-triples";
const CONTENT_TYPE_SPARQL_UPDATE: &str = "application/sparql-update";

/// A client for an HTTP document server.
#[derive(Debug, Default)]
pub struct HttpStore {
    client: reqwest::Client,
    locks: DocumentLocks,
}

impl HttpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-configured client (timeouts, proxies, auth middleware).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            locks: DocumentLocks::new(),
        }
    }

    fn checked(url: &str) -> Result<()> {
        Url::parse(url).map_err(|error| StoreError::InvalidUrl {
            url: url.to_string(),
            reason: error.to_string(),
        })?;
        Ok(())
    }

    fn network(url: &str, error: reqwest::Error) -> StoreError {
        StoreError::network(url, error.to_string())
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn create(&self, url: &str, graph: Graph) -> Result<()> {
        Self::checked(url)?;
        let body = ntriples::serialize(&graph.without_predicate(vocab::LDP_CONTAINS));
        debug!(url, "PUT document");
        let response = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_NTRIPLES)
            .header(reqwest::header::IF_NONE_MATCH, "*")
            .body(body)
            .send()
            .await
            .map_err(|e| Self::network(url, e))?;
        match response.status() {
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => {
                Err(StoreError::already_exists(url).into())
            }
            status if status.is_success() => Ok(()),
            status => Err(StoreError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into()),
        }
    }

    async fn read(&self, url: &str) -> Result<Document> {
        Self::checked(url)?;
        debug!(url, "GET document");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, CONTENT_TYPE_NTRIPLES)
            .send()
            .await
            .map_err(|e| Self::network(url, e))?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(StoreError::not_found(url).into())
            }
            status if status.is_success() => {
                let body = response.text().await.map_err(|e| Self::network(url, e))?;
                let graph = ntriples::parse(&body)
                    .map_err(|e| StoreError::malformed(url, e.to_string()))?;
                Ok(Document::new(url, graph))
            }
            status => Err(StoreError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into()),
        }
    }

    async fn update(&self, url: &str, operations: &[Operation]) -> Result<()> {
        Self::checked(url)?;
        // Fetch-before-patch under the per-document lock: the delete set has
        // to be computed against the state we are about to patch.
        let _guard = self.locks.acquire(url).await;
        let current = self.read(url).await?;

        let mut working = current.graph;
        let mut update = UpdateBuilder::new();
        for operation in operations {
            if operation.property() == vocab::LDP_CONTAINS {
                debug!(url, op = operation.url(), "dropping containment write");
                continue;
            }
            operation.apply_to_update(&mut update, &working);
            operation.apply_to_graph(&mut working);
        }
        if update.is_empty() {
            return Ok(());
        }

        debug!(url, operations = operations.len(), "PATCH document");
        let response = self
            .client
            .patch(url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_SPARQL_UPDATE)
            .body(update.to_sparql_update())
            .send()
            .await
            .map_err(|e| Self::network(url, e))?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(StoreError::not_found(url).into())
            }
            status if status.is_success() => Ok(()),
            status => Err(StoreError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into()),
        }
    }

    async fn delete(&self, url: &str) -> Result<()> {
        Self::checked(url)?;
        debug!(url, "DELETE document");
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| Self::network(url, e))?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(StoreError::not_found(url).into())
            }
            status if status.is_success() => Ok(()),
            status => Err(StoreError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into()),
        }
    }
}
