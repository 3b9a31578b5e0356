//! Error types for document storage backends.
//!
//! Every variant carries the originating URL so a failed sync run can name
//! which replica and document broke.

use thiserror::Error;

/// Errors that can occur in document store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The document does not exist. Recoverable: the sync engine treats this
    /// as "nothing to merge here yet" at single-document scope.
    #[error("document not found: {url}")]
    DocumentNotFound { url: String },

    /// A create hit an existing document. Surfaced as a caller-level error.
    #[error("document already exists: {url}")]
    DocumentAlreadyExists { url: String },

    /// Stored data could not be decoded.
    #[error("malformed document at {url}: {reason}")]
    MalformedDocument { url: String, reason: String },

    /// The URL itself could not be parsed.
    #[error("invalid document URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport failure talking to the backend.
    #[error("network error for {url}: {reason}")]
    Network { url: String, reason: String },

    /// The backend answered with a status the protocol does not expect.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },
}

impl StoreError {
    pub(crate) fn not_found(url: impl Into<String>) -> Self {
        StoreError::DocumentNotFound { url: url.into() }
    }

    pub(crate) fn already_exists(url: impl Into<String>) -> Self {
        StoreError::DocumentAlreadyExists { url: url.into() }
    }

    pub(crate) fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::MalformedDocument {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error indicates a missing document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::DocumentNotFound { .. })
    }

    /// Check if this error indicates a double-create.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::DocumentAlreadyExists { .. })
    }

    /// Check if this error indicates undecodable stored data.
    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreError::MalformedDocument { .. })
    }

    /// Check if this error is a transport failure.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            StoreError::Network { .. } | StoreError::UnexpectedStatus { .. }
        )
    }

    /// The document URL this error originated from.
    pub fn url(&self) -> &str {
        match self {
            StoreError::DocumentNotFound { url }
            | StoreError::DocumentAlreadyExists { url }
            | StoreError::MalformedDocument { url, .. }
            | StoreError::InvalidUrl { url, .. }
            | StoreError::Network { url, .. }
            | StoreError::UnexpectedStatus { url, .. } => url,
        }
    }
}
