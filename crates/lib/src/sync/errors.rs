//! Error types for the synchronization engine.

use thiserror::Error;

/// Errors that can occur during a sync run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    /// The run was cancelled through its [`CancellationToken`](super::CancellationToken).
    ///
    /// Cancellation is only observed between documents, never mid-document,
    /// so both replicas stay coherent.
    #[error("synchronization cancelled")]
    Cancelled,

    /// A document operation failed and aborted the run.
    ///
    /// Carries the originating URL so the caller can tell which
    /// replica/document broke. `DocumentNotFound` never surfaces this way; it
    /// is handled at single-document scope.
    #[error("sync failed for {url}: {source}")]
    Document {
        url: String,
        #[source]
        source: Box<crate::Error>,
    },

    /// A concurrent read task panicked or was aborted.
    #[error("sync read task failed: {0}")]
    TaskJoin(String),
}

impl SyncError {
    /// Check if this error indicates a cancelled run.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }

    /// Check if the underlying failure was a missing document.
    pub fn is_not_found(&self) -> bool {
        match self {
            SyncError::Document { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// The document URL this error originated from, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            SyncError::Document { url, .. } => Some(url),
            _ => None,
        }
    }
}
