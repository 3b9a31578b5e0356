//! Error types for decoding stored operations.

use thiserror::Error;

/// Errors that can occur while decoding operations embedded in a graph.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OperationError {
    /// A stored operation is missing a required field.
    #[error("operation {url} is missing required field '{field}'")]
    MissingField { url: String, field: &'static str },

    /// A stored operation carries an unparseable date.
    #[error("operation {url} has invalid date: {value}")]
    InvalidDate { url: String, value: String },
}

impl OperationError {
    pub(crate) fn missing(url: impl Into<String>, field: &'static str) -> Self {
        OperationError::MissingField {
            url: url.into(),
            field,
        }
    }

    /// Check if this error names a missing field.
    pub fn is_missing_field(&self) -> bool {
        matches!(self, OperationError::MissingField { .. })
    }
}
