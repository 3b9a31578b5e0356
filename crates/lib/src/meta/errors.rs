//! Error types for decoding stored metadata and tombstones.

use thiserror::Error;

/// Errors that can occur while decoding metadata resources from a graph.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MetaError {
    /// A metadata or tombstone resource is missing a required field.
    #[error("metadata resource {subject} is missing required field <{field}>")]
    MissingField { subject: String, field: String },

    /// A metadata or tombstone resource carries an unparseable date.
    #[error("metadata resource {subject} has invalid date: {value}")]
    InvalidDate { subject: String, value: String },
}

impl MetaError {
    pub(crate) fn missing(subject: impl Into<String>, field: impl Into<String>) -> Self {
        MetaError::MissingField {
            subject: subject.into(),
            field: field.into(),
        }
    }
}
