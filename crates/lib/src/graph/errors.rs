//! Error types for graph construction and RDF text parsing.

use thiserror::Error;

/// Errors that can occur while building graphs or parsing RDF text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// A line of N-Triples text could not be parsed.
    #[error("parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A literal could not be interpreted as an `xsd:dateTime`.
    #[error("invalid xsd:dateTime literal: {0}")]
    InvalidDate(String),
}

impl GraphError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        GraphError::Parse {
            line,
            reason: reason.into(),
        }
    }

    /// Check if this is a text parse error.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, GraphError::Parse { .. })
    }
}
