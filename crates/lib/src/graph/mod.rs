//! In-memory RDF resource graphs.
//!
//! A [`Graph`] holds the triples of one document. Triples are kept in a
//! `BTreeSet` so iteration (and therefore serialization) is deterministic,
//! which is what makes replica comparison and idempotence checks cheap.

pub mod errors;
pub mod ntriples;

pub use errors::GraphError;

use crate::vocab;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A typed RDF literal.
///
/// The datatype is an XSD IRI; plain strings carry `xsd:string`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub datatype: String,
}

/// An RDF object term: either a reference to another resource or a literal.
///
/// The variant doubles as the "reference vs literal" marker that Set
/// operations carry for their values, so the flag can never desync from the
/// data it describes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    NamedNode(String),
    Literal(Literal),
}

impl Term {
    /// A reference to another resource.
    pub fn named(iri: impl Into<String>) -> Self {
        Term::NamedNode(iri.into())
    }

    /// A plain `xsd:string` literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            datatype: vocab::XSD_STRING.to_string(),
        })
    }

    /// A literal with an explicit datatype IRI.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            datatype: datatype.into(),
        })
    }

    /// An `xsd:dateTime` literal in RFC 3339 form with millisecond precision.
    pub fn date(date: &DateTime<Utc>) -> Self {
        Term::Literal(Literal {
            value: date.to_rfc3339_opts(SecondsFormat::Millis, true),
            datatype: vocab::XSD_DATETIME.to_string(),
        })
    }

    /// An `xsd:boolean` literal.
    pub fn boolean(value: bool) -> Self {
        Term::Literal(Literal {
            value: value.to_string(),
            datatype: vocab::XSD_BOOLEAN.to_string(),
        })
    }

    /// The IRI if this term is a named node.
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Term::NamedNode(iri) => Some(iri),
            Term::Literal(_) => None,
        }
    }

    /// The literal if this term is one.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::NamedNode(_) => None,
            Term::Literal(literal) => Some(literal),
        }
    }

    /// Parse the term as an `xsd:dateTime` literal.
    pub fn as_date(&self) -> Result<DateTime<Utc>, GraphError> {
        let literal = self
            .as_literal()
            .ok_or_else(|| GraphError::InvalidDate(self.lexical_form().to_string()))?;
        DateTime::parse_from_rfc3339(&literal.value)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|_| GraphError::InvalidDate(literal.value.clone()))
    }

    /// Whether this term references another resource.
    pub fn is_reference(&self) -> bool {
        matches!(self, Term::NamedNode(_))
    }

    /// The lexical form: the IRI for named nodes, the value for literals.
    pub fn lexical_form(&self) -> &str {
        match self {
            Term::NamedNode(iri) => iri,
            Term::Literal(literal) => &literal.value,
        }
    }
}

/// One RDF statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

/// The result of structurally diffing two graphs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDiff {
    /// Triples present in the other graph but not this one.
    pub added: Vec<Triple>,
    /// Triples present in this graph but not the other.
    pub removed: Vec<Triple>,
}

impl GraphDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// An ordered set of triples representing one document's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    triples: BTreeSet<Triple>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Insert a triple, returning whether it was newly added.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn insert_all(&mut self, triples: impl IntoIterator<Item = Triple>) {
        self.triples.extend(triples);
    }

    /// Remove one exact triple, returning whether it was present.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.remove(triple)
    }

    /// Remove every triple with the given subject and predicate.
    ///
    /// Returns the removed triples so callers can build patch delete sets.
    pub fn remove_matching(&mut self, subject: &str, predicate: &str) -> Vec<Triple> {
        let removed: Vec<Triple> = self
            .triples
            .iter()
            .filter(|t| t.subject == subject && t.predicate == predicate)
            .cloned()
            .collect();
        for triple in &removed {
            self.triples.remove(triple);
        }
        removed
    }

    /// Remove every triple about the given subject, returning them.
    pub fn remove_subject(&mut self, subject: &str) -> Vec<Triple> {
        let removed: Vec<Triple> = self
            .triples
            .iter()
            .filter(|t| t.subject == subject)
            .cloned()
            .collect();
        for triple in &removed {
            self.triples.remove(triple);
        }
        removed
    }

    /// Iterate over all triples in deterministic order.
    pub fn triples(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Whether the exact triple is present.
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// All object terms for a (subject, predicate) pair.
    pub fn objects<'g>(&'g self, subject: &str, predicate: &str) -> Vec<&'g Term> {
        self.triples
            .iter()
            .filter(|t| t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
            .collect()
    }

    /// The first object term for a (subject, predicate) pair, if any.
    pub fn first_object(&self, subject: &str, predicate: &str) -> Option<&Term> {
        self.triples
            .iter()
            .find(|t| t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// All distinct subject URLs, in order.
    pub fn subjects(&self) -> Vec<&str> {
        let mut subjects: Vec<&str> = Vec::new();
        for triple in &self.triples {
            match subjects.last() {
                Some(last) if *last == triple.subject => {}
                _ => subjects.push(&triple.subject),
            }
        }
        subjects
    }

    /// Whether any triple has the given subject.
    pub fn contains_subject(&self, subject: &str) -> bool {
        self.triples.iter().any(|t| t.subject == subject)
    }

    /// The `rdf:type` IRIs declared for a subject.
    pub fn types_of(&self, subject: &str) -> Vec<&str> {
        self.objects(subject, vocab::RDF_TYPE)
            .into_iter()
            .filter_map(Term::as_named)
            .collect()
    }

    /// Subjects declaring the given `rdf:type`.
    pub fn subjects_with_type(&self, class: &str) -> Vec<&str> {
        let mut subjects: Vec<&str> = self
            .triples
            .iter()
            .filter(|t| {
                t.predicate == vocab::RDF_TYPE && t.object.as_named() == Some(class)
            })
            .map(|t| t.subject.as_str())
            .collect();
        subjects.dedup();
        subjects
    }

    /// A copy of this graph without any triple using the given predicate.
    pub fn without_predicate(&self, predicate: &str) -> Graph {
        Graph {
            triples: self
                .triples
                .iter()
                .filter(|t| t.predicate != predicate)
                .cloned()
                .collect(),
        }
    }

    /// Structural diff against another graph.
    pub fn diff(&self, other: &Graph) -> GraphDiff {
        GraphDiff {
            added: other.triples.difference(&self.triples).cloned().collect(),
            removed: self.triples.difference(&other.triples).cloned().collect(),
        }
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Graph {
            triples: iter.into_iter().collect(),
        }
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter);
    }
}
