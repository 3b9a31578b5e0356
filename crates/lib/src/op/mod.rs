//! The operation log.
//!
//! An [`Operation`] is an immutable, timestamped description of one property
//! mutation on a resource. Operations support two application forms that must
//! produce equivalent end states: direct graph mutation (for graph-backed
//! stores) and DELETE/INSERT patch fragments (for text-protocol stores).
//!
//! Every operation also knows how to describe *itself* as RDF through
//! [`Operation::document_operations`], which is how the log persists inside
//! the documents it mutates instead of in a side channel.

pub mod errors;

pub use errors::OperationError;

use crate::graph::{Graph, Term, Triple};
use crate::vocab;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// The kind-specific payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Replace all values of `property` on the resource with `values`.
    Set { property: String, values: Vec<Term> },
    /// Remove all values of `property` from the resource.
    Unset { property: String },
}

impl OperationKind {
    fn tag(&self) -> &'static str {
        match self {
            OperationKind::Set { .. } => "set",
            OperationKind::Unset { .. } => "unset",
        }
    }

    /// The operation's RDF class.
    pub fn type_iri(&self) -> &'static str {
        match self {
            OperationKind::Set { .. } => vocab::CRDT_SET_PROPERTY_OPERATION,
            OperationKind::Unset { .. } => vocab::CRDT_UNSET_PROPERTY_OPERATION,
        }
    }
}

/// An immutable, timestamped property mutation.
///
/// The operation's URL is minted from its content, so structurally identical
/// operations regenerated on two replicas compare equal by URL without any
/// shared counter. The merge algorithm relies on this for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    url: String,
    resource_url: String,
    date: DateTime<Utc>,
    kind: OperationKind,
}

impl Operation {
    /// A Set-property operation: replaces all values of `property` with
    /// `values` as of `date`.
    pub fn set(
        resource_url: impl Into<String>,
        property: impl Into<String>,
        values: Vec<Term>,
        date: DateTime<Utc>,
    ) -> Self {
        let resource_url = resource_url.into();
        let kind = OperationKind::Set {
            property: property.into(),
            values,
        };
        let url = mint_url(&resource_url, &date, &kind);
        Self {
            url,
            resource_url,
            date,
            kind,
        }
    }

    /// An Unset-property operation: removes all values of `property` as of
    /// `date`.
    pub fn unset(
        resource_url: impl Into<String>,
        property: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        let resource_url = resource_url.into();
        let kind = OperationKind::Unset {
            property: property.into(),
        };
        let url = mint_url(&resource_url, &date, &kind);
        Self {
            url,
            resource_url,
            date,
            kind,
        }
    }

    /// Reconstruct an operation decoded from storage, keeping its stored URL.
    pub fn with_url(
        url: impl Into<String>,
        resource_url: impl Into<String>,
        date: DateTime<Utc>,
        kind: OperationKind,
    ) -> Self {
        Self {
            url: url.into(),
            resource_url: resource_url.into(),
            date,
            kind,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// The property this operation mutates.
    pub fn property(&self) -> &str {
        match &self.kind {
            OperationKind::Set { property, .. } | OperationKind::Unset { property } => property,
        }
    }

    /// Apply this operation directly to a graph.
    ///
    /// Set removes all existing (resource, property) triples, then inserts the
    /// new values; when the resource is absent this degrades to a pure insert.
    /// Unset only removes, and is a no-op on an absent resource.
    pub fn apply_to_graph(&self, graph: &mut Graph) {
        graph.remove_matching(&self.resource_url, self.property());
        if let OperationKind::Set { property, values } = &self.kind {
            for value in values {
                graph.insert(Triple::new(&self.resource_url, property, value.clone()));
            }
        }
    }

    /// Contribute this operation to a DELETE/INSERT patch.
    ///
    /// The delete set is computed against `current`, the fetched state of the
    /// document plus any mutations already staged in the batch, because patch
    /// protocols have no native "replace" verb.
    pub fn apply_to_update(&self, update: &mut UpdateBuilder, current: &Graph) {
        for existing in current.objects(&self.resource_url, self.property()) {
            update.delete(Triple::new(
                &self.resource_url,
                self.property(),
                existing.clone(),
            ));
        }
        if let OperationKind::Set { property, values } = &self.kind {
            for value in values {
                update.insert(Triple::new(&self.resource_url, property, value.clone()));
            }
        }
    }

    /// The Set-property operations that describe this operation as RDF.
    ///
    /// Covers the operation's own type, the resource it targets, its date, the
    /// property it targets and (for Set) its value list. Document operations
    /// are plain data about the log entry; they are not themselves described.
    pub fn document_operations(&self) -> Vec<Operation> {
        let mut ops = vec![
            Operation::set(
                &self.url,
                vocab::RDF_TYPE,
                vec![Term::named(self.kind.type_iri())],
                self.date,
            ),
            Operation::set(
                &self.url,
                vocab::CRDT_RESOURCE,
                vec![Term::named(&self.resource_url)],
                self.date,
            ),
            Operation::set(
                &self.url,
                vocab::CRDT_DATE,
                vec![Term::date(&self.date)],
                self.date,
            ),
            Operation::set(
                &self.url,
                vocab::CRDT_PROPERTY,
                vec![Term::named(self.property())],
                self.date,
            ),
        ];
        if let OperationKind::Set { values, .. } = &self.kind {
            ops.push(Operation::set(
                &self.url,
                vocab::CRDT_VALUE,
                values.clone(),
                self.date,
            ));
        }
        ops
    }
}

/// Mint the content-derived URL for an operation.
///
/// The identity is a pure function of (resource, property, kind, date, values)
/// so the same logical operation gets the same URL on every replica.
pub fn mint_url(resource_url: &str, date: &DateTime<Utc>, kind: &OperationKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(resource_url.as_bytes());
    hasher.update([0]);
    hasher.update(kind.tag().as_bytes());
    hasher.update([0]);
    match kind {
        OperationKind::Set { property, values } => {
            hasher.update(property.as_bytes());
            for value in values {
                hasher.update([0]);
                hasher.update(crate::graph::ntriples::statement(&Triple::new(
                    "urn:op",
                    "urn:value",
                    value.clone(),
                )));
            }
        }
        OperationKind::Unset { property } => hasher.update(property.as_bytes()),
    }
    hasher.update([0]);
    hasher.update(
        date.to_rfc3339_opts(SecondsFormat::Millis, true)
            .as_bytes(),
    );
    let digest = hex::encode(&hasher.finalize()[..8]);
    format!("{resource_url}-operation-{digest}")
}

/// Decode every operation embedded in a graph.
///
/// Subjects typed with the reserved operation vocabulary are read back into
/// [`Operation`] values, keeping their stored URLs. Unknown operation types
/// are ignored so historical vocabularies cannot brick a merge. The result is
/// sorted by (date, URL) for deterministic application order.
pub fn operations_in_graph(graph: &Graph) -> Result<Vec<Operation>, OperationError> {
    let mut operations = Vec::new();
    for subject in graph.subjects_with_type(vocab::CRDT_SET_PROPERTY_OPERATION) {
        operations.push(decode(graph, subject, true)?);
    }
    for subject in graph.subjects_with_type(vocab::CRDT_UNSET_PROPERTY_OPERATION) {
        operations.push(decode(graph, subject, false)?);
    }
    operations.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.url.cmp(&b.url)));
    Ok(operations)
}

fn decode(graph: &Graph, subject: &str, is_set: bool) -> Result<Operation, OperationError> {
    let field = |predicate: &str, name: &'static str| {
        graph
            .first_object(subject, predicate)
            .ok_or_else(|| OperationError::missing(subject, name))
    };

    let resource_url = field(vocab::CRDT_RESOURCE, "resource")?
        .as_named()
        .ok_or_else(|| OperationError::missing(subject, "resource"))?
        .to_string();
    let property = field(vocab::CRDT_PROPERTY, "property")?
        .as_named()
        .ok_or_else(|| OperationError::missing(subject, "property"))?
        .to_string();
    let date_term = field(vocab::CRDT_DATE, "date")?;
    let date = date_term.as_date().map_err(|_| OperationError::InvalidDate {
        url: subject.to_string(),
        value: date_term.lexical_form().to_string(),
    })?;

    let kind = if is_set {
        OperationKind::Set {
            property,
            values: graph
                .objects(subject, vocab::CRDT_VALUE)
                .into_iter()
                .cloned()
                .collect(),
        }
    } else {
        OperationKind::Unset { property }
    };

    Ok(Operation::with_url(subject, resource_url, date, kind))
}

/// A DELETE/INSERT patch under construction.
///
/// Deleting a triple that is still pending insertion cancels the insertion
/// (and vice versa), so the builder always holds the net change against the
/// state the document had when it was fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBuilder {
    deletes: BTreeSet<Triple>,
    inserts: BTreeSet<Triple>,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.inserts.is_empty()
    }

    pub fn deletes(&self) -> impl Iterator<Item = &Triple> {
        self.deletes.iter()
    }

    pub fn inserts(&self) -> impl Iterator<Item = &Triple> {
        self.inserts.iter()
    }

    /// Stage a triple removal.
    pub fn delete(&mut self, triple: Triple) {
        if !self.inserts.remove(&triple) {
            self.deletes.insert(triple);
        }
    }

    /// Stage a triple insertion.
    pub fn insert(&mut self, triple: Triple) {
        if !self.deletes.remove(&triple) {
            self.inserts.insert(triple);
        }
    }

    /// Render the staged change as an `application/sparql-update` body.
    pub fn to_sparql_update(&self) -> String {
        let block = |triples: &BTreeSet<Triple>| {
            triples
                .iter()
                .map(|t| format!("    {}", crate::graph::ntriples::statement(t)))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let mut statements = Vec::new();
        if !self.deletes.is_empty() {
            statements.push(format!("DELETE DATA {{\n{}\n}}", block(&self.deletes)));
        }
        if !self.inserts.is_empty() {
            statements.push(format!("INSERT DATA {{\n{}\n}}", block(&self.inserts)));
        }
        statements.join(" ;\n")
    }
}
