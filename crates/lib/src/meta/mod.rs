//! Per-resource metadata and tombstones.
//!
//! Each tracked resource has a companion metadata resource (at
//! `<resource>-metadata`) recording when it was created and last updated.
//! Deleting a resource replaces its metadata with a [`Tombstone`], which is
//! persisted like any other data so later syncs can tell "intentionally gone"
//! from "never seen".

pub mod errors;

pub use errors::MetaError;

use crate::graph::{Graph, Term};
use crate::op::Operation;
use crate::vocab;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Creation and last-update times for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub resource_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A marker recording that a resource was deleted at a given time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub resource_url: String,
    pub deleted_at: DateTime<Utc>,
}

impl Tombstone {
    pub fn new(resource_url: impl Into<String>, deleted_at: DateTime<Utc>) -> Self {
        Self {
            resource_url: resource_url.into(),
            deleted_at,
        }
    }

    /// The Set-property operations that persist this tombstone as RDF.
    ///
    /// Setting `rdf:type` replaces any `crdt:Metadata` declaration at the same
    /// subject, so the tombstone supersedes the metadata record in place.
    /// `createdAt` is left untouched: a strictly later write may recreate the
    /// resource, and the restored record keeps its original creation time.
    pub fn document_operations(&self) -> Vec<Operation> {
        let url = metadata_url(&self.resource_url);
        vec![
            Operation::set(
                &url,
                vocab::RDF_TYPE,
                vec![Term::named(vocab::CRDT_TOMBSTONE)],
                self.deleted_at,
            ),
            Operation::set(
                &url,
                vocab::CRDT_RESOURCE,
                vec![Term::named(&self.resource_url)],
                self.deleted_at,
            ),
            Operation::set(
                &url,
                vocab::CRDT_DELETED_AT,
                vec![Term::date(&self.deleted_at)],
                self.deleted_at,
            ),
            Operation::unset(&url, vocab::CRDT_UPDATED_AT, self.deleted_at),
        ]
    }
}

/// The tracking state of one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    Tracked(Metadata),
    Deleted(Tombstone),
}

impl ResourceStatus {
    /// Whether `operation` must be suppressed because of this status.
    ///
    /// An operation dated at or before a tombstone's `deletedAt` must never be
    /// applied: ties go to the deletion, consistent with the merge's
    /// strictly-later-wins rule. Only a strictly later operation may recreate
    /// the resource.
    pub fn suppresses(&self, operation: &Operation) -> bool {
        match self {
            ResourceStatus::Tracked(_) => false,
            ResourceStatus::Deleted(tombstone) => operation.date() <= tombstone.deleted_at,
        }
    }
}

/// The metadata resource URL for a resource.
pub fn metadata_url(resource_url: &str) -> String {
    format!("{resource_url}-metadata")
}

/// Extract the tracking status of every resource declared in a graph.
///
/// Subjects typed `crdt:Metadata` or `crdt:Tombstone` are decoded; a tombstone
/// shadows a metadata record for the same resource.
pub fn resource_status(graph: &Graph) -> Result<BTreeMap<String, ResourceStatus>, MetaError> {
    let mut status = BTreeMap::new();

    for subject in graph.subjects_with_type(vocab::CRDT_METADATA) {
        let resource_url = named_field(graph, subject, vocab::CRDT_RESOURCE)?;
        let updated_at = date_field(graph, subject, vocab::CRDT_UPDATED_AT)?;
        let created_at = match graph.first_object(subject, vocab::CRDT_CREATED_AT) {
            Some(_) => date_field(graph, subject, vocab::CRDT_CREATED_AT)?,
            None => updated_at,
        };
        status.insert(
            resource_url.clone(),
            ResourceStatus::Tracked(Metadata {
                resource_url,
                created_at,
                updated_at,
            }),
        );
    }

    for subject in graph.subjects_with_type(vocab::CRDT_TOMBSTONE) {
        let resource_url = named_field(graph, subject, vocab::CRDT_RESOURCE)?;
        let deleted_at = date_field(graph, subject, vocab::CRDT_DELETED_AT)?;
        status.insert(
            resource_url.clone(),
            ResourceStatus::Deleted(Tombstone {
                resource_url,
                deleted_at,
            }),
        );
    }

    Ok(status)
}

/// Compute the metadata-update operations implied by newly applied operations.
///
/// For every resource touched by `applied` whose maximum operation date
/// exceeds its current `updatedAt`, emit operations advancing `updatedAt` to
/// that later date (and creating the metadata record for resources seen for
/// the first time). `updatedAt` never moves backward, even when merges apply
/// operations out of order.
pub fn touch_operations(
    status: &BTreeMap<String, ResourceStatus>,
    applied: &[Operation],
) -> Vec<Operation> {
    let mut latest: BTreeMap<&str, DateTime<Utc>> = BTreeMap::new();
    for operation in applied {
        let entry = latest
            .entry(operation.resource_url())
            .or_insert_with(|| operation.date());
        if operation.date() > *entry {
            *entry = operation.date();
        }
    }

    let mut touches = Vec::new();
    for (resource_url, date) in latest {
        let url = metadata_url(resource_url);
        match status.get(resource_url) {
            Some(ResourceStatus::Deleted(_)) => {}
            Some(ResourceStatus::Tracked(metadata)) => {
                if date > metadata.updated_at {
                    touches.push(Operation::set(
                        &url,
                        vocab::CRDT_UPDATED_AT,
                        vec![Term::date(&date)],
                        date,
                    ));
                }
            }
            None => {
                touches.push(Operation::set(
                    &url,
                    vocab::RDF_TYPE,
                    vec![Term::named(vocab::CRDT_METADATA)],
                    date,
                ));
                touches.push(Operation::set(
                    &url,
                    vocab::CRDT_RESOURCE,
                    vec![Term::named(resource_url)],
                    date,
                ));
                touches.push(Operation::set(
                    &url,
                    vocab::CRDT_CREATED_AT,
                    vec![Term::date(&date)],
                    date,
                ));
                touches.push(Operation::set(
                    &url,
                    vocab::CRDT_UPDATED_AT,
                    vec![Term::date(&date)],
                    date,
                ));
            }
        }
    }
    touches
}

/// The operations that delete a resource from a graph: one Unset per property
/// currently present, plus the tombstone's own description.
pub fn deletion_operations(
    graph: &Graph,
    resource_url: &str,
    deleted_at: DateTime<Utc>,
) -> Vec<Operation> {
    let mut properties: Vec<&str> = graph
        .triples()
        .filter(|t| t.subject == resource_url)
        .map(|t| t.predicate.as_str())
        .collect();
    properties.dedup();

    let mut operations: Vec<Operation> = properties
        .into_iter()
        .map(|property| Operation::unset(resource_url, property, deleted_at))
        .collect();
    operations.extend(Tombstone::new(resource_url, deleted_at).document_operations());
    operations
}

fn named_field(graph: &Graph, subject: &str, predicate: &str) -> Result<String, MetaError> {
    graph
        .first_object(subject, predicate)
        .and_then(Term::as_named)
        .map(str::to_string)
        .ok_or_else(|| MetaError::missing(subject, predicate))
}

fn date_field(graph: &Graph, subject: &str, predicate: &str) -> Result<DateTime<Utc>, MetaError> {
    let term = graph
        .first_object(subject, predicate)
        .ok_or_else(|| MetaError::missing(subject, predicate))?;
    term.as_date().map_err(|_| MetaError::InvalidDate {
        subject: subject.to_string(),
        value: term.lexical_form().to_string(),
    })
}
