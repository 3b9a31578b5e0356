//! Document merge: last-writer-wins by embedded timestamp.
//!
//! Both replicas of a document carry their operation history as embedded
//! triples. Merging decodes both logs, takes the difference by operation URL
//! (identities are content-derived, so equal operations collide), and applies
//! each missing operation to the side that lacks it, unless that side
//! already holds a strictly later operation for the same (resource, property)
//! pair, or a tombstone suppresses it. Which side is "remote" never matters.
//!
//! The plan also keeps each side's metadata record in step with its resulting
//! log, and restores a deleted resource when a strictly later write recreates
//! it.

use crate::Result;
use crate::graph::{Graph, Term};
use crate::meta::{self, ResourceStatus};
use crate::op::{self, Operation};
use crate::typeindex::ModelDescriptor;
use crate::vocab;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// The operations each side must apply to converge.
#[derive(Debug, Default)]
pub(crate) struct MergePlan {
    pub apply_local: Vec<Operation>,
    pub apply_remote: Vec<Operation>,
    /// Top-level property operations merged into each side (excludes the
    /// document-operation and metadata bookkeeping riding along).
    pub merged_into_local: usize,
    pub merged_into_remote: usize,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.apply_local.is_empty() && self.apply_remote.is_empty()
    }
}

/// Compute the merge plan for one document present on both sides.
pub(crate) fn merge_documents(
    local: &Graph,
    remote: &Graph,
    models: &[ModelDescriptor],
) -> Result<MergePlan> {
    let local_ops = op::operations_in_graph(local)?;
    let remote_ops = op::operations_in_graph(remote)?;
    let local_status = meta::resource_status(local)?;
    let remote_status = meta::resource_status(remote)?;

    let scope = in_scope_resources(local, remote, models);

    let (mut apply_local, merged_local) = plan_side(&local_ops, &remote_ops, &local_status, &scope);
    let (mut apply_remote, merged_remote) =
        plan_side(&remote_ops, &local_ops, &remote_status, &scope);

    // Metadata must track each side's resulting log, not just the slice it
    // merged: when only one side learns new operations, the side already
    // holding the superset still has to mint the identical record.
    let touched: BTreeSet<&str> = merged_local
        .iter()
        .chain(&merged_remote)
        .map(Operation::resource_url)
        .collect();
    apply_local.extend(touch_plan(&local_ops, &merged_local, &local_status, &touched));
    apply_remote.extend(touch_plan(
        &remote_ops,
        &merged_remote,
        &remote_status,
        &touched,
    ));

    propagate_tombstones(
        &scope,
        &local_status,
        &remote_status,
        &remote_ops,
        remote,
        &mut apply_remote,
    );
    propagate_tombstones(
        &scope,
        &remote_status,
        &local_status,
        &local_ops,
        local,
        &mut apply_local,
    );

    Ok(MergePlan {
        apply_local,
        apply_remote,
        merged_into_local: merged_local.len(),
        merged_into_remote: merged_remote.len(),
    })
}

/// Resources in either replica whose declared type matches a known model.
fn in_scope_resources(
    local: &Graph,
    remote: &Graph,
    models: &[ModelDescriptor],
) -> BTreeSet<String> {
    let mut scope = BTreeSet::new();
    for graph in [local, remote] {
        for model in models {
            for class in &model.rdf_classes {
                for subject in graph.subjects_with_type(class) {
                    scope.insert(subject.to_string());
                }
            }
        }
    }
    scope
}

/// Plan the operations one side must apply, given the other side's log.
///
/// Returns the full plan and the top-level operations that were merged.
fn plan_side(
    existing: &[Operation],
    incoming: &[Operation],
    status: &BTreeMap<String, ResourceStatus>,
    scope: &BTreeSet<String>,
) -> (Vec<Operation>, Vec<Operation>) {
    let known: BTreeSet<&str> = existing.iter().map(Operation::url).collect();
    // Latest (date, URL) per (resource, property); the URL breaks timestamp
    // ties deterministically so both replicas pick the same winner.
    let mut latest: BTreeMap<(&str, &str), (DateTime<Utc>, &str)> = BTreeMap::new();
    for operation in existing {
        let key = (operation.resource_url(), operation.property());
        let candidate = (operation.date(), operation.url());
        let entry = latest.entry(key).or_insert(candidate);
        if candidate > *entry {
            *entry = candidate;
        }
    }

    let mut merged = Vec::new();
    // `incoming` is sorted by (date, URL); applying in that order means the
    // latest write lands last on both sides.
    for operation in incoming {
        if known.contains(operation.url()) {
            continue;
        }
        if !scope.contains(operation.resource_url()) {
            continue;
        }
        if vocab::is_crdt_term(operation.property()) {
            // The log never edits its own bookkeeping triples.
            trace!(op = operation.url(), "reserved property rejected");
            continue;
        }
        if status
            .get(operation.resource_url())
            .is_some_and(|s| s.suppresses(operation))
        {
            trace!(op = operation.url(), "suppressed by tombstone");
            continue;
        }
        if latest
            .get(&(operation.resource_url(), operation.property()))
            .is_some_and(|winner| *winner > (operation.date(), operation.url()))
        {
            trace!(op = operation.url(), "superseded by a later write on this side");
            continue;
        }
        merged.push(operation.clone());
    }

    let mut plan = Vec::new();
    for operation in &merged {
        plan.push(operation.clone());
        plan.extend(operation.document_operations());
    }
    plan.extend(resurrections(existing, &merged, status));
    (plan, merged)
}

/// The metadata updates implied by one side's post-merge log, restricted to
/// the resources the merge touched on either side.
fn touch_plan(
    existing: &[Operation],
    merged: &[Operation],
    status: &BTreeMap<String, ResourceStatus>,
    touched: &BTreeSet<&str>,
) -> Vec<Operation> {
    let mut resulting: Vec<Operation> = merged.to_vec();
    resulting.extend(
        existing
            .iter()
            .filter(|o| touched.contains(o.resource_url()))
            .cloned(),
    );
    meta::touch_operations(status, &resulting)
}

/// Operations restoring deleted resources that a strictly later write has
/// recreated: the still-winning log entries for their other properties are
/// re-applied, and the tombstone is replaced by a fresh metadata record.
fn resurrections(
    existing: &[Operation],
    merged: &[Operation],
    status: &BTreeMap<String, ResourceStatus>,
) -> Vec<Operation> {
    let recreated: BTreeSet<&str> = merged
        .iter()
        .filter(|o| matches!(status.get(o.resource_url()), Some(ResourceStatus::Deleted(_))))
        .map(Operation::resource_url)
        .collect();
    if recreated.is_empty() {
        return Vec::new();
    }

    let merged_urls: BTreeSet<&str> = merged.iter().map(Operation::url).collect();
    let mut operations = Vec::new();
    for resource in recreated {
        let mut winners: BTreeMap<&str, &Operation> = BTreeMap::new();
        let mut latest: Option<DateTime<Utc>> = None;
        for operation in existing
            .iter()
            .chain(merged)
            .filter(|o| o.resource_url() == resource)
        {
            let entry = winners.entry(operation.property()).or_insert(operation);
            if (operation.date(), operation.url()) > (entry.date(), entry.url()) {
                *entry = operation;
            }
            if latest.map_or(true, |date| operation.date() > date) {
                latest = Some(operation.date());
            }
        }
        // Merged operations are already in the plan; only prior history needs
        // re-applying, since the deletion unset its effects.
        for winner in winners.values() {
            if !merged_urls.contains(winner.url()) {
                operations.push((*winner).clone());
            }
        }
        let Some(date) = latest else { continue };
        let url = meta::metadata_url(resource);
        operations.push(Operation::set(
            &url,
            vocab::RDF_TYPE,
            vec![Term::named(vocab::CRDT_METADATA)],
            date,
        ));
        operations.push(Operation::set(
            &url,
            vocab::CRDT_RESOURCE,
            vec![Term::named(resource)],
            date,
        ));
        operations.push(Operation::set(
            &url,
            vocab::CRDT_UPDATED_AT,
            vec![Term::date(&date)],
            date,
        ));
        operations.push(Operation::unset(&url, vocab::CRDT_DELETED_AT, date));
    }
    operations
}

/// Carry deletions across: if one side holds a tombstone the other side does
/// not know, delete the resource there too, unless the other side has since
/// written something strictly newer, in which case last-writer-wins lets the
/// resource live.
fn propagate_tombstones(
    scope: &BTreeSet<String>,
    source: &BTreeMap<String, ResourceStatus>,
    target: &BTreeMap<String, ResourceStatus>,
    target_ops: &[Operation],
    target_graph: &Graph,
    apply_target: &mut Vec<Operation>,
) {
    for resource in scope {
        let Some(ResourceStatus::Deleted(tombstone)) = source.get(resource) else {
            continue;
        };
        if matches!(target.get(resource), Some(ResourceStatus::Deleted(_))) {
            continue;
        }
        let recreated = target_ops
            .iter()
            .any(|o| o.resource_url() == resource && o.date() > tombstone.deleted_at);
        if recreated {
            continue;
        }
        apply_target.extend(meta::deletion_operations(
            target_graph,
            resource,
            tombstone.deleted_at,
        ));
    }
}
