//! Synchronization engine.
//!
//! A [`SyncEngine`] reconciles a local and a remote [`DocumentStore`] in two
//! phases. The **pull** phase discovers containers through the type index,
//! walks the remote container tree, copies unseen documents down and merges
//! documents present on both sides (see [`merge`]). The **push** phase walks
//! the local tree, creates purely local documents remotely and registers
//! newly populated containers in the type index.
//!
//! The run is sequential per document; only document *reads* fan out, up to a
//! bounded concurrency. `DocumentNotFound` is recovered at single-document
//! scope; any other error aborts the run with the originating URL attached.
//! Partial progress stays in place; updates are idempotent when re-run with
//! the same operations.

pub mod errors;
mod merge;

pub use errors::SyncError;

use crate::Result;
use crate::store::{Document, DocumentStore, is_container_url};
use crate::typeindex::{ModelDescriptor, TypeIndex};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info};

/// The user/storage profile consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProfile {
    /// Root storage containers seeding the push phase.
    pub storage_roots: Vec<String>,
    /// The user's private type index document, if one exists.
    pub private_type_index: Option<String>,
    /// Writable container for creating a private type index when none exists.
    pub settings_container: String,
}

impl StorageProfile {
    /// A profile rooted at the given containers, with settings kept under
    /// `settings/` in the first root.
    pub fn new(storage_roots: Vec<String>) -> Self {
        let settings_container = storage_roots
            .first()
            .map(|root| format!("{root}settings/"))
            .unwrap_or_default();
        Self {
            storage_roots,
            private_type_index: None,
            settings_container,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Application models in scope for merging.
    pub models: Vec<ModelDescriptor>,
    pub profile: StorageProfile,
    /// Explicit type index to consult; falls back to the profile's private
    /// index, then to creating one on demand during push.
    pub type_index_url: Option<String>,
    /// Upper bound on concurrent document reads per container.
    pub max_concurrent_reads: usize,
}

impl SyncConfig {
    pub fn new(models: Vec<ModelDescriptor>, profile: StorageProfile) -> Self {
        Self {
            models,
            profile,
            type_index_url: None,
            max_concurrent_reads: 4,
        }
    }

    fn type_index_url(&self) -> Option<String> {
        self.type_index_url
            .clone()
            .or_else(|| self.profile.private_type_index.clone())
    }
}

/// The engine's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Idle,
    Pulling,
    Pushing,
    Done,
    Failed,
}

/// Outcome counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub documents_pulled: usize,
    pub documents_pushed: usize,
    pub operations_applied_local: usize,
    pub operations_applied_remote: usize,
    pub registrations_created: usize,
}

/// A cheap handle for cancelling a sync run between documents.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type RegistrationCallback = Box<dyn Fn(&TypeIndex, &[ModelDescriptor]) + Send + Sync>;

struct RunState {
    visited: BTreeSet<String>,
    report: SyncReport,
}

type BoxedStep<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// The stateful pull/push orchestrator over two document stores.
pub struct SyncEngine {
    local: Arc<dyn DocumentStore>,
    remote: Arc<dyn DocumentStore>,
    config: SyncConfig,
    status: watch::Sender<SyncStatus>,
    token: CancellationToken,
    on_models_registered: Option<RegistrationCallback>,
    // Two runs over the same replica pair must not interleave their updates.
    run_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        local: Arc<dyn DocumentStore>,
        remote: Arc<dyn DocumentStore>,
        config: SyncConfig,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            local,
            remote,
            config,
            status,
            token: CancellationToken::new(),
            on_models_registered: None,
            run_lock: Mutex::new(()),
        }
    }

    /// Register a callback invoked once per newly created type registration.
    pub fn on_models_registered(
        mut self,
        callback: impl Fn(&TypeIndex, &[ModelDescriptor]) + Send + Sync + 'static,
    ) -> Self {
        self.on_models_registered = Some(Box::new(callback));
        self
    }

    /// Current state of the engine.
    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// A handle that cancels the current (and any future) run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn set_status(&self, status: SyncStatus) {
        debug!(?status, "sync status");
        self.status.send_replace(status);
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(SyncError::Cancelled.into());
        }
        Ok(())
    }

    /// Run one full pull-then-push cycle.
    pub async fn run(&self) -> Result<SyncReport> {
        let _run = self.run_lock.lock().await;
        let mut state = RunState {
            visited: BTreeSet::new(),
            report: SyncReport::default(),
        };

        self.set_status(SyncStatus::Pulling);
        if let Err(error) = self.pull(&mut state).await {
            self.set_status(SyncStatus::Failed);
            return Err(error);
        }

        self.set_status(SyncStatus::Pushing);
        if let Err(error) = self.push(&mut state).await {
            self.set_status(SyncStatus::Failed);
            return Err(error);
        }

        self.set_status(SyncStatus::Done);
        info!(
            pulled = state.report.documents_pulled,
            pushed = state.report.documents_pushed,
            "sync finished"
        );
        Ok(state.report)
    }

    async fn pull(&self, state: &mut RunState) -> Result<()> {
        for container in self.discover_containers().await? {
            self.check_cancelled()?;
            self.pull_container(container, state).await?;
        }
        Ok(())
    }

    /// The type index document to consult, falling back to the default
    /// private index location inside the settings container.
    fn index_url(&self) -> String {
        self.config.type_index_url().unwrap_or_else(|| {
            format!(
                "{}privateTypeIndex.ttl",
                self.config.profile.settings_container
            )
        })
    }

    /// Containers registered for the configured models, remote index first.
    async fn discover_containers(&self) -> Result<Vec<String>> {
        let index_url = self.index_url();
        let document = match self.remote.read_if_exists(&index_url).await? {
            Some(document) => Some(document),
            None => self.local.read_if_exists(&index_url).await?,
        };
        let Some(document) = document else {
            debug!(url = index_url, "no type index on either side");
            return Ok(Vec::new());
        };
        let index = TypeIndex::from_document(&document);
        Ok(index
            .matching_containers(&self.config.models)
            .into_iter()
            .map(|(container, _)| container)
            .collect())
    }

    fn pull_container<'a>(&'a self, url: String, state: &'a mut RunState) -> BoxedStep<'a> {
        Box::pin(async move {
            self.check_cancelled()?;
            state.visited.insert(url.clone());

            // Remote is the source of truth for discovering children.
            let Some(remote_doc) = self.remote.read_if_exists(&url).await? else {
                debug!(url, "container absent remotely, nothing to pull");
                return Ok(());
            };

            let mut child_containers = Vec::new();
            let mut reads = JoinSet::new();
            let permits = Arc::new(Semaphore::new(self.config.max_concurrent_reads.max(1)));
            for child in remote_doc.children() {
                if is_container_url(&child) {
                    child_containers.push(child);
                    continue;
                }
                let remote = self.remote.clone();
                let local = self.local.clone();
                let permits = permits.clone();
                reads.spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    let remote_doc = remote.read_if_exists(&child).await;
                    let local_doc = local.read_if_exists(&child).await;
                    (child, remote_doc, local_doc)
                });
            }

            while let Some(joined) = reads.join_next().await {
                let (child, remote_doc, local_doc) =
                    joined.map_err(|e| SyncError::TaskJoin(e.to_string()))?;
                self.check_cancelled()?;
                let remote_doc = remote_doc.map_err(|e| self.wrap(&child, e))?;
                let local_doc = local_doc.map_err(|e| self.wrap(&child, e))?;
                match (remote_doc, local_doc) {
                    (None, _) => {
                        debug!(url = child, "remote child vanished, skipping");
                    }
                    (Some(remote_doc), None) => {
                        // First sighting: copy the remote graph down verbatim.
                        self.local
                            .create(&child, remote_doc.graph.clone())
                            .await
                            .map_err(|e| self.wrap(&child, e))?;
                        state.visited.insert(child);
                        state.report.documents_pulled += 1;
                    }
                    (Some(remote_doc), Some(local_doc)) => {
                        self.merge_document(&child, &local_doc, &remote_doc, state)
                            .await?;
                    }
                }
            }

            for container in child_containers {
                self.pull_container(container, state).await?;
            }
            Ok(())
        })
    }

    async fn merge_document(
        &self,
        url: &str,
        local_doc: &Document,
        remote_doc: &Document,
        state: &mut RunState,
    ) -> Result<()> {
        state.visited.insert(url.to_string());
        let plan = merge::merge_documents(&local_doc.graph, &remote_doc.graph, &self.config.models)
            .map_err(|e| self.wrap(url, e))?;
        if plan.is_empty() {
            return Ok(());
        }

        debug!(
            url,
            into_local = plan.merged_into_local,
            into_remote = plan.merged_into_remote,
            "merging document"
        );
        if !plan.apply_local.is_empty() {
            match self.local.update(url, &plan.apply_local).await {
                Ok(()) => state.report.operations_applied_local += plan.merged_into_local,
                Err(error) if error.is_not_found() => {
                    debug!(url, "local document vanished during merge, skipping")
                }
                Err(error) => return Err(self.wrap(url, error)),
            }
        }
        if !plan.apply_remote.is_empty() {
            match self.remote.update(url, &plan.apply_remote).await {
                Ok(()) => state.report.operations_applied_remote += plan.merged_into_remote,
                Err(error) if error.is_not_found() => {
                    debug!(url, "remote document vanished during merge, skipping")
                }
                Err(error) => return Err(self.wrap(url, error)),
            }
        }
        Ok(())
    }

    async fn push(&self, state: &mut RunState) -> Result<()> {
        for root in self.config.profile.storage_roots.clone() {
            self.check_cancelled()?;
            self.push_container(root, state).await?;
        }
        Ok(())
    }

    fn push_container<'a>(&'a self, url: String, state: &'a mut RunState) -> BoxedStep<'a> {
        Box::pin(async move {
            self.check_cancelled()?;
            let Some(local_doc) = self.local.read_if_exists(&url).await? else {
                return Ok(());
            };

            let mut child_containers = Vec::new();
            let mut pushed_classes: BTreeSet<String> = BTreeSet::new();
            for child in local_doc.children() {
                if is_container_url(&child) {
                    child_containers.push(child);
                    continue;
                }
                if state.visited.contains(&child) {
                    continue;
                }
                self.check_cancelled()?;
                let Some(document) = self.local.read_if_exists(&child).await? else {
                    continue;
                };
                match self.remote.create(&child, document.graph.clone()).await {
                    Ok(()) => {
                        state.visited.insert(child);
                        state.report.documents_pushed += 1;
                        for model in &self.config.models {
                            if !model.requires_registration {
                                continue;
                            }
                            for class in &model.rdf_classes {
                                if !document.graph.subjects_with_type(class).is_empty() {
                                    pushed_classes.insert(class.clone());
                                }
                            }
                        }
                    }
                    Err(error) if error.is_conflict() => {
                        // The document appeared remotely since discovery ran
                        // (or it lives outside every registered container).
                        // Merge in place instead of failing the run.
                        let remote_doc = self
                            .remote
                            .read_if_exists(&child)
                            .await
                            .map_err(|e| self.wrap(&child, e))?;
                        if let Some(remote_doc) = remote_doc {
                            self.merge_document(&child, &document, &remote_doc, state)
                                .await?;
                        }
                    }
                    Err(error) if error.is_not_found() => {
                        debug!(url = child, "remote rejected create as missing, skipping");
                    }
                    Err(error) => return Err(self.wrap(&child, error)),
                }
            }

            if !pushed_classes.is_empty() {
                self.ensure_registrations(&url, pushed_classes, state)
                    .await?;
            }

            for container in child_containers {
                self.push_container(container, state).await?;
            }
            Ok(())
        })
    }

    /// Make sure the type index covers `container` for the pushed classes,
    /// creating a private index when none exists.
    async fn ensure_registrations(
        &self,
        container: &str,
        classes: BTreeSet<String>,
        state: &mut RunState,
    ) -> Result<()> {
        let index_url = self.index_url();
        let mut index = match self.remote.read_if_exists(&index_url).await? {
            Some(document) => TypeIndex::from_document(&document),
            None => {
                info!(url = index_url, "creating private type index");
                self.remote
                    .create(&index_url, TypeIndex::initial_graph(&index_url))
                    .await
                    .map_err(|e| self.wrap(&index_url, e))?;
                TypeIndex::new(&index_url)
            }
        };

        let missing: Vec<String> = classes
            .into_iter()
            .filter(|class| !index.covers(container, class))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let (registration, operations) =
            index.registration_operations(container, &missing, Utc::now());
        self.remote
            .update(&index_url, &operations)
            .await
            .map_err(|e| self.wrap(&index_url, e))?;
        info!(container, classes = ?missing, "registered models in type index");
        index.registrations.push(registration);
        state.report.registrations_created += 1;

        if let Some(callback) = &self.on_models_registered {
            let registered: Vec<ModelDescriptor> = self
                .config
                .models
                .iter()
                .filter(|model| model.rdf_classes.iter().any(|c| missing.contains(c)))
                .cloned()
                .collect();
            callback(&index, &registered);
        }
        Ok(())
    }

    fn wrap(&self, url: &str, error: crate::Error) -> crate::Error {
        match error {
            crate::Error::Sync(inner) => crate::Error::Sync(inner),
            other => SyncError::Document {
                url: url.to_string(),
                source: Box::new(other),
            }
            .into(),
        }
    }
}
