//! Workstation: the session, its undo history and the backend together
//!
//! Plugin invocations are split into [`Workstation::begin_invocation`] and
//! [`Workstation::complete_invocation`] so a presentation layer can show
//! progress while the request is in flight. Only one invocation per image
//! lineage may be in flight at a time; the [`InvocationTicket`] holds the
//! lineage and releases it when dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::client::{BatchJobResult, BatchStartResponse, ImageBackend, ReloadResponse};
use crate::config::ClientConfig;
use crate::error::{NeuroPixelError, Result, ResultExt};
use crate::pipeline::{PipelineCompiler, PipelineError, PipelineGraph};
use crate::plugins::{resolve_params, CatalogCache, ParamMap, PluginCatalog, PluginRunRequest, PluginRunResponse};
use crate::session::{ImageSession, ReconcileMode, UndoHistory};
use crate::types::ImageId;

type BusySet = Arc<Mutex<HashSet<ImageId>>>;

fn lock_busy(busy: &BusySet) -> MutexGuard<'_, HashSet<ImageId>> {
    busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A plugin invocation that has been validated and is in flight.
///
/// Dropping the ticket, including when a `run_plugin` future is cancelled,
/// frees its lineage.
#[derive(Debug)]
pub struct InvocationTicket {
    image_id: ImageId,
    root: ImageId,
    plugin_name: String,
    params: ParamMap,
    busy: BusySet,
}

impl InvocationTicket {
    pub fn image_id(&self) -> &ImageId {
        &self.image_id
    }

    /// Root original of the lineage this invocation holds
    pub fn root(&self) -> &ImageId {
        &self.root
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Resolved parameters, defaults included
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Body for `POST /plugins/run`
    pub fn request(&self) -> PluginRunRequest {
        PluginRunRequest::new(self.image_id.clone(), self.plugin_name.clone(), &self.params)
    }
}

impl Drop for InvocationTicket {
    fn drop(&mut self) {
        if lock_busy(&self.busy).remove(&self.root) {
            tracing::trace!("Lineage {} released", self.root);
        }
    }
}

/// Client-side state of one workstation session
pub struct Workstation<B> {
    backend: B,
    config: ClientConfig,
    session: ImageSession,
    history: UndoHistory,
    catalog: CatalogCache,
    busy: BusySet,
}

impl<B: ImageBackend> Workstation<B> {
    pub fn new(backend: B, config: ClientConfig) -> Self {
        Self {
            history: UndoHistory::new(config.undo_depth),
            catalog: CatalogCache::new(config.catalog_ttl()),
            backend,
            config,
            session: ImageSession::new(),
            busy: BusySet::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &ImageSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ImageSession {
        &mut self.session
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Check if an invocation is in flight for the lineage of `id`
    pub fn is_busy(&self, id: &ImageId) -> bool {
        let root = self.session.root_of(id).unwrap_or_else(|| id.clone());
        lock_busy(&self.busy).contains(&root)
    }

    // ==================== Catalog ====================

    /// The plugin catalog, fetched when the cached copy is missing or stale
    pub async fn catalog(&mut self) -> Result<Arc<PluginCatalog>> {
        let backend = &self.backend;
        self.catalog
            .get_or_fetch(|| backend.list_plugins())
            .await
            .context("Loading plugin catalog")
    }

    /// Ask the backend to reload its plugins and drop the cached catalog
    pub async fn reload_plugins(&mut self) -> Result<ReloadResponse> {
        let response = self.backend.reload_plugins().await?;
        self.catalog.invalidate();
        tracing::info!("Backend reloaded {} plugins", response.plugins_loaded);
        Ok(response)
    }

    // ==================== Images ====================

    /// Upload a file and add the resulting original to the session
    pub async fn upload(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<ImageId> {
        let image = self
            .backend
            .upload_image(file_name, bytes)
            .await
            .with_context(|| format!("Uploading {}", file_name))?;
        Ok(self.session.add_image(image))
    }

    /// Delete an image on the backend, then drop it from the session
    pub async fn delete(&mut self, id: &ImageId) -> Result<()> {
        self.backend.delete_image(id).await?;
        self.session.remove_image(id);
        Ok(())
    }

    // ==================== Plugin Invocation ====================

    /// Validate an invocation and mark its lineage busy.
    ///
    /// Fails without side effects when the image is unknown, the plugin is
    /// not in the catalog, the parameters are invalid, or another
    /// invocation on the same lineage is still in flight.
    pub async fn begin_invocation(
        &mut self,
        image_id: &ImageId,
        plugin_name: &str,
        params: &ParamMap,
    ) -> Result<InvocationTicket> {
        if !self.session.contains(image_id) {
            return Err(NeuroPixelError::NotFound(format!("image '{}'", image_id)));
        }
        let root = self
            .session
            .root_of(image_id)
            .unwrap_or_else(|| image_id.clone());
        if self.is_busy(&root) {
            return Err(NeuroPixelError::LineageBusy(root.to_string()));
        }

        let catalog = self.catalog().await?;
        let spec = catalog.require(plugin_name)?;
        let params = resolve_params(spec, params)?;

        if !lock_busy(&self.busy).insert(root.clone()) {
            return Err(NeuroPixelError::LineageBusy(root.to_string()));
        }
        tracing::debug!("Invocation of {} on {} started", plugin_name, image_id);
        Ok(InvocationTicket {
            image_id: image_id.clone(),
            root,
            plugin_name: plugin_name.to_string(),
            params,
            busy: Arc::clone(&self.busy),
        })
    }

    /// Release the lineage and fold a successful result into the session.
    ///
    /// Returns the id of the image now showing the result. A failed outcome
    /// leaves the image set and active image untouched.
    pub fn complete_invocation(
        &mut self,
        ticket: InvocationTicket,
        outcome: Result<PluginRunResponse>,
        mode: ReconcileMode,
    ) -> Result<ImageId> {
        let image_id = ticket.image_id.clone();
        let plugin_name = ticket.plugin_name.clone();
        drop(ticket);

        let response = outcome.with_context(|| format!("Running {}", plugin_name))?;
        let revision = response.revision()?;
        tracing::debug!(
            "{} finished in {:.1}ms",
            response.plugin_name,
            response.execution_time_ms
        );

        match mode {
            ReconcileMode::CopyThenReplace => self
                .session
                .apply_copy_then_replace(&image_id, revision),
            ReconcileMode::InPlace => {
                let before = self
                    .session
                    .get(&image_id)
                    .cloned()
                    .ok_or_else(|| NeuroPixelError::NotFound(format!("image '{}'", image_id)))?;
                let stamp = chrono::Utc::now().timestamp_millis();
                self.session.apply_in_place(&image_id, &revision, stamp)?;
                self.history.push(before);
                Ok(image_id)
            }
        }
    }

    /// Run a plugin end to end
    pub async fn run_plugin(
        &mut self,
        image_id: &ImageId,
        plugin_name: &str,
        params: &ParamMap,
        mode: ReconcileMode,
    ) -> Result<ImageId> {
        let ticket = self.begin_invocation(image_id, plugin_name, params).await?;
        let outcome = self.backend.run_plugin(&ticket.request()).await;
        self.complete_invocation(ticket, outcome, mode)
    }

    /// Run a plugin using the configured reconciliation mode
    pub async fn run_plugin_default(
        &mut self,
        image_id: &ImageId,
        plugin_name: &str,
        params: &ParamMap,
    ) -> Result<ImageId> {
        let mode = self.config.reconcile_mode;
        self.run_plugin(image_id, plugin_name, params, mode).await
    }

    // ==================== Undo ====================

    pub fn undo(&mut self) -> Option<ImageId> {
        self.history.undo(&mut self.session)
    }

    pub fn redo(&mut self) -> Option<ImageId> {
        self.history.redo(&mut self.session)
    }

    // ==================== Batch ====================

    /// Resolve, validate and compile `graph`, then start it as a batch job
    pub async fn submit_pipeline(&mut self, graph: &mut PipelineGraph) -> Result<BatchStartResponse> {
        let catalog = self.catalog().await?;
        if let Some(&node_id) = graph.resolve_specs(&catalog).first() {
            let plugin = graph
                .node(node_id)
                .and_then(|n| n.plugin_name())
                .unwrap_or_default()
                .to_string();
            return Err(PipelineError::UnresolvedPlugin { node_id, plugin }.into());
        }

        let plan = PipelineCompiler::compile(graph)?;
        let request = plan.to_batch_request(graph, &self.config.batch_output_folder)?;
        let started = self.backend.start_batch(&request).await?;
        tracing::info!("Batch job {} started", started.job_id);
        Ok(started)
    }

    pub async fn batch_status(&self, job_id: &str) -> Result<BatchJobResult> {
        self.backend.batch_status(job_id).await
    }

    /// Poll a batch job until it reaches a terminal status.
    ///
    /// `on_progress` sees every status fetched, the final one included.
    /// Fails with [`NeuroPixelError::Timeout`] once `timeout` has elapsed.
    pub async fn wait_for_batch(
        &self,
        job_id: &str,
        poll_interval: Duration,
        timeout: Duration,
        mut on_progress: impl FnMut(&BatchJobResult),
    ) -> Result<BatchJobResult> {
        let poll = async {
            loop {
                let status = self.backend.batch_status(job_id).await?;
                on_progress(&status);
                if status.status.is_finished() {
                    return Ok::<_, NeuroPixelError>(status);
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Stopped waiting for batch job {} after {:?}", job_id, timeout);
                Err(NeuroPixelError::Timeout(format!(
                    "batch job {} did not finish within {:?}",
                    job_id, timeout
                )))
            }
        }
    }

    pub async fn cancel_batch(&self, job_id: &str) -> Result<()> {
        self.backend.cancel_batch(job_id).await
    }
}
