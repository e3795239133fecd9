//! Inference servable
//!
//! Binds one model's configuration, label metadata, and scheduler
//! together and presents one execution entry point to the protocol
//! frontends. Per servable, configuration and scheduler are each set at
//! most once; execution is only valid once both are bound.

use crate::metrics::ServableMetrics;
use prometheus::{Counter, Histogram};
use serve_core::{
    Error, FileLabelProvider, InferStats, LabelProvider, ModelConfig, ModelIdentity, ModelInput,
    ModelOutput, Result,
};
use serve_provider::{RequestProvider, ResponseProvider, ServableContext};
use serve_scheduler::{InferJob, OnComplete, RunFunc, Scheduler, StandardScheduler};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// The runtime representation of one loaded, executable model version
///
/// Lifecycle: `Unconfigured` (constructed) → `Configured`
/// ([`set_model_config`](Self::set_model_config)) → `Ready` (scheduler
/// bound). [`run`](Self::run) and [`async_run`](Self::async_run) are only
/// valid in `Ready`.
pub struct InferenceServable {
    version: i64,
    config: Option<ModelConfig>,

    /// Input name → declared configuration
    inputs: HashMap<String, ModelInput>,

    /// Output name → declared configuration
    outputs: HashMap<String, ModelOutput>,

    label_provider: Arc<dyn LabelProvider>,
    scheduler: Option<Arc<dyn Scheduler>>,
    metrics: Option<ServableMetrics>,
}

impl InferenceServable {
    /// Create an unconfigured servable for one model version
    pub fn new(version: i64) -> Self {
        Self {
            version,
            config: None,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            label_provider: Arc::new(serve_core::EmptyLabelProvider),
            scheduler: None,
            metrics: None,
        }
    }

    /// Name of the model being served; empty until configured
    pub fn name(&self) -> &str {
        self.config.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }

    /// Version of the model being served
    pub fn version(&self) -> i64 {
        self.version
    }

    /// The model configuration, once set
    pub fn config(&self) -> Option<&ModelConfig> {
        self.config.as_ref()
    }

    /// Set the configuration of the model being served
    ///
    /// One-time initializer: builds the input/output lookup maps, loads
    /// the label provider using `path` as the label-file root, and creates
    /// the per-servable metric set. A second call fails without mutating
    /// the first configuration, as does a structurally invalid `config`.
    pub fn set_model_config(&mut self, path: impl AsRef<Path>, config: ModelConfig) -> Result<()> {
        if self.config.is_some() {
            return Err(Error::already_exists(format!(
                "model configuration already set for servable '{}'",
                self.name()
            )));
        }

        config.validate()?;
        let label_provider = FileLabelProvider::load(path, &config)?;
        let metrics = ServableMetrics::new(&ModelIdentity::new(config.name.clone(), self.version))?;

        self.inputs = config
            .inputs
            .iter()
            .map(|i| (i.name.clone(), i.clone()))
            .collect();
        self.outputs = config
            .outputs
            .iter()
            .map(|o| (o.name.clone(), o.clone()))
            .collect();
        self.label_provider = Arc::new(label_provider);
        self.metrics = Some(metrics);

        info!(model = %config.name, version = self.version, "configured servable");
        self.config = Some(config);
        Ok(())
    }

    /// Explicitly set the scheduler to use for inference requests
    ///
    /// The scheduler can only be set once per servable, and only after
    /// configuration.
    pub fn set_scheduler(&mut self, scheduler: Arc<dyn Scheduler>) -> Result<()> {
        if self.config.is_none() {
            return Err(Error::failed_precondition(
                "cannot bind a scheduler before the model configuration is set",
            ));
        }
        if self.scheduler.is_some() {
            return Err(Error::already_exists(format!(
                "scheduler already bound for servable '{}'",
                self.name()
            )));
        }

        debug!(model = %self.name(), "bound scheduler");
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Build and bind a standard scheduler with `runner_count` parallel
    /// execution lanes, each invoking `run_fn` to perform the actual
    /// tensor computation
    pub fn set_configured_scheduler(&mut self, runner_count: u32, run_fn: RunFunc) -> Result<()> {
        if self.config.is_none() {
            return Err(Error::failed_precondition(
                "cannot bind a scheduler before the model configuration is set",
            ));
        }
        self.set_scheduler(Arc::new(StandardScheduler::new(runner_count, run_fn)))
    }

    /// The model configuration for a named input
    pub fn get_input(&self, name: &str) -> Result<&ModelInput> {
        self.inputs.get(name).ok_or_else(|| {
            Error::not_found(format!(
                "unknown input '{}' for model '{}'",
                name,
                self.name()
            ))
        })
    }

    /// The model configuration for a named output
    pub fn get_output(&self, name: &str) -> Result<&ModelOutput> {
        self.outputs.get(name).ok_or_else(|| {
            Error::not_found(format!(
                "unknown output '{}' for model '{}'",
                name,
                self.name()
            ))
        })
    }

    /// The label provider for the model
    pub fn label_provider(&self) -> &dyn LabelProvider {
        self.label_provider.as_ref()
    }

    /// The per-servable metric set, once configured
    pub fn metrics(&self) -> Option<&ServableMetrics> {
        self.metrics.as_ref()
    }

    fn metrics_ref(&self) -> Result<&ServableMetrics> {
        self.metrics
            .as_ref()
            .ok_or_else(|| Error::not_ready("servable is not configured"))
    }

    /// Successful-request counter for `device` (-1 for the aggregate
    /// series); first access for a device creates the series, later
    /// accesses return the same instance
    pub fn metric_inference_success(&self, device: i64) -> Result<Counter> {
        Ok(self.metrics_ref()?.inference_success(device))
    }

    pub fn metric_inference_failure(&self, device: i64) -> Result<Counter> {
        Ok(self.metrics_ref()?.inference_failure(device))
    }

    pub fn metric_inference_count(&self, device: i64) -> Result<Counter> {
        Ok(self.metrics_ref()?.inference_count(device))
    }

    pub fn metric_inference_execution_count(&self, device: i64) -> Result<Counter> {
        Ok(self.metrics_ref()?.execution_count(device))
    }

    pub fn metric_inference_request_duration(&self, device: i64) -> Result<Counter> {
        Ok(self.metrics_ref()?.request_duration(device))
    }

    pub fn metric_inference_compute_duration(&self, device: i64) -> Result<Counter> {
        Ok(self.metrics_ref()?.compute_duration(device))
    }

    pub fn metric_inference_queue_duration(&self, device: i64) -> Result<Counter> {
        Ok(self.metrics_ref()?.queue_duration(device))
    }

    pub fn metric_inference_load_ratio(&self, device: i64) -> Result<Histogram> {
        Ok(self.metrics_ref()?.load_ratio(device))
    }

    /// Run inference, blocking the calling context until completion
    ///
    /// Submits one unit of work to the bound scheduler and waits for its
    /// completion status. For synchronous frontends.
    pub async fn run(
        &self,
        stats: Arc<InferStats>,
        request: Box<dyn RequestProvider>,
        response: Box<dyn ResponseProvider>,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.async_run(
            stats,
            request,
            response,
            Box::new(move |status| {
                // The submitter may have stopped waiting; that is its
                // choice, not a failure
                let _ = tx.send(status);
            }),
        )?;

        rx.await.map_err(|_| {
            Error::internal("scheduler dropped the unit of work without completing it")
        })?
    }

    /// Run inference without blocking the calling context
    ///
    /// Identical submission to [`run`](Self::run); `on_complete` is
    /// invoked with the completion status from a scheduler-owned execution
    /// context, exactly once per accepted unit of work. The servable
    /// records per-device metrics (including the failure counter on error)
    /// before the callback runs.
    pub fn async_run(
        &self,
        stats: Arc<InferStats>,
        request: Box<dyn RequestProvider>,
        response: Box<dyn ResponseProvider>,
        on_complete: OnComplete,
    ) -> Result<()> {
        if self.config.is_none() {
            return Err(Error::not_ready(
                "inference requested before the servable was configured",
            ));
        }
        let scheduler = self.scheduler.as_ref().ok_or_else(|| {
            Error::not_ready(format!(
                "inference requested before a scheduler was bound for model '{}'",
                self.name()
            ))
        })?;
        let metrics = self.metrics_ref()?.clone();

        let completion_stats = Arc::clone(&stats);
        let wrapped: OnComplete = Box::new(move |status| {
            metrics.record(&completion_stats, status.is_ok());
            on_complete(status);
        });

        scheduler.schedule(InferJob::new(stats, request, response, wrapped))
    }
}

impl ServableContext for InferenceServable {
    fn output_config(&self, name: &str) -> Result<&ModelOutput> {
        self.get_output(name)
    }

    fn label_provider(&self) -> &dyn LabelProvider {
        self.label_provider.as_ref()
    }
}
