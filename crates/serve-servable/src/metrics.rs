//! Per-device metric set for one servable
//!
//! Counters and histograms keyed by (model, version, device). Each
//! servable instance creates its own metric families, so device-scoped
//! series are never shared across servables. The child for a given device
//! is created on first access and cached inside the metric vec (which
//! serializes lazy initialization), so repeated accessors return the same
//! underlying instance. Device index -1 denotes the model-aggregate
//! series, rendered as label value "none".

use prometheus::{Counter, CounterVec, Histogram, HistogramVec};
use serve_core::{Error, InferStats, ModelIdentity, Result};

const LABELS: &[&str] = &["model", "version", "device"];

/// Metric set for one servable
#[derive(Debug, Clone)]
pub struct ServableMetrics {
    model: String,
    version: String,

    /// Successfully completed inference requests
    inference_success: CounterVec,

    /// Failed inference requests
    inference_failure: CounterVec,

    /// Inferences performed (each batch item counts once)
    inference_count: CounterVec,

    /// Model executions performed (each batch counts once)
    execution_count: CounterVec,

    /// Cumulative end-to-end request duration in microseconds
    request_duration_us: CounterVec,

    /// Cumulative compute duration in microseconds
    compute_duration_us: CounterVec,

    /// Cumulative queue duration in microseconds
    queue_duration_us: CounterVec,

    /// Ratio of request duration to compute duration
    load_ratio: HistogramVec,
}

impl ServableMetrics {
    /// Create the metric families for one servable identity
    pub fn new(identity: &ModelIdentity) -> Result<Self> {
        let model = identity.name.clone();
        let version = identity.version_label();

        let counter = |name: &str, help: &str| -> Result<CounterVec> {
            CounterVec::new(prometheus::Opts::new(name, help), LABELS)
                .map_err(|e| Error::internal(format!("failed to create metric '{}': {}", name, e)))
        };

        Ok(Self {
            inference_success: counter(
                "inferserve_inference_success_total",
                "Number of successful inference requests",
            )?,
            inference_failure: counter(
                "inferserve_inference_failure_total",
                "Number of failed inference requests",
            )?,
            inference_count: counter(
                "inferserve_inference_count_total",
                "Number of inferences performed (a batch of n counts as n)",
            )?,
            execution_count: counter(
                "inferserve_inference_exec_count_total",
                "Number of model executions performed",
            )?,
            request_duration_us: counter(
                "inferserve_inference_request_duration_us_total",
                "Cumulative end-to-end inference request duration in microseconds",
            )?,
            compute_duration_us: counter(
                "inferserve_inference_compute_duration_us_total",
                "Cumulative inference compute duration in microseconds",
            )?,
            queue_duration_us: counter(
                "inferserve_inference_queue_duration_us_total",
                "Cumulative inference queue duration in microseconds",
            )?,
            load_ratio: HistogramVec::new(
                prometheus::HistogramOpts::new(
                    "inferserve_inference_load_ratio",
                    "Ratio of request duration to compute duration",
                )
                .buckets(vec![1.05, 1.1, 1.25, 1.5, 2.0, 3.0, 5.0, 10.0, 25.0, 50.0]),
                LABELS,
            )
            .map_err(|e| Error::internal(format!("failed to create load ratio metric: {}", e)))?,
            model,
            version,
        })
    }

    fn device_label(device: i64) -> String {
        if device < 0 {
            "none".to_string()
        } else {
            device.to_string()
        }
    }

    fn counter_for(&self, family: &CounterVec, device: i64) -> Counter {
        family.with_label_values(&[&self.model, &self.version, &Self::device_label(device)])
    }

    /// Successful-request counter for `device` (-1 for the aggregate series)
    pub fn inference_success(&self, device: i64) -> Counter {
        self.counter_for(&self.inference_success, device)
    }

    /// Failed-request counter for `device`
    pub fn inference_failure(&self, device: i64) -> Counter {
        self.counter_for(&self.inference_failure, device)
    }

    /// Inference counter for `device`; a batch of n counts as n
    pub fn inference_count(&self, device: i64) -> Counter {
        self.counter_for(&self.inference_count, device)
    }

    /// Execution counter for `device`; a batch counts once
    pub fn execution_count(&self, device: i64) -> Counter {
        self.counter_for(&self.execution_count, device)
    }

    /// Cumulative request-duration counter for `device`, microseconds
    pub fn request_duration(&self, device: i64) -> Counter {
        self.counter_for(&self.request_duration_us, device)
    }

    /// Cumulative compute-duration counter for `device`, microseconds
    pub fn compute_duration(&self, device: i64) -> Counter {
        self.counter_for(&self.compute_duration_us, device)
    }

    /// Cumulative queue-duration counter for `device`, microseconds
    pub fn queue_duration(&self, device: i64) -> Counter {
        self.counter_for(&self.queue_duration_us, device)
    }

    /// Load-ratio histogram for `device`
    pub fn load_ratio(&self, device: i64) -> Histogram {
        self.load_ratio
            .with_label_values(&[&self.model, &self.version, &Self::device_label(device)])
    }

    /// Record the completion of one unit of work into the device series
    /// the stats were placed on
    pub fn record(&self, stats: &InferStats, success: bool) {
        let device = stats.device();

        if !success {
            self.inference_failure(device).inc();
            return;
        }

        self.inference_success(device).inc();
        self.inference_count(device).inc_by(stats.batch_size() as f64);
        self.execution_count(device).inc();

        let request = stats.request_duration();
        let compute = stats.compute_duration();
        self.request_duration(device).inc_by(request.as_micros() as f64);
        self.compute_duration(device).inc_by(compute.as_micros() as f64);
        self.queue_duration(device)
            .inc_by(stats.queue_duration().as_micros() as f64);

        if compute.as_nanos() > 0 {
            self.load_ratio(device)
                .observe(request.as_nanos() as f64 / compute.as_nanos() as f64);
        }
    }

    /// Register all metric families with the given registry
    pub fn register(&self, registry: &prometheus::Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.inference_success.clone()))?;
        registry.register(Box::new(self.inference_failure.clone()))?;
        registry.register(Box::new(self.inference_count.clone()))?;
        registry.register(Box::new(self.execution_count.clone()))?;
        registry.register(Box::new(self.request_duration_us.clone()))?;
        registry.register(Box::new(self.compute_duration_us.clone()))?;
        registry.register(Box::new(self.queue_duration_us.clone()))?;
        registry.register(Box::new(self.load_ratio.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_reference_stability() {
        let metrics = ServableMetrics::new(&ModelIdentity::new("resnet50", 1)).unwrap();

        // Two accessors for the same device observe the same series
        let first = metrics.inference_success(0);
        let second = metrics.inference_success(0);
        first.inc();
        assert_eq!(second.get(), 1.0);

        // Different devices never alias
        assert_eq!(metrics.inference_success(1).get(), 0.0);
        assert_eq!(metrics.inference_success(-1).get(), 0.0);
    }

    #[test]
    fn test_servables_do_not_share_series() {
        let a = ServableMetrics::new(&ModelIdentity::new("resnet50", 1)).unwrap();
        let b = ServableMetrics::new(&ModelIdentity::new("resnet50", 1)).unwrap();

        a.inference_success(0).inc();
        assert_eq!(b.inference_success(0).get(), 0.0);
    }

    #[test]
    fn test_record_success() {
        let metrics = ServableMetrics::new(&ModelIdentity::new("resnet50", 1)).unwrap();
        let stats = InferStats::new(4);
        stats.set_device(2);
        stats.record_compute(std::time::Duration::from_micros(500));

        metrics.record(&stats, true);

        assert_eq!(metrics.inference_success(2).get(), 1.0);
        assert_eq!(metrics.inference_count(2).get(), 4.0);
        assert_eq!(metrics.execution_count(2).get(), 1.0);
        assert_eq!(metrics.inference_failure(2).get(), 0.0);
        assert!(metrics.compute_duration(2).get() >= 500.0);
        // Aggregate series untouched when a device was set
        assert_eq!(metrics.inference_success(-1).get(), 0.0);
    }

    #[test]
    fn test_record_failure() {
        let metrics = ServableMetrics::new(&ModelIdentity::new("resnet50", 1)).unwrap();
        let stats = InferStats::new(1);

        metrics.record(&stats, false);

        assert_eq!(metrics.inference_failure(-1).get(), 1.0);
        assert_eq!(metrics.inference_success(-1).get(), 0.0);
        assert_eq!(metrics.inference_count(-1).get(), 0.0);
    }

    #[test]
    fn test_unversioned_identity_renders_none_label() {
        let metrics =
            ServableMetrics::new(&ModelIdentity::new("resnet50", serve_core::NO_VERSION)).unwrap();
        let registry = prometheus::Registry::new();
        metrics.register(&registry).unwrap();
        metrics.inference_success(-1).inc();

        let families = registry.gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "inferserve_inference_success_total")
            .unwrap();
        let labels = family.get_metric()[0].get_label();
        assert!(labels
            .iter()
            .any(|l| l.get_name() == "version" && l.get_value() == "none"));
        assert!(labels
            .iter()
            .any(|l| l.get_name() == "device" && l.get_value() == "none"));
    }

    #[test]
    fn test_registration() {
        let metrics = ServableMetrics::new(&ModelIdentity::new("resnet50", 1)).unwrap();
        let registry = prometheus::Registry::new();
        metrics.register(&registry).unwrap();

        metrics.inference_success(0).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "inferserve_inference_success_total"));
    }
}
