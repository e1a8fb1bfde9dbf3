use std::time::Duration;

use async_trait::async_trait;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter, MeterProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
};
use tracing::info;

use crate::config::MetricsConfig;

const METER_NAME: &str = "oprc-reaper";

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics push enabled but no endpoint configured")]
    MissingEndpoint,
    #[error("building OTLP exporter: {0}")]
    Exporter(String),
    #[error("flushing metrics: {0}")]
    Flush(String),
    #[error("flushing metrics timed out after {0:?}")]
    Timeout(Duration),
}

/// Where the reaper reports what it scanned, killed and failed on.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    fn record_scanned(&self, resource: &str, count: u64);
    fn record_killable(&self, resource: &str, team: &str);
    fn record_killed(&self, group: &str, resource: &str);
    fn record_error(&self, group: &str, resource: &str);
    fn observe_delete_duration(&self, resource: &str, seconds: f64);
    /// Push everything recorded so far and stop exporting. Called once at
    /// the end of a run.
    async fn flush(&self) -> Result<(), MetricsError>;
}

/// OpenTelemetry instruments on a provider owned by this value (never the
/// global one). With push enabled, export happens on [`MetricsSink::flush`].
pub struct OtelMetrics {
    provider: SdkMeterProvider,
    push_enabled: bool,
    flush_timeout: Duration,
    resources_scanned_total: Counter<u64>,
    resources_killable_total: Counter<u64>,
    killed_total: Counter<u64>,
    errors_total: Counter<u64>,
    delete_duration_seconds: Histogram<f64>,
}

impl OtelMetrics {
    pub fn new(cfg: &MetricsConfig) -> Result<Self, MetricsError> {
        let mut builder =
            SdkMeterProvider::builder().with_resource(build_resource(cfg));
        if cfg.push_enabled {
            let endpoint = cfg
                .push_endpoint
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .ok_or(MetricsError::MissingEndpoint)?;
            let exporter = opentelemetry_otlp::MetricExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .with_timeout(cfg.push_timeout())
                .build()
                .map_err(|e| MetricsError::Exporter(e.to_string()))?;
            // Longer than any run: the only export is the final flush.
            let reader = PeriodicReader::builder(exporter)
                .with_interval(Duration::from_secs(24 * 60 * 60))
                .build();
            builder = builder.with_reader(reader);
            info!(endpoint, "metrics push enabled");
        }
        Ok(Self::with_provider(
            builder.build(),
            cfg.push_enabled,
            cfg.push_timeout(),
        ))
    }

    /// Instruments that record nowhere; used when push is off or misconfigured.
    pub fn disabled(cfg: &MetricsConfig) -> Self {
        let provider = SdkMeterProvider::builder()
            .with_resource(build_resource(cfg))
            .build();
        Self::with_provider(provider, false, cfg.push_timeout())
    }

    fn with_provider(
        provider: SdkMeterProvider,
        push_enabled: bool,
        flush_timeout: Duration,
    ) -> Self {
        let meter: Meter = provider.meter(METER_NAME);
        let resources_scanned_total = meter
            .u64_counter("reaper.resources.scanned.total")
            .with_description(
                "Total number of Kubernetes resources scanned by kind",
            )
            .build();
        let resources_killable_total = meter
            .u64_counter("reaper.resources.killable.total")
            .with_description(
                "Total number of resources past their kill-after deadline",
            )
            .build();
        let killed_total = meter
            .u64_counter("reaper.killed.total")
            .with_description(
                "Number of Kubernetes resources deleted by the reaper",
            )
            .build();
        let errors_total = meter
            .u64_counter("reaper.errors.total")
            .with_description(
                "Number of errors encountered while processing resources",
            )
            .build();
        let delete_duration_seconds = meter
            .f64_histogram("reaper.resource.delete.duration")
            .with_unit("s")
            .with_description("Time taken to delete a resource")
            .build();
        Self {
            provider,
            push_enabled,
            flush_timeout,
            resources_scanned_total,
            resources_killable_total,
            killed_total,
            errors_total,
            delete_duration_seconds,
        }
    }

    pub fn push_enabled(&self) -> bool {
        self.push_enabled
    }
}

fn build_resource(cfg: &MetricsConfig) -> Resource {
    let mut builder = Resource::builder()
        .with_attribute(KeyValue::new("service.name", METER_NAME))
        .with_attribute(KeyValue::new("k8s.job.name", cfg.job_name.clone()));
    if let Some(ns) = cfg.namespace.as_deref().filter(|v| !v.is_empty()) {
        let ns = KeyValue::new("k8s.namespace.name", ns.to_string());
        builder = builder.with_attribute(ns);
    }
    builder.build()
}

fn group_resource(group: &str, resource: &str) -> [KeyValue; 2] {
    [
        KeyValue::new("group", group.to_string()),
        KeyValue::new("resource", resource.to_string()),
    ]
}

#[async_trait]
impl MetricsSink for OtelMetrics {
    fn record_scanned(&self, resource: &str, count: u64) {
        self.resources_scanned_total.add(
            count,
            &[KeyValue::new("resource", resource.to_string())],
        );
    }

    fn record_killable(&self, resource: &str, team: &str) {
        self.resources_killable_total.add(
            1,
            &[
                KeyValue::new("resource", resource.to_string()),
                KeyValue::new("team", team.to_string()),
            ],
        );
    }

    fn record_killed(&self, group: &str, resource: &str) {
        self.killed_total.add(1, &group_resource(group, resource));
    }

    fn record_error(&self, group: &str, resource: &str) {
        self.errors_total.add(1, &group_resource(group, resource));
    }

    fn observe_delete_duration(&self, resource: &str, seconds: f64) {
        self.delete_duration_seconds.record(
            seconds,
            &[KeyValue::new("resource", resource.to_string())],
        );
    }

    async fn flush(&self) -> Result<(), MetricsError> {
        if !self.push_enabled {
            return Ok(());
        }
        // shutdown exports what is left and stops the reader, so dropping
        // the provider at exit does not push a second time. It blocks until
        // the exporter answers.
        let provider = self.provider.clone();
        let handle = tokio::task::spawn_blocking(move || provider.shutdown());
        match tokio::time::timeout(self.flush_timeout, handle).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(MetricsError::Flush(e.to_string())),
            Ok(Err(join)) => Err(MetricsError::Flush(join.to_string())),
            Err(_) => Err(MetricsError::Timeout(self.flush_timeout)),
        }
    }
}
