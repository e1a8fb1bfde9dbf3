use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct ReaperConfig {
    #[envconfig(
        from = "REAPER_RESOURCES_FILE",
        default = "/app/config/resources.yaml"
    )]
    pub resources_file: String,

    /// Only objects matching this selector are listed.
    #[envconfig(
        from = "REAPER_LABEL_SELECTOR",
        default = "reaper.oaas.io/enabled=true"
    )]
    pub label_selector: String,

    #[envconfig(
        from = "REAPER_ANNOTATION_KEY",
        default = "reaper.oaas.io/kill-after"
    )]
    pub annotation_key: String,

    #[envconfig(from = "REAPER_LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// `json` or `text`.
    #[envconfig(from = "REAPER_LOG_FORMAT", default = "json")]
    pub log_format: String,

    #[envconfig(nested)]
    pub metrics: MetricsConfig,
}

impl ReaperConfig {
    pub fn json_logs(&self) -> bool {
        !self.log_format.eq_ignore_ascii_case("text")
    }
}

/// End-of-run metrics push.
#[derive(Envconfig, Clone, Debug)]
pub struct MetricsConfig {
    #[envconfig(from = "REAPER_METRICS_PUSH_ENABLED", default = "false")]
    pub push_enabled: bool,

    /// OTLP/gRPC collector, e.g. http://otel-collector.monitoring:4317
    #[envconfig(from = "REAPER_METRICS_PUSH_ENDPOINT")]
    pub push_endpoint: Option<String>,

    #[envconfig(from = "REAPER_METRICS_PUSH_TIMEOUT_SECS", default = "10")]
    pub push_timeout_secs: u64,

    #[envconfig(from = "REAPER_JOB_NAME", default = "oprc-reaper")]
    pub job_name: String,

    #[envconfig(from = "POD_NAMESPACE")]
    pub namespace: Option<String>,
}

impl MetricsConfig {
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }
}
