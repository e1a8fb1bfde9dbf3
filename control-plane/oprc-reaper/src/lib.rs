pub mod catalog;
pub mod client;
pub mod config;
pub mod expiry;
pub mod metrics;
pub mod owner;
pub mod reaper;
pub mod resource;

use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Install the global subscriber: `RUST_LOG` directives plus `default_level`.
/// `json` selects the structured formatter used in-cluster.
pub fn init_tracing(default_level: &str, json: bool) {
    let filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .from_env_lossy()
        .add_directive(
            default_level
                .parse()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        );

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let fmt_layer = if json {
        fmt_layer.json().boxed()
    } else {
        fmt_layer.boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init();
}
