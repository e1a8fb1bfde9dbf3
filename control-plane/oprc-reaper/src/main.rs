use std::sync::Arc;

use envconfig::Envconfig;
use kube::Client;
use oprc_reaper::{
    catalog::ResourceCatalog,
    config::{ReaperConfig, load_resources},
    expiry::ExpiryPolicy,
    init_tracing,
    metrics::{MetricsSink, OtelMetrics},
    reaper::Reaper,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = ReaperConfig::init_from_env()?;
    init_tracing(&cfg.log_level, cfg.json_logs());

    // Ensure rustls uses the aws-lc-rs provider explicitly.
    if let Err(e) = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::aws_lc_rs::default_provider(),
    ) {
        tracing::debug!(
            ?e,
            "CryptoProvider already installed or incompatible; proceeding"
        );
    }

    info!(?cfg, "Starting reaper");

    let resources = load_resources(&cfg.resources_file).await?;
    let client = Client::try_default().await?;
    let catalog = ResourceCatalog::connect(client, resources)?;

    let metrics: Arc<dyn MetricsSink> = match OtelMetrics::new(&cfg.metrics) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            warn!(error = %e, "metrics push disabled");
            Arc::new(OtelMetrics::disabled(&cfg.metrics))
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    let reaper = Reaper::new(
        catalog,
        ExpiryPolicy::new(cfg.annotation_key.clone()),
        cfg.label_selector.clone(),
        metrics,
    )
    .with_cancellation(cancel);

    let report = reaper.run().await;
    if report.cancelled {
        warn!("run interrupted before all resources were processed");
    }
    Ok(())
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                cancel.cancel();
                return;
            }
        };
        tokio::select! {
            _ = term.recv() => {},
            _ = tokio::signal::ctrl_c() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received, cancelling run");
    cancel.cancel();
}
