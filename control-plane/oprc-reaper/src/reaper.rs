use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogEntry, ResourceCatalog};
use crate::client::ClientError;
use crate::expiry::{ExpiryPolicy, Verdict};
use crate::metrics::MetricsSink;
use crate::owner::resolve_target;
use crate::resource::ObservedObject;

/// Per-kind counters for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub scanned: u64,
    pub eligible: u64,
    pub deleted: u64,
    pub errors: u64,
    pub list_failed: bool,
}

impl ScanOutcome {
    fn merge(&mut self, other: &ScanOutcome) {
        self.scanned += other.scanned;
        self.eligible += other.eligible;
        self.deleted += other.deleted;
        self.errors += other.errors;
        self.list_failed |= other.list_failed;
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// Keyed by resource name, in catalog order.
    pub outcomes: Vec<(String, ScanOutcome)>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn outcome(&self, resource: &str) -> Option<&ScanOutcome> {
        self.outcomes
            .iter()
            .find(|(r, _)| r == resource)
            .map(|(_, o)| o)
    }

    pub fn totals(&self) -> ScanOutcome {
        let mut total = ScanOutcome::default();
        for (_, o) in &self.outcomes {
            total.merge(o);
        }
        total
    }
}

/// One scan pass over every catalogued kind: list opted-in objects, delete
/// the expired ones (or their catalogued owner), report, flush metrics once.
pub struct Reaper {
    catalog: ResourceCatalog,
    policy: ExpiryPolicy,
    label_selector: String,
    metrics: Arc<dyn MetricsSink>,
    cancel: CancellationToken,
}

impl Reaper {
    pub fn new(
        catalog: ResourceCatalog,
        policy: ExpiryPolicy,
        label_selector: impl Into<String>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            catalog,
            policy,
            label_selector: label_selector.into(),
            metrics,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Never fails: list/parse/delete errors stay local to their kind or
    /// object and end up in the report and the metrics sink.
    pub async fn run(&self) -> RunReport {
        info!(
            kinds = self.catalog.len(),
            selector = %self.label_selector,
            annotation = %self.policy.annotation_key(),
            "starting reaper run"
        );
        let mut report = RunReport::default();
        for entry in self.catalog.entries() {
            if self.cancel.is_cancelled() {
                break;
            }
            let outcome = self.scan_kind(entry).await;
            report
                .outcomes
                .push((entry.descriptor.resource.clone(), outcome));
        }
        report.cancelled = self.cancel.is_cancelled();

        let totals = report.totals();
        info!(
            scanned = totals.scanned,
            eligible = totals.eligible,
            deleted = totals.deleted,
            errors = totals.errors,
            cancelled = report.cancelled,
            "finished processing all resources"
        );

        match self.metrics.flush().await {
            Ok(()) => debug!("metrics flushed"),
            Err(e) => error!(error = %e, "pushing metrics"),
        }
        report
    }

    #[tracing::instrument(
        level = "info",
        skip(self, entry),
        fields(
            group = %entry.descriptor.group,
            resource = %entry.descriptor.resource
        )
    )]
    async fn scan_kind(&self, entry: &CatalogEntry) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        let client = &entry.client;

        let objects = match self
            .cancellable(client.list(&self.label_selector))
            .await
        {
            Ok(objects) => objects,
            Err(ClientError::Cancelled) => {
                debug!("list cancelled");
                return outcome;
            }
            Err(e) => {
                error!(error = %e, "listing resources");
                self.metrics
                    .record_error(client.group(), client.resource_name());
                outcome.errors += 1;
                outcome.list_failed = true;
                return outcome;
            }
        };

        outcome.scanned = objects.len() as u64;
        self.metrics
            .record_scanned(client.resource_name(), outcome.scanned);

        for obj in &objects {
            if self.cancel.is_cancelled() {
                break;
            }
            self.process(entry, obj, &mut outcome).await;
        }
        outcome
    }

    async fn process(
        &self,
        entry: &CatalogEntry,
        obj: &ObservedObject,
        outcome: &mut ScanOutcome,
    ) {
        let listed = &entry.client;
        let target =
            resolve_target(obj, &entry.descriptor, &self.catalog, listed);

        // the listed object's annotation decides, even for a redirected delete
        let expired_at = match self.policy.evaluate(obj) {
            Ok(Verdict::Eligible { expired_at }) => expired_at,
            Ok(Verdict::NotEligible(reason)) => {
                debug!(
                    namespace = %obj.namespace,
                    name = %obj.name,
                    ?reason,
                    "skipping"
                );
                return;
            }
            Err(e) => {
                warn!(
                    namespace = %obj.namespace,
                    name = %obj.name,
                    kind = %obj.kind,
                    error = %e,
                    "invalid expiry annotation"
                );
                self.metrics
                    .record_error(listed.group(), listed.resource_name());
                outcome.errors += 1;
                return;
            }
        };

        outcome.eligible += 1;
        self.metrics
            .record_killable(listed.resource_name(), &obj.namespace);

        let started = Instant::now();
        let res = self
            .cancellable(target.client.delete(&target.namespace, &target.name))
            .await;
        match res {
            Ok(()) => {
                outcome.deleted += 1;
                self.metrics.record_killed(
                    target.client.group(),
                    target.client.resource_name(),
                );
                self.metrics.observe_delete_duration(
                    target.client.resource_name(),
                    started.elapsed().as_secs_f64(),
                );
                info!(
                    namespace = %target.namespace,
                    name = %target.name,
                    kind = %target.client.kind(),
                    resource = %target.client.resource_name(),
                    child = %obj.name,
                    redirected = target.redirected,
                    %expired_at,
                    "deleted resource"
                );
            }
            Err(ClientError::NotFound) => {
                debug!(
                    namespace = %target.namespace,
                    name = %target.name,
                    resource = %target.client.resource_name(),
                    "already deleted"
                );
            }
            Err(ClientError::Cancelled) => {
                debug!(
                    namespace = %target.namespace,
                    name = %target.name,
                    "delete cancelled"
                );
            }
            Err(e) => {
                error!(
                    namespace = %target.namespace,
                    name = %target.name,
                    kind = %target.client.kind(),
                    resource = %target.client.resource_name(),
                    child_kind = %obj.kind,
                    child = %obj.name,
                    error = %e,
                    "deleting resource"
                );
                self.metrics.record_error(
                    target.client.group(),
                    target.client.resource_name(),
                );
                outcome.errors += 1;
            }
        }
    }

    async fn cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, ClientError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            res = fut => res,
        }
    }
}
