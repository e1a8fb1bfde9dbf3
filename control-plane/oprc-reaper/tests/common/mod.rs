#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use oprc_reaper::{
    catalog::{CatalogEntry, ResourceCatalog},
    client::{ClientError, ResourceClient},
    metrics::{MetricsError, MetricsSink},
    resource::{ObservedObject, ResourceDescriptor},
};

pub const KILL_AFTER: &str = "reaper.oaas.io/kill-after";
pub const SELECTOR: &str = "reaper.oaas.io/enabled=true";

pub fn hours_from_now(h: i64) -> String {
    (Utc::now() + Duration::hours(h)).to_rfc3339()
}

pub fn api_error(code: u16) -> ClientError {
    ClientError::Api(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".into(),
        message: format!("mock failure {code}"),
        reason: "Mock".into(),
        code,
    }))
}

pub enum DeleteReply {
    Ok,
    NotFound,
    Fail(u16),
    /// Never resolves; only cancellation ends it.
    Hang,
}

/// Scripted `ResourceClient` that records every call it receives.
pub struct MockResourceClient {
    descriptor: ResourceDescriptor,
    list_reply: Mutex<Option<Result<Vec<ObservedObject>, u16>>>,
    delete_replies: Mutex<VecDeque<DeleteReply>>,
    deletes: Mutex<Vec<(String, String)>>,
    selectors: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
}

impl MockResourceClient {
    pub fn new(descriptor: ResourceDescriptor) -> Self {
        Self {
            descriptor,
            list_reply: Mutex::new(Some(Ok(vec![]))),
            delete_replies: Mutex::new(VecDeque::new()),
            deletes: Mutex::new(vec![]),
            selectors: Mutex::new(vec![]),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn listing(self, objects: Vec<ObservedObject>) -> Self {
        *self.list_reply.lock().unwrap() = Some(Ok(objects));
        self
    }

    pub fn failing_list(self, code: u16) -> Self {
        *self.list_reply.lock().unwrap() = Some(Err(code));
        self
    }

    /// Replies consumed in order; `Ok` once exhausted.
    pub fn replying(self, replies: Vec<DeleteReply>) -> Self {
        *self.delete_replies.lock().unwrap() = replies.into();
        self
    }

    pub fn deletes(&self) -> Vec<(String, String)> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn selectors(&self) -> Vec<String> {
        self.selectors.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceClient for MockResourceClient {
    fn kind(&self) -> &str {
        &self.descriptor.kind
    }

    fn group(&self) -> &str {
        &self.descriptor.group
    }

    fn resource_name(&self) -> &str {
        &self.descriptor.resource
    }

    async fn list(
        &self,
        label_selector: &str,
    ) -> Result<Vec<ObservedObject>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.selectors.lock().unwrap().push(label_selector.to_string());
        match self.list_reply.lock().unwrap().clone() {
            Some(Ok(objects)) => Ok(objects),
            Some(Err(code)) => Err(api_error(code)),
            None => Ok(vec![]),
        }
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClientError> {
        self.deletes
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string()));
        let reply = self.delete_replies.lock().unwrap().pop_front();
        match reply.unwrap_or(DeleteReply::Ok) {
            DeleteReply::Ok => Ok(()),
            DeleteReply::NotFound => Err(ClientError::NotFound),
            DeleteReply::Fail(code) => Err(api_error(code)),
            DeleteReply::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Scanned { resource: String, count: u64 },
    Killable { resource: String, team: String },
    Killed { group: String, resource: String },
    Error { group: String, resource: String },
    DeleteDuration { resource: String },
}

/// `MetricsSink` that keeps every observation in memory.
#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<Event>>,
    flushes: AtomicUsize,
    fail_flush: bool,
}

impl RecordingMetrics {
    pub fn failing_flush() -> Self {
        Self {
            fail_flush: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn killed(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Killed { group, resource } => Some((group, resource)),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error { group, resource } => Some((group, resource)),
                _ => None,
            })
            .collect()
    }

    pub fn scanned(&self) -> Vec<(String, u64)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Scanned { resource, count } => Some((resource, count)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, e: Event) {
        self.events.lock().unwrap().push(e);
    }
}

#[async_trait]
impl MetricsSink for RecordingMetrics {
    fn record_scanned(&self, resource: &str, count: u64) {
        self.push(Event::Scanned {
            resource: resource.into(),
            count,
        });
    }

    fn record_killable(&self, resource: &str, team: &str) {
        self.push(Event::Killable {
            resource: resource.into(),
            team: team.into(),
        });
    }

    fn record_killed(&self, group: &str, resource: &str) {
        self.push(Event::Killed {
            group: group.into(),
            resource: resource.into(),
        });
    }

    fn record_error(&self, group: &str, resource: &str) {
        self.push(Event::Error {
            group: group.into(),
            resource: resource.into(),
        });
    }

    fn observe_delete_duration(&self, resource: &str, _seconds: f64) {
        self.push(Event::DeleteDuration {
            resource: resource.into(),
        });
    }

    async fn flush(&self) -> Result<(), MetricsError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        if self.fail_flush {
            return Err(MetricsError::Flush("collector unreachable".into()));
        }
        Ok(())
    }
}

pub fn deployments() -> ResourceDescriptor {
    ResourceDescriptor::new("apps", "v1", "deployments", "Deployment")
}

pub fn applications() -> ResourceDescriptor {
    ResourceDescriptor::new("oaas.io", "v1alpha1", "applications", "Application")
}

pub fn catalog_of(
    clients: &[(ResourceDescriptor, Arc<MockResourceClient>)],
) -> ResourceCatalog {
    ResourceCatalog::from_entries(
        clients
            .iter()
            .map(|(d, c)| CatalogEntry {
                descriptor: d.clone(),
                client: c.clone(),
            })
            .collect(),
    )
    .expect("valid catalog")
}
