use async_trait::async_trait;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::discovery::ApiResource;
use tracing::debug;

use crate::resource::{ObservedObject, ResourceDescriptor};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("resource not found")]
    NotFound,
    #[error("request cancelled")]
    Cancelled,
    #[error("kubernetes api error: {0}")]
    Api(#[source] kube::Error),
}

impl From<kube::Error> for ClientError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(ae) if ae.code == 404 => ClientError::NotFound,
            other => ClientError::Api(other),
        }
    }
}

/// List/delete access to one Kubernetes kind across all namespaces.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    fn kind(&self) -> &str;
    fn group(&self) -> &str;
    fn resource_name(&self) -> &str;

    async fn list(
        &self,
        label_selector: &str,
    ) -> Result<Vec<ObservedObject>, ClientError>;

    async fn delete(&self, namespace: &str, name: &str)
    -> Result<(), ClientError>;
}

/// `Api<DynamicObject>` bound to the group/version/resource of a descriptor.
pub struct DynamicResourceClient {
    client: Client,
    ar: ApiResource,
    descriptor: ResourceDescriptor,
}

impl DynamicResourceClient {
    pub fn new(client: Client, descriptor: ResourceDescriptor) -> Self {
        let gvk = GroupVersionKind::gvk(
            &descriptor.group,
            &descriptor.version,
            &descriptor.kind,
        );
        let ar = ApiResource::from_gvk_with_plural(&gvk, &descriptor.resource);
        Self {
            client,
            ar,
            descriptor,
        }
    }

    fn api_all(&self) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &self.ar)
    }

    /// Cluster-scoped objects come back with an empty namespace.
    fn api_scoped(&self, ns: &str) -> Api<DynamicObject> {
        match namespace_scope(ns) {
            Some(ns) => {
                Api::namespaced_with(self.client.clone(), ns, &self.ar)
            }
            None => self.api_all(),
        }
    }
}

fn namespace_scope(ns: &str) -> Option<&str> {
    if ns.is_empty() { None } else { Some(ns) }
}

#[async_trait]
impl ResourceClient for DynamicResourceClient {
    fn kind(&self) -> &str {
        &self.descriptor.kind
    }

    fn group(&self) -> &str {
        &self.descriptor.group
    }

    fn resource_name(&self) -> &str {
        &self.descriptor.resource
    }

    #[tracing::instrument(
        level = "debug",
        skip(self),
        fields(resource = %self.descriptor.resource)
    )]
    async fn list(
        &self,
        label_selector: &str,
    ) -> Result<Vec<ObservedObject>, ClientError> {
        let mut lp = ListParams::default();
        if !label_selector.is_empty() {
            lp = lp.labels(label_selector);
        }
        let list = self.api_all().list(&lp).await?;
        debug!(count = list.items.len(), "listed objects");
        Ok(list
            .items
            .iter()
            .map(|o| ObservedObject::from_dynamic(o, &self.descriptor.kind))
            .collect())
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClientError> {
        self.api_scoped(namespace)
            .delete(name, &DeleteParams::background())
            .await?;
        Ok(())
    }
}
