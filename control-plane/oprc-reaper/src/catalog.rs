use std::collections::HashMap;
use std::sync::Arc;

use kube::Client;
use tracing::info;

use crate::client::{DynamicResourceClient, ResourceClient};
use crate::resource::ResourceDescriptor;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("no resources configured")]
    Empty,
    #[error("resource entry {index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("kind {0} is configured more than once")]
    DuplicateKind(String),
}

pub struct CatalogEntry {
    pub descriptor: ResourceDescriptor,
    pub client: Arc<dyn ResourceClient>,
}

/// Ordered set of scannable kinds plus the kind → client lookup used for
/// owner redirection. Read-only once built.
pub struct ResourceCatalog {
    entries: Vec<CatalogEntry>,
    by_kind: HashMap<String, Arc<dyn ResourceClient>>,
}

impl ResourceCatalog {
    pub fn from_entries(
        entries: Vec<CatalogEntry>,
    ) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut by_kind = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            let d = &entry.descriptor;
            if d.version.is_empty() {
                return Err(CatalogError::MissingField {
                    index,
                    field: "version",
                });
            }
            if d.resource.is_empty() {
                return Err(CatalogError::MissingField {
                    index,
                    field: "resource",
                });
            }
            if d.kind.is_empty() {
                continue;
            }
            if by_kind
                .insert(d.kind.clone(), entry.client.clone())
                .is_some()
            {
                return Err(CatalogError::DuplicateKind(d.kind.clone()));
            }
        }
        Ok(Self { entries, by_kind })
    }

    /// One `DynamicResourceClient` per descriptor, sharing `client`.
    pub fn connect(
        client: Client,
        descriptors: Vec<ResourceDescriptor>,
    ) -> Result<Self, CatalogError> {
        let entries = descriptors
            .into_iter()
            .map(|descriptor| {
                info!(
                    group = %descriptor.group,
                    version = %descriptor.version,
                    resource = %descriptor.resource,
                    kind = %descriptor.kind,
                    "created resource client"
                );
                CatalogEntry {
                    client: Arc::new(DynamicResourceClient::new(
                        client.clone(),
                        descriptor.clone(),
                    )),
                    descriptor,
                }
            })
            .collect();
        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn client_for_kind(
        &self,
        kind: &str,
    ) -> Option<&Arc<dyn ResourceClient>> {
        self.by_kind.get(kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
