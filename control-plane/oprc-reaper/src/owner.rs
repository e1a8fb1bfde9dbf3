use std::sync::Arc;

use crate::catalog::ResourceCatalog;
use crate::client::ResourceClient;
use crate::resource::{ObservedObject, ResourceDescriptor};

/// Where a delete for an expired object is sent.
#[derive(Clone)]
pub struct DeletionTarget {
    pub client: Arc<dyn ResourceClient>,
    pub namespace: String,
    pub name: String,
    /// True when the delete goes to an owner instead of the object itself.
    pub redirected: bool,
}

impl std::fmt::Debug for DeletionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionTarget")
            .field("kind", &self.client.kind())
            .field("resource", &self.client.resource_name())
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("redirected", &self.redirected)
            .finish()
    }
}

/// Pick the first owner reference whose kind is catalogued (and allowed by
/// `descriptor.owned_by`), else the object itself via `fallback`.
/// Only direct owners are considered.
pub fn resolve_target(
    obj: &ObservedObject,
    descriptor: &ResourceDescriptor,
    catalog: &ResourceCatalog,
    fallback: &Arc<dyn ResourceClient>,
) -> DeletionTarget {
    let owner = obj.owner_references.iter().find_map(|r| {
        if !descriptor.honours_owner(&r.kind) {
            return None;
        }
        catalog.client_for_kind(&r.kind).map(|c| (c, &r.name))
    });

    match owner {
        Some((client, name)) => DeletionTarget {
            client: client.clone(),
            namespace: obj.namespace.clone(),
            name: name.clone(),
            redirected: true,
        },
        None => DeletionTarget {
            client: fallback.clone(),
            namespace: obj.namespace.clone(),
            name: obj.name.clone(),
            redirected: false,
        },
    }
}
