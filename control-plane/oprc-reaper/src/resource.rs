use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use kube::ResourceExt;
use kube::core::DynamicObject;
use serde::{Deserialize, Serialize};

/// One scannable Kubernetes kind, as declared in the resources file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    #[serde(default)]
    pub group: String,
    pub version: String,
    /// Plural resource name, e.g. `deployments`.
    pub resource: String,
    /// Kind name used for owner redirection; empty means "scan only".
    #[serde(default)]
    pub kind: String,
    /// Owner kinds honoured when redirecting a delete. Empty = any
    /// catalogued kind.
    #[serde(default)]
    pub owned_by: BTreeSet<String>,
}

impl ResourceDescriptor {
    pub fn new(group: &str, version: &str, resource: &str, kind: &str) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
            kind: kind.into(),
            owned_by: BTreeSet::new(),
        }
    }

    pub fn with_owned_by<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owned_by = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// `group/version`, or just `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Whether an owner reference of `kind` may receive a redirected delete.
    pub fn honours_owner(&self, kind: &str) -> bool {
        self.owned_by.is_empty() || self.owned_by.contains(kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

/// The slice of a listed object that the reaper looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservedObject {
    pub namespace: String,
    pub name: String,
    pub kind: String,
    pub annotations: BTreeMap<String, String>,
    /// In the order the API server returned them.
    pub owner_references: Vec<OwnerRef>,
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl ObservedObject {
    pub fn new(namespace: &str, name: &str, kind: &str) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_owner(mut self, kind: &str, name: &str) -> Self {
        self.owner_references.push(OwnerRef {
            kind: kind.into(),
            name: name.into(),
        });
        self
    }

    pub fn deleting_since(mut self, ts: DateTime<Utc>) -> Self {
        self.deletion_timestamp = Some(ts);
        self
    }

    /// Build from a dynamic list item. `fallback_kind` covers list items that
    /// come back without `kind` set.
    pub fn from_dynamic(obj: &DynamicObject, fallback_kind: &str) -> Self {
        let kind = obj
            .types
            .as_ref()
            .map(|t| t.kind.clone())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| fallback_kind.to_string());
        let owner_references = obj
            .owner_references()
            .iter()
            .map(|r| OwnerRef {
                kind: r.kind.clone(),
                name: r.name.clone(),
            })
            .collect();
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
            kind,
            annotations: obj.annotations().clone(),
            owner_references,
            deletion_timestamp: obj
                .metadata
                .deletion_timestamp
                .as_ref()
                .map(|t| t.0),
        }
    }
}
