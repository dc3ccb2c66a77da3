//! Resource store abstraction.
//!
//! Reconcilers read and write `Cluster` and `Node` objects only through
//! [`ResourceStore`], so the state machines can be exercised against an
//! in-memory store in tests. [`KubeStore`] is the Kubernetes implementation.
//!
//! Every update carries the resource version the caller read. A mismatch
//! surfaces as [`ControllerError::Conflict`].

use crate::error::ControllerError;
use crds::{Cluster, ClusterStatus, Node, NodeStatus};
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Read/list/update access to one resource kind
#[async_trait::async_trait]
pub trait ResourceStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Fetch by key; `Ok(None)` if the object does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ControllerError>;

    /// List objects matching every `key=value` pair; `None` lists all namespaces
    async fn list(
        &self,
        namespace: Option<&str>,
        selector: &[(&str, &str)],
    ) -> Result<Vec<K>, ControllerError>;

    /// Persist metadata, spec and status of `object`
    async fn update(&self, object: &K) -> Result<K, ControllerError>;
}

/// Resources whose status is written through the status subresource
pub trait StatusResource {
    type Status: Serialize + PartialEq + Send + Sync;

    fn status_ref(&self) -> Option<&Self::Status>;
}

impl StatusResource for Node {
    type Status = NodeStatus;

    fn status_ref(&self) -> Option<&NodeStatus> {
        self.status.as_ref()
    }
}

impl StatusResource for Cluster {
    type Status = ClusterStatus;

    fn status_ref(&self) -> Option<&ClusterStatus> {
        self.status.as_ref()
    }
}

/// Render `[(k, v), ...]` as a label selector string
pub fn label_selector(selector: &[(&str, &str)]) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// `namespace/name` of an object, used for logging and backoff keys
pub fn object_key<K: ResourceExt>(object: &K) -> String {
    format!(
        "{}/{}",
        object.namespace().unwrap_or_default(),
        object.name_any()
    )
}

/// Kubernetes-backed store
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<Scope = kube::core::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait::async_trait]
impl<K> ResourceStore<K> for KubeStore
where
    K: Resource<Scope = kube::core::NamespaceResourceScope>
        + StatusResource
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    K::DynamicType: Default,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ControllerError> {
        Ok(self.api::<K>(Some(namespace)).get_opt(name).await?)
    }

    async fn list(
        &self,
        namespace: Option<&str>,
        selector: &[(&str, &str)],
    ) -> Result<Vec<K>, ControllerError> {
        let params = ListParams::default().labels(&label_selector(selector));
        let list = self.api::<K>(namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn update(&self, object: &K) -> Result<K, ControllerError> {
        let key = object_key(object);
        let name = object.name_any();
        let api = self.api::<K>(object.namespace().as_deref());

        let replaced = match api.replace(&name, &PostParams::default(), object).await {
            Ok(replaced) => replaced,
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                return Err(ControllerError::Conflict(key));
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                return Err(ControllerError::NotFound(key));
            }
            Err(e) => return Err(e.into()),
        };

        // The main resource endpoint ignores status; write it through the
        // status subresource at the version the replace produced.
        let Some(status) = object.status_ref() else {
            return Ok(replaced);
        };
        if replaced.status_ref() == Some(status) {
            debug!("Status of {} unchanged, skipping status write", key);
            return Ok(replaced);
        }

        let patch = serde_json::json!({
            "metadata": { "resourceVersion": replaced.resource_version() },
            "status": status,
        });
        match api
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(patched) => Ok(patched),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(ControllerError::Conflict(key)),
            // Finalizer removal let the object go
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(replaced),
            Err(e) => Err(e.into()),
        }
    }
}
