//! Test utilities for unit testing reconcilers
//!
//! [`MemoryStore`] mimics the API server closely enough for the state
//! machines: resource versions with conflict detection, label-selector
//! lists, uid assignment and finalizer-gated deletion.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::settings::Settings;
use crate::store::{ResourceStore, object_key};
use crds::*;
use hardware_client::MockHardwareClient;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const TEST_NAMESPACE: &str = "default";

type Key = (String, String);

/// In-memory resource store
#[derive(Clone)]
pub struct MemoryStore<K> {
    objects: Arc<Mutex<BTreeMap<Key, K>>>,
    version: Arc<Mutex<u64>>,
    updates: Arc<Mutex<usize>>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            version: Arc::new(Mutex::new(0)),
            updates: Arc::new(Mutex::new(0)),
        }
    }
}

fn key_of<K: ResourceExt>(object: &K) -> Key {
    (object.namespace().unwrap_or_default(), object.name_any())
}

impl<K> MemoryStore<K>
where
    K: Resource + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> String {
        let mut version = self.version.lock().unwrap();
        *version += 1;
        version.to_string()
    }

    /// Create or overwrite an object as an external actor would
    pub fn insert(&self, mut object: K) -> K {
        if object.meta().namespace.is_none() {
            object.meta_mut().namespace = Some(TEST_NAMESPACE.to_string());
        }
        if object.meta().uid.is_none() {
            object.meta_mut().uid = Some(format!("uid-{}", object.name_any()));
        }
        object.meta_mut().resource_version = Some(self.next_version());
        self.objects
            .lock()
            .unwrap()
            .insert(key_of(&object), object.clone());
        object
    }

    pub fn object(&self, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&(TEST_NAMESPACE.to_string(), name.to_string()))
            .cloned()
    }

    /// Modify an object out of band (bumps its resource version)
    pub fn modify(&self, name: &str, f: impl FnOnce(&mut K)) -> K {
        let mut object = self.object(name).unwrap();
        f(&mut object);
        self.insert(object)
    }

    /// Request deletion: finalizers hold the object with a deletion timestamp
    pub fn request_delete(&self, name: &str) {
        let key = (TEST_NAMESPACE.to_string(), name.to_string());
        let mut objects = self.objects.lock().unwrap();
        let Some(object) = objects.get_mut(&key) else {
            return;
        };
        if object.finalizers().is_empty() {
            objects.remove(&key);
            return;
        }
        object.meta_mut().deletion_timestamp = Some(deletion_time());
        object.meta_mut().resource_version = Some(self.next_version());
    }

    pub fn names(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap()
    }
}

fn deletion_time() -> Time {
    serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap()
}

#[async_trait::async_trait]
impl<K> ResourceStore<K> for MemoryStore<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ControllerError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list(
        &self,
        namespace: Option<&str>,
        selector: &[(&str, &str)],
    ) -> Result<Vec<K>, ControllerError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|wanted| ns.as_str() == wanted))
            .filter(|(_, object)| {
                selector
                    .iter()
                    .all(|(k, v)| object.labels().get(*k).map(String::as_str) == Some(*v))
            })
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn update(&self, object: &K) -> Result<K, ControllerError> {
        let key = key_of(object);
        let mut objects = self.objects.lock().unwrap();
        let Some(stored) = objects.get(&key) else {
            return Err(ControllerError::NotFound(object_key(object)));
        };
        if stored.resource_version() != object.resource_version() {
            return Err(ControllerError::Conflict(object_key(object)));
        }

        *self.updates.lock().unwrap() += 1;
        let mut updated = object.clone();
        updated.meta_mut().resource_version = Some(self.next_version());

        if updated.meta().deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            objects.remove(&key);
        } else {
            objects.insert(key, updated.clone());
        }
        Ok(updated)
    }
}

/// Reconciler wired to in-memory collaborators
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub nodes: MemoryStore<Node>,
    pub clusters: MemoryStore<Cluster>,
    pub hardware: MockHardwareClient,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let nodes = MemoryStore::<Node>::new();
        let clusters = MemoryStore::<Cluster>::new();
        let hardware = MockHardwareClient::new("http://mock-hardware");
        let reconciler = Reconciler::new(
            Arc::new(nodes.clone()),
            Arc::new(clusters.clone()),
            Arc::new(hardware.clone()),
            settings,
        );
        Self {
            reconciler,
            nodes,
            clusters,
            hardware,
        }
    }

    pub fn node(&self, name: &str) -> Node {
        self.nodes.object(name).unwrap()
    }

    pub fn cluster(&self, name: &str) -> Cluster {
        self.clusters.object(name).unwrap()
    }

    pub async fn reconcile_node(&self, name: &str) -> Result<kube_runtime::controller::Action, ControllerError> {
        let node = self.node(name);
        self.reconciler.reconcile_node(&node).await
    }

    pub async fn reconcile_cluster(&self, name: &str) -> Result<kube_runtime::controller::Action, ControllerError> {
        let cluster = self.cluster(name);
        self.reconciler.reconcile_cluster(&cluster).await
    }

    /// Names of members currently labelled leader
    pub fn leaders(&self) -> Vec<String> {
        self.nodes
            .names()
            .into_iter()
            .filter(|n| self.node(n).is_leader())
            .collect()
    }
}

pub fn test_settings() -> Settings {
    Settings {
        hardware_url: "http://mock-hardware".to_string(),
        hardware_token: None,
        namespace: None,
        server_url: None,
        config_host: None,
        config_port: 30880,
        config_url_scheme: "http".to_string(),
        harvester_version: "master".to_string(),
    }
}

/// Node with a MAC and interface, optionally labelled into `cluster`
pub fn test_node(name: &str, cluster: Option<&str>, address: Option<&str>) -> Node {
    let mut labels = BTreeMap::new();
    if let Some(cluster) = cluster {
        labels.insert(CLUSTER_NAME_LABEL.to_string(), cluster.to_string());
    }
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: NodeSpec {
            mac_address: format!("52:54:00:00:00:{:02x}", name.len()),
            interface: "eth0".to_string(),
            address: address.map(str::to_string),
            ..Default::default()
        },
        status: None,
    }
}

pub fn test_cluster(name: &str) -> Cluster {
    Cluster {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: ClusterSpec {
            token: "cluster-token".to_string(),
            ssh_authorized_keys: vec!["ssh-ed25519 AAAAC3Nz test@example".to_string()],
            ntp_servers: vec!["0.pool.ntp.org".to_string()],
            dns_nameservers: vec!["10.0.0.254".to_string()],
            password: Some("p4ssw0rd".to_string()),
            disk: Some("/dev/vda".to_string()),
            ..Default::default()
        },
        status: None,
    }
}

pub fn with_status(mut cluster: Cluster, phase: ClusterPhase, members: &[&str]) -> Cluster {
    cluster.status = Some(ClusterStatus {
        members: members.iter().map(|m| m.to_string()).collect(),
        phase,
        message: String::new(),
    });
    cluster
}
