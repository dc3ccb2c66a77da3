//! Reconciliation logic for Cluster and Node CRDs.
//!
//! - `node`: UUID assignment, hardware registration, deletion cleanup
//! - `cluster`: membership discovery, leader election, settings push,
//!   membership drift
//!
//! The two state machines never call each other; they interact only through
//! the resource store.

pub mod cluster;
pub mod node;


use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::settings::Settings;
use crate::store::{ResourceStore, object_key};
use crds::{Cluster, Node};
use hardware_client::HardwareClientTrait;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Requeue after a pass that advanced a phase
pub(crate) const PHASE_REQUEUE: Duration = Duration::from_secs(2);

/// Requeue after an optimistic-concurrency conflict
pub(crate) const CONFLICT_REQUEUE: Duration = Duration::from_secs(1);

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(5, 300), // 5 seconds min, 5 minutes max
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }
}

/// Reconciles Cluster and Node resources.
pub struct Reconciler {
    pub(crate) nodes: Arc<dyn ResourceStore<Node>>,
    pub(crate) clusters: Arc<dyn ResourceStore<Cluster>>,
    pub(crate) hardware: Arc<dyn HardwareClientTrait>,
    pub(crate) settings: Settings,
    /// Error count tracking per resource (kind/namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    pub fn new(
        nodes: Arc<dyn ResourceStore<Node>>,
        clusters: Arc<dyn ResourceStore<Cluster>>,
        hardware: Arc<dyn HardwareClientTrait>,
        settings: Settings,
    ) -> Self {
        Self {
            nodes,
            clusters,
            hardware,
            settings,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Entry point for the Node watcher: one pass plus failure bookkeeping
    pub async fn run_node(&self, node: Arc<Node>) -> Result<Action, ControllerError> {
        let key = node_key(&node);
        match self.reconcile_node(&node).await {
            Ok(action) => {
                self.reset_error(&key);
                Ok(action)
            }
            Err(e) => {
                if !e.is_conflict() {
                    self.increment_error(&key);
                    self.record_node_message(&node, &e.to_string()).await;
                }
                Err(e)
            }
        }
    }

    /// Entry point for the Cluster watcher
    pub async fn run_cluster(&self, cluster: Arc<Cluster>) -> Result<Action, ControllerError> {
        let key = cluster_key(&cluster);
        match self.reconcile_cluster(&cluster).await {
            Ok(action) => {
                self.reset_error(&key);
                Ok(action)
            }
            Err(e) => {
                if !e.is_conflict() {
                    self.increment_error(&key);
                    self.record_cluster_message(&cluster, &e.to_string()).await;
                }
                Err(e)
            }
        }
    }

    /// Requeue decision after a failed pass
    pub fn error_action(&self, key: &str, error: &ControllerError) -> Action {
        if error.is_conflict() {
            debug!("Conflict on {}, retrying shortly", key);
            return Action::requeue(CONFLICT_REQUEUE);
        }
        let (backoff_seconds, error_count) = self.get_backoff_for_resource(key);
        debug!(
            "Requeueing {} in {}s (consecutive errors: {})",
            key, backoff_seconds, error_count
        );
        Action::requeue(Duration::from_secs(backoff_seconds))
    }

    /// Store a failure message on the Node, only if it differs from the current one.
    async fn record_node_message(&self, node: &Node, message: &str) {
        let namespace = node.namespace().unwrap_or_default();
        let mut current = match self.nodes.get(&namespace, &node.name_any()).await {
            Ok(Some(current)) => current,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read Node {} to record error: {}", object_key(node), e);
                return;
            }
        };
        let status = current.status.get_or_insert_with(Default::default);
        if status.message == message {
            return;
        }
        status.message = message.to_string();
        if let Err(e) = self.nodes.update(&current).await {
            warn!("Failed to record error on Node {}: {}", object_key(node), e);
        }
    }

    async fn record_cluster_message(&self, cluster: &Cluster, message: &str) {
        let namespace = cluster.namespace().unwrap_or_default();
        let mut current = match self.clusters.get(&namespace, &cluster.name_any()).await {
            Ok(Some(current)) => current,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read Cluster {} to record error: {}", object_key(cluster), e);
                return;
            }
        };
        let status = current.status.get_or_insert_with(Default::default);
        if status.message == message {
            return;
        }
        status.message = message.to_string();
        if let Err(e) = self.clusters.update(&current).await {
            warn!("Failed to record error on Cluster {}: {}", object_key(cluster), e);
        }
    }

    /// Get the Fibonacci backoff duration for a resource based on its error count
    ///
    /// Returns (backoff_seconds, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                let backoff_seconds = state.backoff.next_backoff_seconds();
                (backoff_seconds, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (60, 0)
            }
        }
    }

    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .increment_error();
        }
    }

    /// Forget a resource's backoff state (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_backoffs(&self) -> usize {
        self.backoff_states.lock().map(|s| s.len()).unwrap_or_default()
    }
}

pub fn node_key(node: &Node) -> String {
    format!("Node/{}", object_key(node))
}

pub fn cluster_key(cluster: &Cluster) -> String {
    format!("Cluster/{}", object_key(cluster))
}
