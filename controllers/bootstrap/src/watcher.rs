//! Kubernetes resource watchers.
//!
//! Both kinds run through a generic `watch_resource()` helper on top of
//! `kube_runtime::Controller`, which handles reconnection and requeues.
//!
//! Cluster reconciles are also triggered by Node events: a Node maps to the
//! Cluster its `clusterName` label names and to the Cluster controlling it,
//! so both sides of a membership change are woken without polling.

use crate::error::ControllerError;
use crate::reconcile_helpers::clusters_for_node;
use crate::reconciler::{Reconciler, cluster_key, node_key};
use crds::{Cluster, Node};
use futures::StreamExt;
use kube::Api;
use kube_runtime::{
    Controller, watcher,
    controller::{Action, Config as ControllerConfig},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Drive `controller` until its stream ends.
///
/// Failed passes are requeued through the reconciler's per-resource
/// Fibonacci backoff; conflicts retry after a short fixed delay.
async fn watch_resource<K, F>(
    controller: Controller<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    key_fn: fn(&K) -> String,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: kube::Resource<DynamicType = ()>
        + Clone
        + Send
        + Sync
        + 'static
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = key_fn(&obj);
        if error.is_conflict() {
            debug!("Reconciliation conflict for {} {}: {}", resource_name, key, error);
        } else {
            error!("Reconciliation error for {} {}: {}", resource_name, key, error);
        }
        ctx.error_action(&key, error)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        debug!("Reconciling {} {}", resource_name, key_fn(&obj));
        reconcile_fn(ctx, obj)
    };

    // Debounce batches our own status writes into one pass
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(3);

    controller
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!("Reconciled {} {}: {:?}", resource_name, obj, action),
                Err(e) => debug!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    Ok(())
}

/// Watches Node and Cluster resources.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    node_api: Api<Node>,
    cluster_api: Api<Cluster>,
}

impl Watcher {
    pub fn new(reconciler: Arc<Reconciler>, node_api: Api<Node>, cluster_api: Api<Cluster>) -> Self {
        Self {
            reconciler,
            node_api,
            cluster_api,
        }
    }

    /// Starts watching Node resources.
    pub async fn watch_nodes(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(self.node_api.clone(), watcher::Config::default());
        watch_resource(
            controller,
            self.reconciler.clone(),
            |reconciler, node| Box::pin(async move { reconciler.run_node(node).await }),
            node_key,
            "Node",
        )
        .await
    }

    /// Starts watching Cluster resources, plus Nodes mapped to their Clusters.
    pub async fn watch_clusters(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(self.cluster_api.clone(), watcher::Config::default())
            .watches(
                self.node_api.clone(),
                watcher::Config::default(),
                |node: Node| clusters_for_node(&node),
            );
        watch_resource(
            controller,
            self.reconciler.clone(),
            |reconciler, cluster| Box::pin(async move { reconciler.run_cluster(cluster).await }),
            cluster_key,
            "Cluster",
        )
        .await
    }
}
