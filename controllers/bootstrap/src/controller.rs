//! Main controller implementation.
//!
//! Wires the Kubernetes client, the hardware registration client and the
//! reconciler together, then runs three long-lived tasks:
//! - the Node watcher
//! - the Cluster watcher (also woken by labelled Node events)
//! - the installer config server

use crate::config_source::StoreNodeSource;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::settings::Settings;
use crate::store::{KubeStore, ResourceStore};
use crate::watcher::Watcher;
use config_server::{ConfigServerError, ConfigServerState};
use crds::{Cluster, Node};
use hardware_client::HardwareClient;
use kube::{Api, Client};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for cluster bootstrap.
pub struct Controller {
    node_watcher: JoinHandle<Result<(), ControllerError>>,
    cluster_watcher: JoinHandle<Result<(), ControllerError>>,
    config_server: JoinHandle<Result<(), ConfigServerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(settings: Settings) -> Result<Self, ControllerError> {
        info!("Initializing bootstrap controller");

        let kube_client = Client::try_default().await?;

        let hardware_client =
            HardwareClient::new(settings.hardware_url.clone(), settings.hardware_token.clone())
                .map_err(|e| ControllerError::hardware("connect", e))?;

        let store = KubeStore::new(kube_client.clone());
        let nodes: Arc<dyn ResourceStore<Node>> = Arc::new(store.clone());
        let clusters: Arc<dyn ResourceStore<Cluster>> = Arc::new(store);

        let (node_api, cluster_api): (Api<Node>, Api<Cluster>) = match settings.namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(kube_client.clone(), ns),
                Api::namespaced(kube_client.clone(), ns),
            ),
            None => (Api::all(kube_client.clone()), Api::all(kube_client)),
        };

        let reconciler = Arc::new(Reconciler::new(
            nodes.clone(),
            clusters,
            Arc::new(hardware_client),
            settings.clone(),
        ));
        let watcher_instance = Arc::new(Watcher::new(reconciler, node_api, cluster_api));

        let node_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_nodes().await })
        };

        let cluster_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_clusters().await })
        };

        let config_server = {
            let addr = SocketAddr::from(([0, 0, 0, 0], settings.config_port));
            let state = ConfigServerState {
                source: Arc::new(StoreNodeSource::new(nodes, settings.clone())),
                options: settings.install_options(),
            };
            tokio::spawn(async move { config_server::serve(addr, state).await })
        };

        Ok(Self {
            node_watcher,
            cluster_watcher,
            config_server,
        })
    }

    /// Runs the controller until any task exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Bootstrap controller running");

        tokio::select! {
            result = &mut self.node_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Node watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Node watcher error: {}", e)))?;
            }
            result = &mut self.cluster_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Cluster watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Cluster watcher error: {}", e)))?;
            }
            result = &mut self.config_server => {
                result.map_err(|e| ControllerError::Watch(format!("Config server panicked: {}", e)))??;
            }
        }

        Ok(())
    }
}
