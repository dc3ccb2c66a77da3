//! Node lookups for the config server, backed by the resource store.

use crate::server_url::resolve_server_url;
use crate::settings::Settings;
use crate::store::ResourceStore;
use config_server::{ConfigServerError, NodeSource};
use crds::{Node, UUID_LABEL};
use std::sync::Arc;

pub struct StoreNodeSource {
    nodes: Arc<dyn ResourceStore<Node>>,
    settings: Settings,
}

impl StoreNodeSource {
    pub fn new(nodes: Arc<dyn ResourceStore<Node>>, settings: Settings) -> Self {
        Self { nodes, settings }
    }
}

#[async_trait::async_trait]
impl NodeSource for StoreNodeSource {
    async fn find_by_uuid(&self, uuid: &str) -> Result<Vec<Node>, ConfigServerError> {
        self.nodes
            .list(self.settings.namespace.as_deref(), &[(UUID_LABEL, uuid)])
            .await
            .map_err(|e| ConfigServerError::Lookup(e.to_string()))
    }

    async fn server_url(&self, node: &Node) -> Result<String, ConfigServerError> {
        resolve_server_url(self.nodes.as_ref(), &self.settings, node)
            .await
            .map_err(|e| ConfigServerError::ServerUrl(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryStore, test_node, test_settings};
    use crds::{LABEL_TRUE, LEADER_LABEL};
    use kube::ResourceExt;

    fn with_uuid(mut node: Node, uuid: &str) -> Node {
        node.labels_mut()
            .insert(UUID_LABEL.to_string(), uuid.to_string());
        node
    }

    #[tokio::test]
    async fn test_find_by_uuid() {
        let store = MemoryStore::<Node>::new();
        store.insert(with_uuid(test_node("n1", Some("c1"), None), "u1"));
        store.insert(with_uuid(test_node("n2", Some("c1"), None), "u2"));
        let source = StoreNodeSource::new(Arc::new(store), test_settings());

        let found = source.find_by_uuid("u2").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name_any(), "n2");
        assert!(source.find_by_uuid("u3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_url_from_leader() {
        let store = MemoryStore::<Node>::new();
        let mut leader = test_node("n1", Some("c1"), Some("10.0.0.1"));
        leader
            .labels_mut()
            .insert(LEADER_LABEL.to_string(), LABEL_TRUE.to_string());
        store.insert(leader);
        let member = store.insert(with_uuid(test_node("n2", Some("c1"), None), "u2"));
        let source = StoreNodeSource::new(Arc::new(store), test_settings());

        assert_eq!(
            source.server_url(&member).await.unwrap(),
            "https://10.0.0.1:6443"
        );
    }

    #[tokio::test]
    async fn test_server_url_without_leader() {
        let store = MemoryStore::<Node>::new();
        let member = store.insert(test_node("n2", Some("c1"), None));
        let source = StoreNodeSource::new(Arc::new(store), test_settings());

        let err = source.server_url(&member).await.unwrap_err();
        assert!(matches!(err, ConfigServerError::ServerUrl(_)));
    }
}
