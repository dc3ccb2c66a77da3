//! Label and finalizer vocabulary
//!
//! Labels are the only link between a [`Cluster`](crate::Cluster) and its
//! member [`Node`](crate::Node)s. The controller queries them with label
//! selectors and never keeps an in-memory object graph.

/// Finalizer held by a Node while a hardware record may exist remotely
pub const FINALIZER: &str = "register.harvesterci.io";

/// `clusterName=<cluster>` - foreign key from Node to Cluster
pub const CLUSTER_NAME_LABEL: &str = "clusterName";

/// `uuid=<value>` - hardware identity of a Node
pub const UUID_LABEL: &str = "uuid";

/// `leader=true` - elected management-plane leader
pub const LEADER_LABEL: &str = "leader";

/// `ready=true` - cluster settings have been pushed onto the Node
pub const READY_LABEL: &str = "ready";

/// Presence means the installer has already consumed the node's config
pub const NODE_READY_LABEL: &str = "nodeReady";

/// Value used for boolean labels
pub const LABEL_TRUE: &str = "true";
