//! Node CRD
//!
//! A machine to be registered with the hardware service, PXE-booted and
//! installed. Cluster-wide settings are copied onto the spec by the cluster
//! controller once the Node joins a Cluster.

use std::collections::BTreeMap;
use std::fmt;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::labels::{CLUSTER_NAME_LABEL, LABEL_TRUE, LEADER_LABEL, NODE_READY_LABEL, UUID_LABEL};
use crate::{ClusterSpec, Wifi};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "node.harvesterci.io",
    version = "v1alpha1",
    kind = "Node",
    namespaced,
    status = "NodeStatus",
    derive = "PartialEq",
    shortname = "hnode",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#,
    printcolumn = r#"{"name":"UUID","type":"string","jsonPath":".status.uuid"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    /// MAC address of the PXE interface
    pub mac_address: String,

    #[serde(default)]
    pub token: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,

    /// Name of the PXE interface (e.g. `eth0`)
    pub interface: String,

    /// Static address; nodes without one cannot become leader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    #[serde(
        rename = "pxeIsoURL",
        alias = "isourl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pxe_iso_url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctls: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ntp_servers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_nameservers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wifi: Vec<Wifi>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<String>,
}

impl NodeSpec {
    /// Overwrite the cluster-controlled fields with the cluster's settings.
    ///
    /// Returns `true` if anything changed.
    pub fn apply_cluster_settings(&mut self, cluster: &ClusterSpec) -> bool {
        let before = self.clone();

        self.token = cluster.token.clone();
        self.name_servers = cluster.name_servers.clone();
        self.pxe_iso_url = cluster.pxe_iso_url.clone();
        self.ssh_authorized_keys = cluster.ssh_authorized_keys.clone();
        self.modules = cluster.modules.clone();
        self.sysctls = cluster.sysctls.clone();
        self.ntp_servers = cluster.ntp_servers.clone();
        self.dns_nameservers = cluster.dns_nameservers.clone();
        self.wifi = cluster.wifi.clone();
        self.password = cluster.password.clone();
        self.environment = cluster.environment.clone();
        self.disk = cluster.disk.clone();

        *self != before
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    #[serde(default)]
    pub message: String,

    /// Current phase of the node state machine
    #[serde(rename = "status", default)]
    pub phase: NodePhase,

    /// Hardware identity; never changes once assigned
    #[serde(default)]
    pub uuid: String,

    #[serde(default)]
    pub hardware_published: bool,

    /// Set once the installer has consumed this node's config
    #[serde(default)]
    pub node_ready: bool,
}

/// Node state machine phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodePhase {
    #[default]
    #[serde(rename = "")]
    Pending,

    /// UUID assigned, hardware record not pushed yet
    UidGenerated,

    /// Terminal: hardware record registered
    HardwarePushed,
}

impl NodePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodePhase::Pending => "",
            NodePhase::UidGenerated => "uidgenerated",
            NodePhase::HardwarePushed => "hardwarepushed",
        }
    }
}

impl fmt::Display for NodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePhase::Pending => f.write_str("pending"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl Node {
    pub fn phase(&self) -> NodePhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    /// Cluster this node belongs to, from the `clusterName` label
    pub fn cluster_name(&self) -> Option<&str> {
        label(self, CLUSTER_NAME_LABEL)
    }

    /// Assigned UUID: the `uuid` label wins, then `status.uuid`
    pub fn uuid(&self) -> Option<&str> {
        label(self, UUID_LABEL).or_else(|| {
            self.status
                .as_ref()
                .map(|s| s.uuid.as_str())
                .filter(|u| !u.is_empty())
        })
    }

    pub fn is_leader(&self) -> bool {
        label(self, LEADER_LABEL) == Some(LABEL_TRUE)
    }

    pub fn has_static_address(&self) -> bool {
        self.spec.address.as_deref().is_some_and(|a| !a.is_empty())
    }

    /// Installer already fetched its config
    pub fn is_processed(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.node_ready)
            || self.labels().contains_key(NODE_READY_LABEL)
    }
}

fn label<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.labels()
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}
