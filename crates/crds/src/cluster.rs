//! Cluster CRD
//!
//! Declares a Harvester cluster and the settings pushed onto every member
//! Node. Membership is derived from Nodes labelled `clusterName=<name>`.

use std::collections::BTreeMap;
use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Wifi;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "node.harvesterci.io",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus",
    derive = "PartialEq",
    shortname = "hcluster",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster join token
    #[serde(default)]
    pub token: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// ISO URL override used for PXE boot and installation
    #[serde(rename = "pxeIsoURL", default, skip_serializing_if = "Option::is_none")]
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

    /// Console password; the installer falls back to the node name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    /// Install target device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Sorted, de-duplicated names of the member Nodes
    #[serde(default)]
    pub members: Vec<String>,

    /// Current phase of the cluster state machine
    #[serde(rename = "status", default)]
    pub phase: ClusterPhase,

    #[serde(default)]
    pub message: String,
}

/// Cluster state machine phase
///
/// Serializes to the legacy strings (`""`, `ElectLeader`, `PatchNodes`,
/// `Nodesubmitted`). `NodeSubmitted` is still accepted when reading objects
/// written by older releases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default)]
pub enum ClusterPhase {
    /// Membership not yet identified
    #[default]
    #[serde(rename = "")]
    Pending,

    ElectLeader,

    PatchNodes,

    /// Steady state: settings pushed, watching for membership drift
    #[serde(rename = "Nodesubmitted", alias = "NodeSubmitted")]
    NodeSubmitted,
}

impl ClusterPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterPhase::Pending => "",
            ClusterPhase::ElectLeader => "ElectLeader",
            ClusterPhase::PatchNodes => "PatchNodes",
            ClusterPhase::NodeSubmitted => "Nodesubmitted",
        }
    }
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterPhase::Pending => f.write_str("Pending"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl Cluster {
    /// Current phase, treating a missing status as `Pending`
    pub fn phase(&self) -> ClusterPhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    /// Recorded member names (empty when no status has been written)
    pub fn members(&self) -> &[String] {
        self.status
            .as_ref()
            .map(|s| s.members.as_slice())
            .unwrap_or(&[])
    }
}
