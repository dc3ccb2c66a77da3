//! Harvester bootstrap CRD definitions
//!
//! Kubernetes Custom Resource Definitions shared by the bootstrap controller
//! and the config server.
//!
//! Two kinds live in the `node.harvesterci.io/v1alpha1` group:
//!
//! - [`Cluster`]: operator-declared cluster with its shared node settings
//! - [`Node`]: a single machine to be PXE-booted and installed
//!
//! Relationships between them are expressed with labels (see [`labels`]),
//! never with embedded references.

pub mod cluster;
pub mod labels;
pub mod node;

pub use cluster::*;
pub use labels::*;
pub use node::*;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of every resource in this crate
pub const API_GROUP: &str = "node.harvesterci.io";

/// Wireless network joined by the installed OS
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Wifi {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub passphrase: String,
}
