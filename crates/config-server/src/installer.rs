//! Harvester installer configuration
//!
//! Model of the document the Harvester installer consumes, and the pure
//! function that derives it from a [`Node`].

use std::collections::BTreeMap;

use crds::{Node, Wifi};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};

/// Port Harvester nodes join the management plane on
pub const JOIN_PORT: u16 = 8443;

/// Install target when the node does not name one
pub const DEFAULT_DISK: &str = "/dev/sda";

/// Name of the management network in the installer config
pub const MGMT_NETWORK: &str = "harvester-mgmt";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HarvesterConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    pub os: OsConfig,

    pub install: InstallConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

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

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    #[serde(default)]
    pub automatic: bool,

    /// `create` for the cluster leader, `join` for everyone else
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mode: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Network>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iso_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<NetworkInterface>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,

    #[serde(default)]
    pub default_route: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    pub hw_addr: String,
}

/// Inputs that do not come from the Node itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Harvester release used for the default ISO URL
    pub harvester_version: String,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            harvester_version: "master".to_string(),
        }
    }
}

impl InstallOptions {
    pub fn default_iso_url(&self) -> String {
        format!(
            "https://releases.rancher.com/harvester/{v}/harvester-{v}-amd64.iso",
            v = self.harvester_version
        )
    }
}

/// Host part of a URL such as `https://10.0.0.1:6443/` (no scheme, no port).
pub fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let authority = authority.rsplit_once('@').map_or(authority, |(_, a)| a);

    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        bracketed.split_once(']').map(|(h, _)| h)?
    } else {
        match authority.rsplit_once(':') {
            Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
            _ => authority,
        }
    };

    if host.is_empty() { None } else { Some(host) }
}

fn join_url(host: &str) -> String {
    if host.contains(':') {
        format!("https://[{}]:{}", host, JOIN_PORT)
    } else {
        format!("https://{}:{}", host, JOIN_PORT)
    }
}

/// Build the installer config for `node`.
///
/// `server_url` is the management-plane URL resolved for the node's cluster;
/// only its host is used.
pub fn render_install_config(
    node: &Node,
    server_url: &str,
    options: &InstallOptions,
) -> HarvesterConfig {
    let spec = &node.spec;
    let name = node.name_any();

    let os = OsConfig {
        ssh_authorized_keys: spec.ssh_authorized_keys.clone(),
        hostname: name.clone(),
        modules: spec.modules.clone(),
        sysctls: spec.sysctls.clone(),
        ntp_servers: spec.ntp_servers.clone(),
        dns_nameservers: spec.dns_nameservers.clone(),
        wifi: spec.wifi.clone(),
        password: spec
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| name.clone()),
        environment: spec.environment.clone(),
    };

    let mut networks = BTreeMap::new();
    networks.insert(
        MGMT_NETWORK.to_string(),
        Network {
            interfaces: vec![NetworkInterface {
                name: spec.interface.clone(),
                hw_addr: spec.mac_address.clone(),
            }],
            method: "dhcp".to_string(),
            default_route: true,
        },
    );

    let install = InstallConfig {
        automatic: true,
        mode: if node.is_leader() { "create" } else { "join" }.to_string(),
        networks,
        device: spec
            .disk
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DISK.to_string()),
        iso_url: spec
            .pxe_iso_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| options.default_iso_url()),
    };

    HarvesterConfig {
        server_url: url_host(server_url).map(join_url).unwrap_or_default(),
        token: spec.token.clone(),
        os,
        install,
    }
}

impl HarvesterConfig {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
