//! Management-plane URL resolution.
//!
//! A node's installer joins the cluster through the elected leader. In
//! standalone mode `SERVER_URL` pins the URL instead.

use crate::error::ControllerError;
use crate::settings::{API_SERVER_PORT, Settings};
use crate::store::{ResourceStore, object_key};
use config_server::url_host;
use crds::{CLUSTER_NAME_LABEL, Node};
use kube::ResourceExt;

/// `https://<leader address>:6443` for the node's cluster
pub async fn resolve_server_url(
    nodes: &dyn ResourceStore<Node>,
    settings: &Settings,
    node: &Node,
) -> Result<String, ControllerError> {
    if let Some(url) = &settings.server_url {
        return Ok(url.clone());
    }

    let cluster = node.cluster_name().ok_or_else(|| {
        ControllerError::MissingLabel(format!(
            "{} on Node {}",
            CLUSTER_NAME_LABEL,
            object_key(node)
        ))
    })?;

    let mut members = nodes
        .list(node.namespace().as_deref(), &[(CLUSTER_NAME_LABEL, cluster)])
        .await?;
    members.sort_by_key(|n| n.name_any());

    let address = members
        .iter()
        .filter(|n| n.is_leader())
        .find_map(|n| n.spec.address.as_deref().filter(|a| !a.is_empty()))
        .ok_or_else(|| ControllerError::NoLeader(cluster.to_string()))?;

    Ok(format!("https://{}:{}", bracket_host(address), API_SERVER_PORT))
}

/// Installer callback URL: `<scheme>://<host>:<port>/config/<uuid>`
pub fn config_url(settings: &Settings, server_url: &str, uuid: &str) -> Result<String, ControllerError> {
    let host = match settings.config_host.as_deref() {
        Some(host) => host,
        None => url_host(server_url).ok_or_else(|| {
            ControllerError::InvalidConfig(format!("server url '{}' has no host", server_url))
        })?,
    };
    Ok(format!(
        "{}://{}:{}/config/{}",
        settings.config_url_scheme,
        bracket_host(host),
        settings.config_port,
        uuid
    ))
}

fn bracket_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}
