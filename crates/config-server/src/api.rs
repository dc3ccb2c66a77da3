//! `GET /config/{uuid}` handler

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use crds::Node;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::error::ConfigServerError;
use crate::installer::render_install_config;
use crate::message::HttpMessage;
use crate::server::ConfigServerState;

/// Node lookups needed to serve a config
#[async_trait::async_trait]
pub trait NodeSource: Send + Sync {
    /// All nodes labelled `uuid=<uuid>`
    async fn find_by_uuid(&self, uuid: &str) -> Result<Vec<Node>, ConfigServerError>;

    /// Management-plane URL for the node's cluster
    async fn server_url(&self, node: &Node) -> Result<String, ConfigServerError>;
}

pub async fn get_config(
    State(state): State<ConfigServerState>,
    Path(uuid): Path<String>,
) -> Result<Response, ConfigServerError> {
    info!(uuid = %uuid, "serving config request");

    // Anything that cannot be a label value cannot match a node
    if !is_label_value(&uuid) {
        debug!(uuid = %uuid, "malformed uuid");
        return Err(ConfigServerError::NotFound(uuid));
    }

    let mut nodes = state.source.find_by_uuid(&uuid).await?;
    let node = match nodes.len() {
        0 => return Err(ConfigServerError::NotFound(uuid)),
        1 => nodes.remove(0),
        count => {
            warn!(uuid = %uuid, count, "multiple nodes share a uuid");
            return Err(ConfigServerError::Ambiguous { uuid, count });
        }
    };

    if node.is_processed() {
        debug!(node = %node.name_any(), "node already processed");
        return Ok(HttpMessage::info("node already processed").into_response());
    }

    let server_url = state.source.server_url(&node).await?;
    let config = render_install_config(&node, &server_url, &state.options);
    let body = config.to_yaml()?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/yaml")],
        body,
    )
        .into_response())
}

/// Kubernetes label value syntax: up to 63 alphanumerics, `-`, `_` or `.`,
/// starting and ending with an alphanumeric.
fn is_label_value(value: &str) -> bool {
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= 63
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
