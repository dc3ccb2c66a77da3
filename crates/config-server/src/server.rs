//! Config server router and listener

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{NodeSource, get_config};
use crate::error::ConfigServerError;
use crate::installer::InstallOptions;

/// Shared state for handlers
#[derive(Clone)]
pub struct ConfigServerState {
    pub source: Arc<dyn NodeSource>,
    pub options: InstallOptions,
}

pub fn router(state: ConfigServerState) -> Router {
    Router::new()
        .route("/config/{uuid}", get(get_config))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the task is dropped or the listener fails
pub async fn serve(addr: SocketAddr, state: ConfigServerState) -> Result<(), ConfigServerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Starting config server");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
