//! Bootstrap Controller
//!
//! Bootstraps Harvester clusters on bare metal from two CRDs:
//! - Cluster: a named group of nodes plus the settings they share
//! - Node: one machine, registered with the hardware provisioning service
//!   so it PXE boots into the Harvester installer
//!
//! The installer fetches its config from the embedded config server.

mod backoff;
mod config_source;
mod controller;
mod error;
mod hardware_record;
mod reconcile_helpers;
mod reconciler;
mod server_url;
mod settings;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use controller::Controller;
use crate::error::ControllerError;
use crate::settings::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // kube's rustls client needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting bootstrap controller");

    let settings = Settings::from_env()?;

    info!("Configuration:");
    info!("  Hardware service URL: {}", settings.hardware_url);
    info!("  Namespace: {}", settings.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Config port: {}", settings.config_port);
    if let Some(url) = &settings.server_url {
        info!("  Fixed server URL: {}", url);
    }

    let controller = Controller::new(settings).await?;
    controller.run().await?;

    Ok(())
}
