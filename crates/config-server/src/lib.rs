//! Harvester Config Server
//!
//! Serves the Harvester installer configuration for a node, addressed by
//! the node's UUID: `GET /config/{uuid}`.
//!
//! The hardware record pushed by the bootstrap controller embeds this URL in
//! the node's boot metadata, so the installer fetches its config from here
//! after PXE boot.
//!
//! Node lookups go through [`NodeSource`], implemented by the controller on
//! top of the Kubernetes API.

pub mod api;
pub mod error;
pub mod installer;
pub mod message;
pub mod server;

pub use api::NodeSource;
pub use error::ConfigServerError;
pub use installer::{HarvesterConfig, InstallOptions, render_install_config, url_host};
pub use message::HttpMessage;
pub use server::{ConfigServerState, router, serve};
