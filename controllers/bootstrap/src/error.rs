//! Controller-specific error types.

use config_server::ConfigServerError;
use hardware_client::HardwareError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the bootstrap controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Resource version changed since it was read
    #[error("Conflict updating {0}: object was modified")]
    Conflict(String),

    /// Object disappeared while being updated
    #[error("Not found: {0}")]
    NotFound(String),

    /// Hardware registration service error, with the operation that failed
    #[error("Hardware {operation} failed: {source}")]
    Hardware {
        operation: &'static str,
        #[source]
        source: HardwareError,
    },

    /// Leader election found no member with a static address
    #[error("no member has a static address; cannot elect a leader (cluster {0})")]
    NoLeaderCandidate(String),

    /// No elected leader to derive the server URL from
    #[error("no leader found in cluster {0}")]
    NoLeader(String),

    /// Required label is missing on an object
    #[error("Missing label: {0}")]
    MissingLabel(String),

    /// Object is controlled by another owner
    #[error("Already owned: {0}")]
    AlreadyOwned(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config server error: {0}")]
    ConfigServer(#[from] ConfigServerError),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    pub fn hardware(operation: &'static str, source: HardwareError) -> Self {
        ControllerError::Hardware { operation, source }
    }

    /// Optimistic-concurrency failures are retried quickly, without backoff
    pub fn is_conflict(&self) -> bool {
        matches!(self, ControllerError::Conflict(_))
    }
}
