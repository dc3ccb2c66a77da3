//! Hardware client errors

use thiserror::Error;

/// Errors that can occur when talking to the hardware registration service
#[derive(Debug, Error)]
pub enum HardwareError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with an unexpected status
    #[error("Hardware API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token rejected by the service
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No record with the requested id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., empty id)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HardwareError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HardwareError::NotFound(_))
    }
}
