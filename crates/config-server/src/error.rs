//! Config server errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::message::HttpMessage;

#[derive(Debug, Error)]
pub enum ConfigServerError {
    #[error("no config found for {0}")]
    NotFound(String),

    #[error("{count} nodes match uuid {uuid}")]
    Ambiguous { uuid: String, count: usize },

    #[error("node lookup failed: {0}")]
    Lookup(String),

    #[error("server url unavailable: {0}")]
    ServerUrl(String),

    #[error("config generation failed: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigServerError {
    fn status(&self) -> StatusCode {
        match self {
            ConfigServerError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to clients; internal details stay in the logs
    fn public_message(&self) -> &'static str {
        match self {
            ConfigServerError::NotFound(_) => "no config found",
            ConfigServerError::Ambiguous { .. } => "object lookup error",
            ConfigServerError::Lookup(_) => "internal error",
            ConfigServerError::ServerUrl(_) => "server-url fetch error",
            ConfigServerError::Render(_) => "error during config generation",
            ConfigServerError::Io(_) => "internal error",
        }
    }
}

impl IntoResponse for ConfigServerError {
    fn into_response(self) -> Response {
        HttpMessage::error(self.status(), self.public_message()).into_response()
    }
}
