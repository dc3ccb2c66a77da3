//! JSON message envelope
//!
//! Every non-document response is `{"type": ..., "status": ..., "message": ...}`
//! where `status` is the HTTP status code rendered as a string.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub message: String,
}

impl HttpMessage {
    pub fn new(status: StatusCode, kind: &str, message: &str) -> Self {
        Self {
            kind: kind.to_string(),
            status: status.as_u16().to_string(),
            message: message.to_string(),
        }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::new(status, "error", message)
    }

    pub fn info(message: &str) -> Self {
        Self::new(StatusCode::OK, "info", message)
    }

    fn status_code(&self) -> StatusCode {
        self.status
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for HttpMessage {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
