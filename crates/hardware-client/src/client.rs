//! Hardware registration API client
//!
//! JSON over HTTP:
//! - `POST   /v1/hardware`       create or replace a record
//! - `GET    /v1/hardware/{id}`  fetch a record
//! - `DELETE /v1/hardware/{id}`  remove a record

use crate::error::HardwareError;
use crate::hardware_trait::HardwareClientTrait;
use crate::models::Hardware;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Hardware registration API client
pub struct HardwareClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HardwareClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - service base URL (e.g., "http://tink-server:42113")
    /// * `token` - optional bearer token
    pub fn new(base_url: String, token: Option<String>) -> Result<Self, HardwareError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(HardwareError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self, id: &str) -> Result<String, HardwareError> {
        if id.is_empty() {
            return Err(HardwareError::InvalidRequest(
                "hardware id must not be empty".to_string(),
            ));
        }
        Ok(format!(
            "{}/v1/hardware/{}",
            self.base_url,
            urlencoding::encode(id)
        ))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map non-success statuses to errors
    async fn check(response: Response, what: &str) -> Result<Response, HardwareError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(HardwareError::NotFound(what.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                HardwareError::Authentication(format!("{} - {}", status, body)),
            ),
            _ => Err(HardwareError::Api(format!(
                "{} failed: {} - {}",
                what, status, body
            ))),
        }
    }

    /// Register (or re-register) a hardware record
    pub async fn push(&self, hardware: &Hardware) -> Result<(), HardwareError> {
        if hardware.id.is_empty() {
            return Err(HardwareError::InvalidRequest(
                "hardware id must not be empty".to_string(),
            ));
        }
        let url = format!("{}/v1/hardware", self.base_url);
        debug!("Pushing hardware record {} to {}", hardware.id, url);

        let body = serde_json::to_vec(hardware)?;
        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        Self::check(response, &format!("push hardware {}", hardware.id)).await?;
        Ok(())
    }

    /// Fetch a hardware record
    ///
    /// # Returns
    /// * `Err(HardwareError::NotFound)` - no record with that id
    pub async fn lookup(&self, id: &str) -> Result<Hardware, HardwareError> {
        let url = self.record_url(id)?;
        debug!("Looking up hardware record {}", id);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check(response, &format!("hardware {}", id)).await?;

        let text = response.text().await?;
        let hardware: Hardware = serde_json::from_str(&text)?;
        Ok(hardware)
    }

    /// Delete a hardware record
    pub async fn delete(&self, id: &str) -> Result<(), HardwareError> {
        let url = self.record_url(id)?;
        debug!("Deleting hardware record {}", id);

        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check(response, &format!("hardware {}", id)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl HardwareClientTrait for HardwareClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn push(&self, hardware: &Hardware) -> Result<(), HardwareError> {
        self.push(hardware).await
    }

    async fn lookup(&self, id: &str) -> Result<Hardware, HardwareError> {
        self.lookup(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), HardwareError> {
        self.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HardwareClient::new("http://tink:42113/".to_string(), None).unwrap();
        assert_eq!(client.base_url(), "http://tink:42113");
    }

    #[test]
    fn test_record_url_encodes_id() {
        let client = HardwareClient::new("http://tink".to_string(), None).unwrap();
        assert_eq!(
            client.record_url("a b").unwrap(),
            "http://tink/v1/hardware/a%20b"
        );
        assert!(matches!(
            client.record_url(""),
            Err(HardwareError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = HardwareClient::new("http://tink".to_string(), Some(String::new())).unwrap();
        assert!(client.token.is_none());
    }
}
