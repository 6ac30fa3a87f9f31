//! HTTP client for the PhishNet detection API.
//!
//! Speaks the two endpoints the backend exposes:
//! - `POST {base}/processEmail` with `{"emails": [...]}`
//! - `GET {base}/ping/` returning `{"status": "ok"}`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{decode_results, DetectionError, DetectionService};
use crate::config::ResolvedConfig;
use crate::domain::{Detection, Email};

/// Default API base (the backend's development server)
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Longest error body kept in a `DetectionError::Status`
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ProcessEmailRequest<'a> {
    emails: &'a [Email],
}

#[derive(Debug, Deserialize)]
struct ProcessEmailResponse {
    #[serde(rename = "emailResults", default)]
    email_results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PingResponse {
    status: String,
}

/// Detection service client over HTTP
pub struct HttpDetectionClient {
    /// API base URL without trailing slash
    base_url: String,
    /// Per-request timeout
    timeout: Duration,
    /// HTTP client
    client: reqwest::Client,
}

impl HttpDetectionClient {
    /// Create a new client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.api_base.clone(), config.api_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Decode a `processEmail` response body aligned to `expected` emails
///
/// Short responses are padded with `None`; extra entries are dropped.
pub fn decode_email_results(
    body: &str,
    expected: usize,
) -> Result<Vec<Option<Detection>>, DetectionError> {
    let response: ProcessEmailResponse = serde_json::from_str(body)?;

    let received = response.email_results.len();
    if received != expected {
        warn!(
            expected,
            received, "Detection results do not line up with the submitted batch"
        );
    }

    let mut results = decode_results(response.email_results.into_iter().take(expected).collect());
    results.resize(expected, None);
    Ok(results)
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

#[async_trait]
impl DetectionService for HttpDetectionClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn process_emails(
        &self,
        emails: &[Email],
    ) -> Result<Vec<Option<Detection>>, DetectionError> {
        let url = self.endpoint("processEmail");
        debug!(url = %url, count = emails.len(), "Submitting email batch");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&ProcessEmailRequest { emails })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DetectionError::Status {
                code: status.as_u16(),
                body: truncate_body(body),
            });
        }

        decode_email_results(&body, emails.len())
    }

    async fn health_check(&self) -> Result<(), DetectionError> {
        let url = self.endpoint("ping/");
        debug!(url = %url, "Pinging detection service");

        let response = self.client.get(&url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectionError::Status {
                code: status.as_u16(),
                body: truncate_body(response.text().await.unwrap_or_default()),
            });
        }

        let ping: PingResponse = response.json().await?;
        if ping.status != "ok" {
            return Err(DetectionError::Unhealthy(format!(
                "ping reported status '{}'",
                ping.status
            )));
        }

        Ok(())
    }
}
