//! Adapter interfaces for the detection service.
//!
//! The inbox talks to a [`DetectionService`]; the HTTP client is the real
//! implementation and the fixture service replays canned results for demos
//! and tests.

pub mod fixture;
pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::domain::{Detection, Email};

pub use fixture::FixtureDetectionService;
pub use http::{decode_email_results, HttpDetectionClient, DEFAULT_API_BASE};

/// Errors surfaced by a detection service
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Detection service request failed")]
    Transport(#[from] reqwest::Error),

    #[error("Detection service returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Failed to decode detection response")]
    Decode(#[from] serde_json::Error),

    #[error("Detection service is unhealthy: {0}")]
    Unhealthy(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

/// A service that scores batches of emails
#[async_trait]
pub trait DetectionService: Send + Sync {
    /// Human-readable service name
    fn name(&self) -> &str;

    /// Score a batch; the result is positionally aligned with `emails`
    ///
    /// `None` at position `i` means no detection is available for email `i`.
    async fn process_emails(
        &self,
        emails: &[Email],
    ) -> Result<Vec<Option<Detection>>, DetectionError>;

    /// Liveness probe
    async fn health_check(&self) -> Result<(), DetectionError>;
}

/// Decode `emailResults` entries one by one
///
/// A `null` entry or one that fails to decode becomes `None`; a single bad
/// detection never sinks the rest of the batch.
pub(crate) fn decode_results(raw: Vec<Value>) -> Vec<Option<Detection>> {
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            if value.is_null() {
                return None;
            }
            match serde_json::from_value(value) {
                Ok(detection) => Some(detection),
                Err(err) => {
                    warn!(index, error = %err, "Discarding malformed detection");
                    None
                }
            }
        })
        .collect()
}
