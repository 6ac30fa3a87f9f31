//! Fixture-backed detection service.
//!
//! Replays canned detections positionally. Fixtures are handed in
//! explicitly, either in memory or from a JSON file in the same shape the
//! API returns (`{"emailResults": [...]}` or a bare array).

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use super::{decode_results, DetectionError, DetectionService};
use crate::domain::{Detection, Email};

/// Detection service that returns pre-recorded results
#[derive(Debug, Clone, Default)]
pub struct FixtureDetectionService {
    results: Vec<Option<Detection>>,
}

impl FixtureDetectionService {
    pub fn new(results: Vec<Option<Detection>>) -> Self {
        Self { results }
    }

    /// Parse fixtures from JSON
    pub fn from_json(json: &str) -> Result<Self, DetectionError> {
        let value: Value = serde_json::from_str(json)?;

        let raw = match value {
            Value::Array(items) => items,
            Value::Object(mut fields) => match fields.remove("emailResults") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(DetectionError::Fixture(
                        "expected an 'emailResults' array".to_string(),
                    ))
                }
            },
            _ => {
                return Err(DetectionError::Fixture(
                    "expected an array or an object with 'emailResults'".to_string(),
                ))
            }
        };

        Ok(Self::new(decode_results(raw)))
    }

    /// Load fixtures from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, DetectionError> {
        let json = std::fs::read_to_string(path).map_err(|err| {
            DetectionError::Fixture(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[async_trait]
impl DetectionService for FixtureDetectionService {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn process_emails(
        &self,
        emails: &[Email],
    ) -> Result<Vec<Option<Detection>>, DetectionError> {
        Ok((0..emails.len())
            .map(|idx| self.results.get(idx).cloned().flatten())
            .collect())
    }

    async fn health_check(&self) -> Result<(), DetectionError> {
        Ok(())
    }
}
