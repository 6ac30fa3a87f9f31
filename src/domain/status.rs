//! Overall email status derived from the final confidence score.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Triage status of a processed email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Confidence at or below the phishing threshold
    Phishing,
    /// Between the two thresholds; needs a human look
    Flagged,
    /// Confidence at or above the cleared threshold
    Cleared,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Phishing => "phishing",
            Status::Flagged => "flagged",
            Status::Cleared => "cleared",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Threshold configuration for status classification
///
/// Confidence is "likelihood the email is legitimate", so low scores are
/// phishing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    /// Scores `<=` this are phishing (default: 0.4)
    #[serde(default = "default_phishing_max")]
    pub phishing_max: f64,

    /// Scores `>=` this are cleared (default: 0.6)
    #[serde(default = "default_cleared_min")]
    pub cleared_min: f64,
}

fn default_phishing_max() -> f64 {
    0.4
}
fn default_cleared_min() -> f64 {
    0.6
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            phishing_max: default_phishing_max(),
            cleared_min: default_cleared_min(),
        }
    }
}

impl StatusThresholds {
    /// Create validated thresholds
    pub fn new(phishing_max: f64, cleared_min: f64) -> Result<Self, ThresholdError> {
        let thresholds = Self {
            phishing_max,
            cleared_min,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Check both bounds lie in [0, 1] and are strictly ordered
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (name, value) in [
            ("phishing_max", self.phishing_max),
            ("cleared_min", self.cleared_min),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ThresholdError::OutOfRange { name, value });
            }
        }

        if self.phishing_max >= self.cleared_min {
            return Err(ThresholdError::Inverted {
                phishing_max: self.phishing_max,
                cleared_min: self.cleared_min,
            });
        }

        Ok(())
    }

    /// Map a confidence score to a status
    ///
    /// NaN compares false against both bounds and lands in `Flagged`.
    pub fn classify(&self, confidence: f64) -> Status {
        if confidence <= self.phishing_max {
            Status::Phishing
        } else if confidence >= self.cleared_min {
            Status::Cleared
        } else {
            Status::Flagged
        }
    }
}

/// Invalid threshold configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("Threshold {name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("phishing_max ({phishing_max}) must be below cleared_min ({cleared_min})")]
    Inverted { phishing_max: f64, cleared_min: f64 },
}
