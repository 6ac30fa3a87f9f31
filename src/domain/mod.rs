//! Domain types for the PhishNet client.
//!
//! These are the shapes exchanged with the detection service and the
//! verdicts derived from them.

pub mod detection;
pub mod email;
pub mod status;

pub use detection::{Detection, Highlight, HighlightEntry, TokenUsage};
pub use email::{batch_key, parse_email_batch, Email};
pub use status::{Status, StatusThresholds, ThresholdError};
