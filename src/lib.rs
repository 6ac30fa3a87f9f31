//! phishnet - Client core for the PhishNet phishing detection service
//!
//! Submits emails to the detection API and turns the per-span findings it
//! returns into renderable, non-overlapping segments.
//!
//! # Architecture
//!
//! The heart of the crate is a pure annotator:
//! - Highlight spans are clamped and tagged with a kind (factual, language, other)
//! - The body is cut at every span boundary and the leaves are merged back
//!   into maximal runs with identical annotation
//! - Each run carries tooltip lines, one per distinct finding
//!
//! # Modules
//!
//! - `annotate`: Span annotation (Segment, Span, TooltipEntry)
//! - `adapters`: Detection service integrations (HTTP, fixtures)
//! - `core`: Session inbox and in-flight guard
//! - `domain`: Data structures (Email, Detection, Status)
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Annotate a body with a stored detection
//! phishnet annotate --body email.txt --detection detection.json
//!
//! # Process a batch against the API
//! phishnet process emails.json --details
//!
//! # Replay canned detections instead
//! phishnet process demos/emails.json --fixture demos/detections.json --details
//! ```

pub mod adapters;
pub mod annotate;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::adapters::{
    DetectionError, DetectionService, FixtureDetectionService, HttpDetectionClient,
};
pub use crate::annotate::{annotate, Kind, Segment, Span, TooltipEntry};
pub use crate::core::{FailurePolicy, Inbox, InboxEntry, InboxError};
pub use crate::domain::{Detection, Email, Highlight, HighlightEntry, Status, StatusThresholds};
