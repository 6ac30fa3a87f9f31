//! Span annotation for email bodies
//!
//! Turns a detection's possibly-overlapping, possibly-per-agent highlight
//! spans into an ordered partition of the text that a renderer can walk
//! segment by segment.
//!
//! # Design Principles
//!
//! - **Never fail**: malformed or out-of-range spans are clamped or dropped;
//!   a missing detection yields one unannotated segment.
//! - **Exact partition**: segments are contiguous, ordered and cover
//!   `[0, len)` exactly once.
//! - **Minimal output**: adjacent leaves with the same kinds and reason
//!   signature are merged.
//! - **Pure**: the same inputs always produce the same segments.
//!
//! # Example
//!
//! ```
//! use phishnet::annotate::annotate;
//! use phishnet::domain::{Detection, Highlight, HighlightEntry};
//!
//! let detection = Detection {
//!     highlight: Some(Highlight::Flat(vec![HighlightEntry::new(0, 4, "Generic greeting")])),
//!     ..Default::default()
//! };
//!
//! let segments = annotate("Dear customer", Some(&detection));
//! assert_eq!(segments.len(), 2);
//! assert_eq!(segments[0].tooltip_entries()[0].reason, "Generic greeting");
//! ```

pub mod segment;
pub mod span;
pub mod tooltip;

pub use segment::{annotate, segments_from_spans, Segment};
pub use span::{
    char_slice, normalize_reason, spans_from_detection, spans_from_highlight, Kind, Span,
};
pub use tooltip::{select_tooltip_entries, TooltipEntry};
