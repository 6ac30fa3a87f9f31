//! Span construction from detection highlights
//!
//! This module turns raw highlight entries into clamped, kind-tagged spans
//! and provides the reason normalization used for dedup and merge keys.
//!
//! # Offsets
//!
//! All offsets are character indices (Unicode scalar values) into the email
//! body, not byte offsets. Use [`char_slice`] to get the text of a range.

use serde::{Deserialize, Serialize};

use crate::domain::{Detection, Highlight, HighlightEntry};

/// Category of an analysis finding
///
/// The declaration order is the display order: factual findings first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Claim verification
    Factual,
    /// Style and tone
    Language,
    /// Unclassified agent
    Other,
}

impl Kind {
    /// Classify an agent by its name
    ///
    /// "fact" is checked before "lang", so a name containing both is factual.
    pub fn from_agent_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("fact") {
            Kind::Factual
        } else if name.contains("lang") {
            Kind::Language
        } else {
            Kind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Factual => "factual",
            Kind::Language => "language",
            Kind::Other => "other",
        }
    }
}

/// A clamped, non-empty character range with its finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub s: usize,
    pub e: usize,
    pub kind: Kind,
    pub reason: String,
}

impl Span {
    /// Create a span, or `None` if the range is empty or inverted
    pub fn new(s: usize, e: usize, kind: Kind, reason: impl Into<String>) -> Option<Self> {
        (e > s).then(|| Self {
            s,
            e,
            kind,
            reason: reason.into(),
        })
    }

    pub fn width(&self) -> usize {
        self.e - self.s
    }

    /// Whether this span fully contains `[s, e)`
    pub fn contains(&self, s: usize, e: usize) -> bool {
        self.s <= s && self.e >= e
    }

    pub fn normalized_reason(&self) -> String {
        normalize_reason(&self.reason)
    }

    /// Key under which two spans count as the same finding on the same range
    pub(crate) fn dedup_key(&self) -> (Kind, String, usize, usize) {
        (self.kind, self.normalized_reason(), self.s, self.e)
    }

    /// Key under which two spans say the same thing, regardless of range
    pub(crate) fn reason_key(&self) -> (Kind, String) {
        (self.kind, self.normalized_reason())
    }
}

/// Normalize reasoning text: collapse whitespace runs, trim, lower-case
pub fn normalize_reason(reason: &str) -> String {
    reason
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Clamp an entry into `[0, text_len]`, dropping it if nothing remains
fn clamp_entry(entry: &HighlightEntry, kind: Kind, text_len: usize) -> Option<Span> {
    let len = i64::try_from(text_len).unwrap_or(i64::MAX);
    let s = entry.s_idx.clamp(0, len);
    let e = entry.e_idx.clamp(0, len);

    // Both values lie in [0, text_len] after the clamp
    Span::new(s as usize, e as usize, kind, entry.reasoning.as_str())
}

/// Build spans from a highlight payload
///
/// Flat highlights are all language findings. Per-agent highlights take
/// their kind from the agent's name; an agent index with no entry in
/// `agent_types` falls back to [`Kind::Other`].
pub fn spans_from_highlight(
    highlight: &Highlight,
    agent_types: &[String],
    text_len: usize,
) -> Vec<Span> {
    match highlight {
        Highlight::Flat(entries) => entries
            .iter()
            .filter_map(|entry| clamp_entry(entry, Kind::Language, text_len))
            .collect(),
        Highlight::ByAgent(groups) => groups
            .iter()
            .enumerate()
            .flat_map(|(agent_idx, entries)| {
                let kind = agent_types
                    .get(agent_idx)
                    .map(|name| Kind::from_agent_name(name))
                    .unwrap_or(Kind::Other);
                entries
                    .iter()
                    .filter_map(move |entry| clamp_entry(entry, kind, text_len))
            })
            .collect(),
    }
}

/// Build spans from a whole detection (empty if it has no highlight)
pub fn spans_from_detection(detection: &Detection, text_len: usize) -> Vec<Span> {
    detection
        .highlight
        .as_ref()
        .map(|highlight| spans_from_highlight(highlight, &detection.agent_types, text_len))
        .unwrap_or_default()
}

/// Slice `text` by character offsets `[s, e)`
///
/// Offsets past the end are clamped to the end of the text.
pub fn char_slice(text: &str, s: usize, e: usize) -> &str {
    let byte_at = |n: usize| {
        text.char_indices()
            .nth(n)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len())
    };

    let start = byte_at(s);
    let end = byte_at(e).max(start);
    &text[start..end]
}
