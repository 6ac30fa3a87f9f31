//! Partitioning text into uniformly-annotated segments.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::trace;

use super::span::{char_slice, spans_from_detection, Kind, Span};
use super::tooltip::{narrowest_per_reason, TooltipEntry};
use crate::domain::Detection;

/// A maximal run of text sharing one annotation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Start character offset
    pub s: usize,
    /// End character offset, exclusive
    pub e: usize,
    /// Deduplicated spans that fully contain `[s, e)`
    pub covering: Vec<Span>,
    /// Deduplicated spans that covered any leaf merged into this segment
    pub contributing: Vec<Span>,
    /// Sorted distinct kinds present
    pub kinds: Vec<Kind>,
    /// Canonical encoding of the distinct (kind, normalized reason) pairs
    pub reason_signature: String,
}

impl Segment {
    fn unannotated(s: usize, e: usize) -> Self {
        Self {
            s,
            e,
            covering: Vec::new(),
            contributing: Vec::new(),
            kinds: Vec::new(),
            reason_signature: String::new(),
        }
    }

    /// Build the leaf `[a, b)` from every span that fully contains it
    fn leaf(a: usize, b: usize, spans: &[Span]) -> Self {
        let mut seen = HashSet::new();
        let mut covering: Vec<Span> = spans
            .iter()
            .filter(|span| span.contains(a, b))
            .filter(|span| seen.insert(span.dedup_key()))
            .cloned()
            .collect();
        covering.sort_by(compare_spans);

        let kinds: Vec<Kind> = covering
            .iter()
            .map(|span| span.kind)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let reason_signature = reason_signature(&covering);

        Self {
            s: a,
            e: b,
            contributing: covering.clone(),
            covering,
            kinds,
            reason_signature,
        }
    }

    fn can_absorb(&self, leaf: &Segment) -> bool {
        self.e == leaf.s
            && self.reason_signature == leaf.reason_signature
            && self.kinds == leaf.kinds
    }

    fn absorb(&mut self, leaf: Segment) {
        self.e = leaf.e;

        let (s, e) = (self.s, self.e);
        self.covering.retain(|span| span.contains(s, e));

        let mut seen: HashSet<_> = self.contributing.iter().map(Span::dedup_key).collect();
        for span in leaf.contributing {
            if seen.insert(span.dedup_key()) {
                self.contributing.push(span);
            }
        }
        self.contributing.sort_by(compare_spans);
    }

    pub fn width(&self) -> usize {
        self.e - self.s
    }

    pub fn is_annotated(&self) -> bool {
        !self.kinds.is_empty()
    }

    pub fn has_kind(&self, kind: Kind) -> bool {
        self.kinds.contains(&kind)
    }

    /// The text this segment covers
    pub fn text<'t>(&self, text: &'t str) -> &'t str {
        char_slice(text, self.s, self.e)
    }

    /// Tooltip lines for this segment
    ///
    /// Picks the narrowest span per (kind, normalized reason), preferring spans
    /// that contain the whole segment. A run merged from abutting same-reason
    /// spans has no such span, so its narrowest contributor is used instead.
    pub fn tooltip_entries(&self) -> Vec<TooltipEntry> {
        narrowest_per_reason(self.contributing.iter(), |span| {
            span.contains(self.s, self.e)
        })
    }
}

fn compare_spans(a: &Span, b: &Span) -> std::cmp::Ordering {
    (a.kind, a.s, a.e, &a.reason).cmp(&(b.kind, b.s, b.e, &b.reason))
}

/// Canonical, order-independent encoding of the distinct reason pairs
///
/// Each pair is written as `kind:len:reason`. The length prefix keeps the
/// encoding unambiguous whatever characters the reason contains.
fn reason_signature(spans: &[Span]) -> String {
    let pairs: BTreeSet<(Kind, String)> = spans.iter().map(Span::reason_key).collect();

    pairs
        .iter()
        .map(|(kind, reason)| format!("{}:{}:{}", kind.as_str(), reason.len(), reason))
        .collect::<Vec<_>>()
        .join(";")
}

/// Partition `[0, text_len)` given already-clamped spans
pub fn segments_from_spans(text_len: usize, spans: &[Span]) -> Vec<Segment> {
    if spans.is_empty() {
        return vec![Segment::unannotated(0, text_len)];
    }

    let mut cuts: Vec<usize> = Vec::with_capacity(spans.len() * 2 + 2);
    cuts.push(0);
    cuts.push(text_len);
    for span in spans {
        cuts.push(span.s);
        cuts.push(span.e);
    }
    cuts.retain(|&cut| cut <= text_len);
    cuts.sort_unstable();
    cuts.dedup();

    let mut segments: Vec<Segment> = Vec::new();
    for pair in cuts.windows(2) {
        let leaf = Segment::leaf(pair[0], pair[1], spans);
        match segments.last_mut() {
            Some(prev) if prev.can_absorb(&leaf) => prev.absorb(leaf),
            _ => segments.push(leaf),
        }
    }

    if segments.is_empty() {
        segments.push(Segment::unannotated(0, text_len));
    }

    segments
}

/// Annotate `text` with a detection's highlights
///
/// Never fails: a missing detection, a missing highlight or a highlight with
/// no usable spans all produce a single unannotated segment over the whole
/// text.
pub fn annotate(text: &str, detection: Option<&Detection>) -> Vec<Segment> {
    let text_len = text.chars().count();
    let spans = detection
        .map(|detection| spans_from_detection(detection, text_len))
        .unwrap_or_default();

    let segments = segments_from_spans(text_len, &spans);
    trace!(
        text_len,
        spans = spans.len(),
        segments = segments.len(),
        "Annotated text"
    );
    segments
}
