//! Terminal rendering of annotated emails.
//!
//! Annotated segments are wrapped in `[[...]]` and numbered; the numbered
//! notes underneath list the tooltip entries. The marker next to each note
//! is driven by the segment's kind set, so a factual-and-language segment
//! reads `F+L`.

use std::fmt::Write;

use serde::Serialize;

use crate::annotate::{Kind, Segment, TooltipEntry};
use crate::core::{InboxEntry, StatusCounts};
use crate::domain::{Detection, StatusThresholds};

/// Segment as emitted by `--format json`
#[derive(Debug, Clone, Serialize)]
pub struct SegmentView<'t> {
    pub s: usize,
    pub e: usize,
    pub text: &'t str,
    pub kinds: Vec<Kind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    pub reason_signature: String,
    pub tooltip: Vec<TooltipEntry>,
}

/// Short marker for a kind set, `None` when unannotated
pub fn marker(kinds: &[Kind]) -> Option<String> {
    if kinds.is_empty() {
        return None;
    }

    let letters: Vec<&str> = kinds
        .iter()
        .map(|kind| match kind {
            Kind::Factual => "F",
            Kind::Language => "L",
            Kind::Other => "O",
        })
        .collect();
    Some(letters.join("+"))
}

pub fn segment_views<'t>(text: &'t str, segments: &[Segment]) -> Vec<SegmentView<'t>> {
    segments
        .iter()
        .map(|segment| SegmentView {
            s: segment.s,
            e: segment.e,
            text: segment.text(text),
            kinds: segment.kinds.clone(),
            marker: marker(&segment.kinds),
            reason_signature: segment.reason_signature.clone(),
            tooltip: segment.tooltip_entries(),
        })
        .collect()
}

/// Render a body with inline markers followed by numbered notes
pub fn render_annotated(text: &str, segments: &[Segment]) -> String {
    let mut body = String::new();
    let mut notes = String::new();
    let mut note_number = 0;

    for segment in segments {
        let slice = segment.text(text);
        let Some(tag) = marker(&segment.kinds) else {
            body.push_str(slice);
            continue;
        };

        note_number += 1;
        let _ = write!(body, "[[{}]]^{}", slice, note_number);
        let _ = writeln!(notes, "[{}] {}", note_number, tag);
        for entry in segment.tooltip_entries() {
            let _ = writeln!(notes, "    {}: {}", entry.kind.as_str(), entry.reason);
        }
    }

    if notes.is_empty() {
        body
    } else {
        format!("{}\n\n{}", body, notes.trim_end())
    }
}

/// Render the verdict block for one detection
pub fn render_verdict(detection: &Detection, thresholds: &StatusThresholds) -> String {
    let mut out = String::new();

    match (detection.final_confidence, detection.status(thresholds)) {
        (Some(confidence), Some(status)) => {
            let _ = writeln!(out, "Status: {} (confidence {:.2})", status, confidence);
        }
        _ => {
            let _ = writeln!(out, "Status: unscored");
        }
    }

    if !detection.agent_types.is_empty() {
        let _ = writeln!(out, "Agents:");
        for (name, confidence) in detection.agents() {
            let confidence = confidence
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "  {:<28} {}", name, confidence);
        }
    }

    if let Some(usage) = detection.token_usage {
        let _ = writeln!(
            out,
            "Tokens: {} total ({} prompt, {} completion)",
            usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
        );
    }

    if detection.summary.trim().is_empty() {
        return out.trim_end().to_string();
    }

    // Summary text is shown exactly as the service wrote it
    let _ = write!(out, "Summary:\n{}", detection.summary);
    out
}

/// Render one inbox entry: headers, verdict and annotated body
pub fn render_entry(entry: &InboxEntry, thresholds: &StatusThresholds) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(88));
    let _ = writeln!(out, "From: {}", entry.email.sender);
    let _ = writeln!(out, "Subject: {}", entry.email.subject);
    match &entry.detection {
        Some(detection) => {
            let _ = writeln!(out, "{}", render_verdict(detection, thresholds));
        }
        None => {
            let _ = writeln!(out, "Status: no detection available");
        }
    }
    let _ = writeln!(out);
    out.push_str(&render_annotated(&entry.email.body, &entry.segments()));

    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

/// Render the inbox listing
pub fn render_inbox_table(entries: &[InboxEntry], counts: &StatusCounts) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<10} {:<10} {:<6} {:<28} {:<30}",
        "ID", "STATUS", "CONF", "SENDER", "SUBJECT"
    );
    let _ = writeln!(out, "{}", "-".repeat(88));

    for entry in entries {
        let id = entry.id.to_string();
        let status = entry
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unscored".to_string());
        let confidence = entry
            .detection
            .as_ref()
            .and_then(|d| d.final_confidence)
            .map(|c| format!("{:.2}", c))
            .unwrap_or_else(|| "-".to_string());

        let _ = writeln!(
            out,
            "{:<10} {:<10} {:<6} {:<28} {:<30}",
            &id[..8],
            status,
            confidence,
            truncate(&entry.email.sender, 28),
            truncate(&entry.email.subject, 30)
        );
    }

    let _ = write!(
        out,
        "\nTotal: {} ({} phishing, {} flagged, {} cleared, {} unscored)",
        counts.total(),
        counts.phishing,
        counts.flagged,
        counts.cleared,
        counts.unscored
    );

    out
}
