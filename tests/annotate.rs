//! Span Annotation Integration Tests
//!
//! Tests for partitioning, merging, dedup and tooltip selection over full
//! detection payloads.

use phishnet::annotate::{
    annotate, select_tooltip_entries, spans_from_detection, Kind, Segment,
};
use phishnet::domain::{Detection, Highlight, HighlightEntry};
use proptest::prelude::*;

const FACT_AGENT: &str = "Fact Checking Agent";
const LANGUAGE_AGENT: &str = "Language Analysis Agent";

fn flat(entries: Vec<HighlightEntry>) -> Detection {
    Detection {
        highlight: Some(Highlight::Flat(entries)),
        ..Default::default()
    }
}

fn by_agent(agents: &[&str], groups: Vec<Vec<HighlightEntry>>) -> Detection {
    Detection {
        agent_types: agents.iter().map(|a| a.to_string()).collect(),
        highlight: Some(Highlight::ByAgent(groups)),
        ..Default::default()
    }
}

fn ranges(segments: &[Segment]) -> Vec<(usize, usize)> {
    segments.iter().map(|seg| (seg.s, seg.e)).collect()
}

#[test]
fn test_example_scenario() {
    let text = "Dear Student, act now to verify.";
    let len = text.chars().count();
    let detection = flat(vec![
        HighlightEntry::new(0, 12, "Generic greeting"),
        HighlightEntry::new(17, 26, "Urgency tactic"),
    ]);

    let segments = annotate(text, Some(&detection));

    assert_eq!(ranges(&segments), vec![(0, 12), (12, 17), (17, 26), (26, len)]);
    assert_eq!(segments[0].kinds, vec![Kind::Language]);
    assert!(segments[1].kinds.is_empty());
    assert_eq!(segments[2].kinds, vec![Kind::Language]);
    assert!(segments[3].kinds.is_empty());
    assert_eq!(segments[0].text(text), "Dear Student");
}

#[test]
fn test_null_detection() {
    let text = "See you at the seminar.";
    let len = text.chars().count();

    for segments in [
        annotate(text, None),
        annotate(text, Some(&Detection::default())),
        annotate(text, Some(&flat(vec![]))),
    ] {
        assert_eq!(ranges(&segments), vec![(0, len)]);
        assert!(segments[0].kinds.is_empty());
        assert!(segments[0].covering.is_empty());
        assert_eq!(segments[0].reason_signature, "");
    }
}

#[test]
fn test_malformed_highlight_is_unannotated() {
    let json = r#"{"final_confidence": 0.5, "highlight": {"s_idx": 0, "e_idx": 4}}"#;
    let detection: Detection = serde_json::from_str(json).unwrap();

    let segments = annotate("Hello there", Some(&detection));
    assert_eq!(ranges(&segments), vec![(0, 11)]);
}

#[test]
fn test_idempotent() {
    let text = "Your account is locked. Click here to restore access.";
    let detection = by_agent(
        &[FACT_AGENT, LANGUAGE_AGENT],
        vec![
            vec![HighlightEntry::new(5, 22, "Account was never locked")],
            vec![
                HighlightEntry::new(0, 22, "Alarmist opener"),
                HighlightEntry::new(24, 34, "Bait link"),
            ],
        ],
    );

    let first = annotate(text, Some(&detection));
    let second = annotate(text, Some(&detection));
    assert_eq!(first, second);
}

#[test]
fn test_dedup_across_agents() {
    let text = "Verify your password immediately";
    let entry = HighlightEntry::new(12, 20, "Credential request");
    let detection = by_agent(
        &[LANGUAGE_AGENT, "Secondary Language Agent"],
        vec![vec![entry.clone()], vec![entry]],
    );

    let segments = annotate(text, Some(&detection));
    let target = segments.iter().find(|seg| seg.s == 12).unwrap();
    assert_eq!(target.covering.len(), 1);
    assert_eq!(target.tooltip_entries().len(), 1);
}

#[test]
fn test_merge_abutting_same_reason() {
    let text = "a".repeat(20);
    let detection = flat(vec![
        HighlightEntry::new(0, 10, "urgent"),
        HighlightEntry::new(10, 20, "urgent"),
    ]);

    let segments = annotate(&text, Some(&detection));
    assert_eq!(ranges(&segments), vec![(0, 20)]);
    assert_eq!(segments[0].kinds, vec![Kind::Language]);
    assert_eq!(segments[0].tooltip_entries().len(), 1);
}

#[test]
fn test_no_merge_across_different_reasons() {
    let text = "a".repeat(20);
    let detection = flat(vec![
        HighlightEntry::new(0, 10, "urgent"),
        HighlightEntry::new(10, 20, "threatening"),
    ]);

    let segments = annotate(&text, Some(&detection));
    assert_eq!(ranges(&segments), vec![(0, 10), (10, 20)]);
}

#[test]
fn test_tooltip_narrowing() {
    let text = "x".repeat(60);
    let detection = by_agent(
        &[FACT_AGENT],
        vec![vec![
            HighlightEntry::new(0, 50, "Invoice number does not exist"),
            HighlightEntry::new(10, 20, "invoice number  does not exist"),
        ]],
    );

    let spans = spans_from_detection(&detection, text.len());
    let entries = select_tooltip_entries(10, 20, &spans);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, Kind::Factual);
    assert_eq!(entries[0].reason, "invoice number  does not exist");

    // Same finding everywhere, so the annotator merges the whole range
    let segments = annotate(&text, Some(&detection));
    assert_eq!(ranges(&segments), vec![(0, 50), (50, 60)]);
    assert_eq!(segments[0].tooltip_entries().len(), 1);
}

#[test]
fn test_combined_kinds() {
    let text = "Mailbox deleted in 24 hours";
    let detection = by_agent(
        &[FACT_AGENT, LANGUAGE_AGENT],
        vec![
            vec![HighlightEntry::new(8, 27, "Mailboxes are never deleted without notice")],
            vec![HighlightEntry::new(8, 27, "Artificial deadline")],
        ],
    );

    let segments = annotate(text, Some(&detection));
    assert_eq!(ranges(&segments), vec![(0, 8), (8, 27)]);
    assert_eq!(segments[1].kinds, vec![Kind::Factual, Kind::Language]);

    let tooltip = segments[1].tooltip_entries();
    assert_eq!(tooltip[0].kind, Kind::Factual);
    assert_eq!(tooltip[1].kind, Kind::Language);
}

#[test]
fn test_missing_agent_type_is_other() {
    let text = "Reply with your bank details";
    let detection = by_agent(
        &[FACT_AGENT],
        vec![vec![], vec![HighlightEntry::new(16, 28, "Sensitive data request")]],
    );

    let segments = annotate(text, Some(&detection));
    assert_eq!(segments.last().unwrap().kinds, vec![Kind::Other]);
}

#[test]
fn test_clamping() {
    let text = "0123456789abcdefghij";
    let detection = flat(vec![
        HighlightEntry::new(-5, 10, "leading"),
        HighlightEntry::new(25, 30, "beyond"),
    ]);

    let segments = annotate(text, Some(&detection));
    assert_eq!(ranges(&segments), vec![(0, 10), (10, 20)]);
    assert_eq!(segments[0].covering[0].reason, "leading");
    assert!(segments[1].covering.is_empty());
}

#[test]
fn test_character_offsets() {
    let text = "Ünïcödé ✓ verify now";
    let detection = flat(vec![HighlightEntry::new(10, 16, "Urgency")]);

    let segments = annotate(text, Some(&detection));
    assert_eq!(segments[1].text(text), "verify");
    assert_eq!(segments.last().unwrap().e, text.chars().count());
}

#[test]
fn test_empty_reason_counts_without_tooltip() {
    let text = "Click the link below";
    let detection = flat(vec![
        HighlightEntry::new(0, 14, ""),
        HighlightEntry::new(6, 14, "Bait link"),
    ]);

    let segments = annotate(text, Some(&detection));
    let first = &segments[0];
    assert_eq!((first.s, first.e), (0, 6));
    assert_eq!(first.kinds, vec![Kind::Language]);
    assert!(first.tooltip_entries().is_empty());

    let second = &segments[1];
    assert_eq!(second.tooltip_entries().len(), 1);
}

const REASONS: [&str; 5] = ["urgent", "Urgent  ", "fake office", "", "greeting"];

fn arb_detection() -> impl Strategy<Value = Detection> {
    prop::collection::vec((0usize..3, -10i64..80, -10i64..80, 0usize..REASONS.len()), 0..12)
        .prop_map(|entries| {
            let mut groups: Vec<Vec<HighlightEntry>> = vec![Vec::new(); 3];
            for (agent, s, e, reason) in entries {
                groups[agent].push(HighlightEntry::new(s, e, REASONS[reason]));
            }
            by_agent(&[FACT_AGENT, LANGUAGE_AGENT], groups)
        })
}

proptest! {
    /// Segments are contiguous, ordered and cover the whole text.
    #[test]
    fn prop_partition(text in "[a-z ]{0,60}", detection in arb_detection()) {
        let len = text.chars().count();
        let segments = annotate(&text, Some(&detection));

        prop_assert!(!segments.is_empty());
        prop_assert_eq!(segments[0].s, 0);
        prop_assert_eq!(segments.last().unwrap().e, len);
        for pair in segments.windows(2) {
            prop_assert_eq!(pair[0].e, pair[1].s);
        }
        if len > 0 {
            prop_assert!(segments.iter().all(|seg| seg.e > seg.s));
        }
    }

    /// Covering sets hold exactly the spans containing the segment.
    #[test]
    fn prop_covering_exact(text in "[a-z ]{1,60}", detection in arb_detection()) {
        let len = text.chars().count();
        let spans = spans_from_detection(&detection, len);
        let segments = annotate(&text, Some(&detection));

        for seg in &segments {
            prop_assert!(seg.covering.iter().all(|span| span.contains(seg.s, seg.e)));
            for span in spans.iter().filter(|span| span.contains(seg.s, seg.e)) {
                let present = seg.covering.iter().any(|c| {
                    c.kind == span.kind
                        && c.s == span.s
                        && c.e == span.e
                        && c.normalized_reason() == span.normalized_reason()
                });
                prop_assert!(present);
            }
        }
    }

    /// No two neighbours share the same annotation state.
    #[test]
    fn prop_minimal(text in "[a-z ]{0,60}", detection in arb_detection()) {
        let segments = annotate(&text, Some(&detection));
        for pair in segments.windows(2) {
            prop_assert!(
                pair[0].reason_signature != pair[1].reason_signature
                    || pair[0].kinds != pair[1].kinds
            );
        }
    }
}
