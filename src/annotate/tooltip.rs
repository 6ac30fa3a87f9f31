//! Tooltip entry selection.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;

use super::span::{Kind, Span};

/// One displayed justification line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TooltipEntry {
    pub kind: Kind,
    pub reason: String,
}

/// Select tooltip entries for the range `[s, e)`
///
/// Only spans fully containing the range and carrying a non-empty reason
/// are considered. Within each (kind, normalized reason) group the narrowest
/// span wins; the result is ordered by kind, then width.
pub fn select_tooltip_entries(s: usize, e: usize, spans: &[Span]) -> Vec<TooltipEntry> {
    narrowest_per_reason(spans.iter().filter(|span| span.contains(s, e)), |_| true)
}

/// Keep one span per (kind, normalized reason), preferring spans for which
/// `preferred` holds, then the narrowest, then the earliest start
pub(crate) fn narrowest_per_reason<'a, I, P>(spans: I, preferred: P) -> Vec<TooltipEntry>
where
    I: IntoIterator<Item = &'a Span>,
    P: Fn(&Span) -> bool,
{
    let mut best: BTreeMap<(Kind, String), &Span> = BTreeMap::new();

    for span in spans {
        let key = span.reason_key();
        if key.1.is_empty() {
            continue;
        }

        match best.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(span);
            }
            Entry::Occupied(mut slot) => {
                if beats(span, slot.get(), &preferred) {
                    slot.insert(span);
                }
            }
        }
    }

    let mut chosen: Vec<&Span> = best.into_values().collect();
    chosen.sort_by(|a, b| {
        (a.kind, a.width(), a.s, &a.reason).cmp(&(b.kind, b.width(), b.s, &b.reason))
    });

    chosen
        .into_iter()
        .map(|span| TooltipEntry {
            kind: span.kind,
            reason: span.reason.trim().to_string(),
        })
        .collect()
}

/// Ties keep the incumbent, so input order decides between equal spans
fn beats<P: Fn(&Span) -> bool>(candidate: &Span, current: &Span, preferred: &P) -> bool {
    let (candidate_preferred, current_preferred) = (preferred(candidate), preferred(current));
    if candidate_preferred != current_preferred {
        return candidate_preferred;
    }
    (candidate.width(), candidate.s) < (current.width(), current.s)
}
