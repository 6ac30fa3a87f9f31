//! Detection payloads produced by the PhishNet service.
//!
//! Decoding is lenient. A detection whose `highlight` is not an array still
//! decodes (with no highlight), and highlight entries without usable offsets
//! are dropped one by one rather than failing the whole payload. The same
//! holds for the other fields: a value of the wrong type is read as missing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::status::{Status, StatusThresholds};

/// One suspicious character range reported by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightEntry {
    /// Start character offset (may be out of range; clamped later)
    pub s_idx: i64,
    /// End character offset, exclusive
    pub e_idx: i64,
    /// Free-text justification
    #[serde(default)]
    pub reasoning: String,
}

impl HighlightEntry {
    pub fn new(s_idx: i64, e_idx: i64, reasoning: impl Into<String>) -> Self {
        Self {
            s_idx,
            e_idx,
            reasoning: reasoning.into(),
        }
    }

    /// Read an entry from untyped JSON, or `None` if the offsets are unusable
    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let s_idx = offset_from_value(fields.get("s_idx")?)?;
        let e_idx = offset_from_value(fields.get("e_idx")?)?;
        let reasoning = fields
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            s_idx,
            e_idx,
            reasoning,
        })
    }
}

/// Accept integers, finite floats (truncated) and numeric strings
fn offset_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The two shapes the service uses for `highlight`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Highlight {
    /// Single list; every entry is a language finding
    Flat(Vec<HighlightEntry>),
    /// One list per agent, aligned with `agent_types`
    ByAgent(Vec<Vec<HighlightEntry>>),
}

impl Highlight {
    /// Interpret untyped JSON as a highlight
    ///
    /// Returns `None` for anything that is not an array. If any element of
    /// the outer array is itself an array the shape is per-agent; non-array
    /// elements then stand for agents with no findings so that indices keep
    /// lining up with `agent_types`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let items = value.as_array()?;

        if items.iter().any(Value::is_array) {
            let groups = items
                .iter()
                .map(|item| {
                    item.as_array()
                        .map(|entries| {
                            entries.iter().filter_map(HighlightEntry::from_value).collect()
                        })
                        .unwrap_or_default()
                })
                .collect();
            Some(Highlight::ByAgent(groups))
        } else {
            Some(Highlight::Flat(
                items.iter().filter_map(HighlightEntry::from_value).collect(),
            ))
        }
    }

    /// Total number of entries across all agents
    pub fn entry_count(&self) -> usize {
        match self {
            Highlight::Flat(entries) => entries.len(),
            Highlight::ByAgent(groups) => groups.iter().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}

fn lenient_highlight<'de, D>(deserializer: D) -> Result<Option<Highlight>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Highlight::from_value(&value))
}

/// Any value that fails to decode as `T` (including `null`) becomes `None`
fn lenient_optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Non-string names become empty, which classifies as `Kind::Other` while
/// keeping indices aligned with the per-agent highlight groups
fn lenient_agent_types<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| item.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default())
}

fn lenient_confidences<'de, D>(deserializer: D) -> Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|items| items.iter().map(Value::as_f64).collect())
        .unwrap_or_default())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

/// Token accounting reported by the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Per-email verdict returned by the detection service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Weighted confidence that the email is legitimate (1.0 = not phishing)
    #[serde(default, deserialize_with = "lenient_optional")]
    pub final_confidence: Option<f64>,

    /// Agent names, one per agent that evaluated the email
    #[serde(default, deserialize_with = "lenient_agent_types")]
    pub agent_types: Vec<String>,

    /// Per-agent confidence, parallel to `agent_types`
    #[serde(default, deserialize_with = "lenient_confidences")]
    pub agent_confidence: Vec<Option<f64>>,

    /// Free text, displayed verbatim
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,

    #[serde(
        default,
        deserialize_with = "lenient_highlight",
        skip_serializing_if = "Option::is_none"
    )]
    pub highlight: Option<Highlight>,

    #[serde(
        default,
        deserialize_with = "lenient_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_usage: Option<TokenUsage>,
}

impl Detection {
    /// Classify the overall confidence, if the service reported one
    pub fn status(&self, thresholds: &StatusThresholds) -> Option<Status> {
        self.final_confidence.map(|c| thresholds.classify(c))
    }

    /// Agent names paired with their confidence (missing confidences are `None`)
    pub fn agents(&self) -> impl Iterator<Item = (&str, Option<f64>)> + '_ {
        self.agent_types
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let confidence = self.agent_confidence.get(idx).copied().flatten();
                (name.as_str(), confidence)
            })
    }
}
