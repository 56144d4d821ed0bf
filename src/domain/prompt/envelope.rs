//! Structured reply expected from the model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const DEFAULT_CONFIDENCE: f64 = 0.5;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n(.*?)\n?\s*```\s*$").expect("code fence pattern is valid")
});

/// The JSON envelope a section reply is asked to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub content: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub rationale: String,
    pub sources: Vec<String>,
    pub missing_info: Vec<String>,
}

#[derive(Deserialize)]
struct RawEnvelope {
    content: Value,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    sources: Vec<Value>,
    #[serde(default)]
    missing_info: Vec<Value>,
}

impl ResponseEnvelope {
    /// Parses a model reply, tolerating a surrounding code fence.
    ///
    /// Replies that are not an envelope become the content as-is, with a
    /// neutral confidence and a note that the structure was missing.
    pub fn parse(raw: &str) -> Self {
        let body = CODE_FENCE
            .captures(raw)
            .and_then(|c| c.get(1))
            .map_or(raw, |m| m.as_str());

        match serde_json::from_str::<RawEnvelope>(body) {
            Ok(envelope) => Self::from_raw(envelope),
            Err(e) => {
                warn!(error = %e, "Reply was not a JSON envelope, using raw text");
                Self::unstructured(raw)
            }
        }
    }

    fn from_raw(raw: RawEnvelope) -> Self {
        let confidence = match raw.confidence {
            Some(c) if (0.0..=1.0).contains(&c) => c,
            Some(c) => {
                warn!(confidence = c, "Confidence out of range, clamping to [0, 1]");
                c.clamp(0.0, 1.0)
            }
            None => DEFAULT_CONFIDENCE,
        };

        Self {
            content: value_to_text(raw.content),
            confidence,
            rationale: raw
                .rationale
                .unwrap_or_else(|| "No rationale provided".to_string()),
            sources: raw.sources.into_iter().map(value_to_text).collect(),
            missing_info: raw.missing_info.into_iter().map(value_to_text).collect(),
        }
    }

    fn unstructured(raw: &str) -> Self {
        Self {
            content: raw.to_string(),
            confidence: DEFAULT_CONFIDENCE,
            rationale: "Response was not in expected JSON format".to_string(),
            sources: Vec::new(),
            missing_info: vec!["Structured response format".to_string()],
        }
    }
}

/// Strings pass through; anything else is rendered as pretty JSON.
fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}
