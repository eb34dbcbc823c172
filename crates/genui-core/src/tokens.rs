//! The out-of-band token usage marker.
//!
//! Once the model has finished, the collaborator may append
//! `\n[[TOKENS:{"total":42}]]` to the text stream. The marker is not part of
//! the response and must never reach the splitter.

use crate::JsonValue;
use serde::{Deserialize, Serialize};

pub const TOKEN_MARKER_PREFIX: &str = "[[TOKENS:";
pub const TOKEN_MARKER_SUFFIX: &str = "]]";

/// Shortest tail that is treated as the beginning of a marker still in flight.
const PARTIAL_MARKER_MIN: &str = "\n[[";

/// Token accounting reported by the collaborator.
///
/// Field names vary between providers, so the common spellings are accepted
/// and anything else is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default, alias = "promptTokens", alias = "input")]
    pub input_tokens: Option<u64>,
    #[serde(default, alias = "completionTokens", alias = "output")]
    pub output_tokens: Option<u64>,
    #[serde(default, alias = "total")]
    pub total_tokens: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl TokenUsage {
    /// The reported total, or input plus output when no total was sent.
    pub fn total(&self) -> Option<u64> {
        self.total_tokens.or(match (self.input_tokens, self.output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        })
    }
}

/// Remove a trailing token marker from `text`.
///
/// Returns the text before the marker and the parsed usage. Only a marker
/// at the very end counts: after its closing `]]` nothing but whitespace may
/// follow. A marker that has only partly arrived (no closing `]]` and no
/// line break yet) is removed as well but yields no usage; so does a
/// complete marker whose payload is not valid JSON. Marker-like text in the
/// middle of the response is left alone.
pub fn strip_token_marker(text: &str) -> (&str, Option<TokenUsage>) {
    let start = text
        .rfind(&format!("\n{TOKEN_MARKER_PREFIX}"))
        .or_else(|| text.starts_with(TOKEN_MARKER_PREFIX).then_some(0));

    let Some(start) = start else {
        return (strip_partial_prefix(text), None);
    };

    let marker = text[start..].trim();
    if let Some(payload) = marker
        .strip_prefix(TOKEN_MARKER_PREFIX)
        .and_then(|rest| rest.strip_suffix(TOKEN_MARKER_SUFFIX))
    {
        if !payload.contains('\n') {
            return (&text[..start], serde_json::from_str(payload).ok());
        }
    }

    // Still streaming in: no closing `]]` yet and still on its own line.
    if !marker.contains(TOKEN_MARKER_SUFFIX) && !marker.contains('\n') {
        return (&text[..start], None);
    }

    (strip_partial_prefix(text), None)
}

/// Cut a tail such as `"\n[[TOK"` that may grow into a marker.
fn strip_partial_prefix(text: &str) -> &str {
    let marker = format!("\n{TOKEN_MARKER_PREFIX}");
    for len in (PARTIAL_MARKER_MIN.len()..marker.len()).rev() {
        if text.ends_with(&marker[..len]) {
            return &text[..text.len() - len];
        }
    }
    text
}
