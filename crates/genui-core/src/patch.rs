//! The patch line codec.
//!
//! A patch section is a sequence of newline-delimited JSON objects:
//!
//! ```text
//! {"op":"set","path":"/root","value":"page"}
//! {"op":"set","path":"/elements/page","value":{"type":"Stack","children":["title"]}}
//! ```
//!
//! Decoding never fails loudly. While a response is still streaming the last
//! line is usually cut in half, and a half line must behave exactly like a
//! line that was never sent, so [`decode_line`] returns `Option`.

use crate::JsonValue;
use crate::error::{PatchError, PatchResult};
use crate::types::{ElementKey, ElementNode};
use serde::Deserialize;
use serde_json::json;

/// The only operation this codec applies.
pub const SET_OP: &str = "set";
/// Path that replaces the tree root.
pub const ROOT_PATH: &str = "/root";
/// Prefix of paths that insert or replace a single element.
pub const ELEMENTS_PREFIX: &str = "/elements/";

/// A decoded patch line.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// `/root`. `None` clears the root.
    SetRoot(Option<ElementKey>),
    /// `/elements/<key>`. The node's `key` is the decoded path key.
    SetElement(ElementNode),
}

#[derive(Deserialize)]
struct RawPatch {
    op: String,
    path: String,
    #[serde(default)]
    value: JsonValue,
}

impl PatchOp {
    /// The wire path of this operation, with the element key escaped.
    pub fn path(&self) -> String {
        match self {
            PatchOp::SetRoot(_) => ROOT_PATH.to_string(),
            PatchOp::SetElement(node) => {
                format!("{ELEMENTS_PREFIX}{}", encode_segment(node.key.as_str()))
            }
        }
    }

    /// Encode as a single wire line (no trailing newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        let value = match self {
            PatchOp::SetRoot(root) => serde_json::to_value(root)?,
            PatchOp::SetElement(node) => serde_json::to_value(node)?,
        };
        serde_json::to_string(&json!({
            "op": SET_OP,
            "path": self.path(),
            "value": value,
        }))
    }
}

/// Parse one line, explaining why it is not a patch if it isn't.
pub fn parse_line(line: &str) -> PatchResult<PatchOp> {
    let raw: RawPatch = serde_json::from_str(line.trim())?;
    if raw.op != SET_OP {
        return Err(PatchError::UnsupportedOp { op: raw.op });
    }

    if raw.path == ROOT_PATH {
        return match raw.value {
            JsonValue::String(root) => Ok(PatchOp::SetRoot(Some(root.into()))),
            JsonValue::Null => Ok(PatchOp::SetRoot(None)),
            other => Err(PatchError::InvalidValue {
                path: raw.path,
                reason: format!("root must be a string or null, got {other}"),
            }),
        };
    }

    if let Some(segment) = raw.path.strip_prefix(ELEMENTS_PREFIX) {
        let key = decode_segment(segment).ok_or_else(|| PatchError::UndecodablePath {
            segment: segment.to_string(),
        })?;
        return ElementNode::from_patch_value(key, raw.value).map(PatchOp::SetElement);
    }

    Err(PatchError::UnrecognizedPath { path: raw.path })
}

/// Decode one line, or `None` if it is not (or not yet) a patch.
pub fn decode_line(line: &str) -> Option<PatchOp> {
    parse_line(line).ok()
}

/// Encode one operation as a wire line.
pub fn encode_line(op: &PatchOp) -> serde_json::Result<String> {
    op.to_line()
}

/// Everything after the elements prefix is the key, with `~1` and `~0`
/// standing for `/` and `~`. Any other `~` sequence, or an empty key, is
/// undecodable.
fn decode_segment(segment: &str) -> Option<ElementKey> {
    if segment.is_empty() {
        return None;
    }
    if !segment.contains('~') {
        return Some(ElementKey::from(segment));
    }

    let mut decoded = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => decoded.push('~'),
                Some('1') => decoded.push('/'),
                _ => return None,
            }
        } else {
            decoded.push(c);
        }
    }
    Some(ElementKey::from(decoded))
}

fn encode_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
