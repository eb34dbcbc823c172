//! Core types for streamed generative UI.
//!
//! A language model answers a prompt with some conversational prose, a `---`
//! separator line and then newline-delimited patch lines such as
//! `{"op":"set","path":"/elements/card","value":{...}}`. This crate holds the
//! pure pieces of that protocol: the [`UiTree`] data model, the patch line
//! codec, the response splitter and the tree store that replays a patch
//! section onto a base tree.

pub mod error;
pub mod patch;
pub mod split;
pub mod store;
pub mod tokens;
pub mod types;

pub use error::{PatchError, PatchResult};
pub use patch::{PatchOp, decode_line, encode_line, parse_line};
pub use split::{ResponseParts, split_response};
pub use store::{BatchStats, apply_batch, apply_batch_with_stats};
pub use tokens::{TokenUsage, strip_token_marker};
pub use types::{ElementKey, ElementNode, SessionId, UiTree};

/// Re-export to ensure the same type is used
pub use serde_json::Value as JsonValue;
