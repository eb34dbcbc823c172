//! Turning raw chunks into tree snapshots.
//!
//! [`StreamConsumer`] owns the per-session buffers: the accumulated text, the
//! last patch section it applied, and the tree that produced. Every chunk
//! re-runs the whole pipeline on the full text (strip the token marker,
//! split, replay onto the base tree), so a line that arrives in pieces is
//! ignored until it is complete and then picked up as if it had arrived in
//! one go.
//!
//! The consumer is synchronous. Reading the stream, cancellation and
//! publishing live in the [`Controller`](crate::controller::Controller).

use genui_core::{
    BatchStats, SessionId, TokenUsage, UiTree, apply_batch_with_stats, split_response,
    strip_token_marker,
};
use log::trace;
use std::sync::Arc;

/// What changed after feeding a chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkUpdate {
    /// A new tree to publish, if the patch section changed.
    pub tree: Option<Arc<UiTree>>,
    pub conversation_changed: bool,
    /// Line counts of the replay that produced `tree`.
    pub stats: BatchStats,
}

impl ChunkUpdate {
    /// True when there is nothing to tell observers.
    pub fn is_empty(&self) -> bool {
        self.tree.is_none() && !self.conversation_changed
    }
}

/// Per-session accumulation state.
#[derive(Debug)]
pub struct StreamConsumer {
    session_id: SessionId,
    base: Arc<UiTree>,
    decoder: Utf8Decoder,
    buffer: String,
    patch_section: String,
    conversation: String,
    tree: Arc<UiTree>,
    usage: Option<TokenUsage>,
}

impl StreamConsumer {
    /// Start a session on `base`. The working tree is `base` until the
    /// first patch section arrives.
    pub fn new(session_id: SessionId, base: Arc<UiTree>) -> Self {
        Self {
            session_id,
            tree: Arc::clone(&base),
            base,
            decoder: Utf8Decoder::default(),
            buffer: String::new(),
            patch_section: String::new(),
            conversation: String::new(),
            usage: None,
        }
    }

    /// Feed raw bytes. Multi-byte characters split across chunks are held
    /// back until complete.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> ChunkUpdate {
        let text = self.decoder.decode(chunk);
        self.push_text(&text)
    }

    /// Feed already-decoded text.
    pub fn push_text(&mut self, text: &str) -> ChunkUpdate {
        if text.is_empty() {
            return ChunkUpdate::default();
        }
        self.buffer.push_str(text);
        self.rederive()
    }

    /// Flush whatever the decoder still holds at end of stream.
    pub fn finish(&mut self) -> ChunkUpdate {
        let rest = self.decoder.finish();
        self.push_text(&rest)
    }

    fn rederive(&mut self) -> ChunkUpdate {
        let (text, usage) = strip_token_marker(&self.buffer);
        if usage.is_some() {
            self.usage = usage;
        }
        let parts = split_response(text);

        let mut update = ChunkUpdate::default();
        if parts.conversation != self.conversation {
            self.conversation = parts.conversation.to_string();
            update.conversation_changed = true;
        }

        if parts.has_patches() && parts.patches != self.patch_section {
            let (tree, stats) = apply_batch_with_stats(&self.base, parts.patches);
            trace!(
                "session {}: replayed patch section ({} applied, {} skipped, {} bytes)",
                self.session_id,
                stats.applied,
                stats.skipped,
                parts.patches.len()
            );
            self.patch_section = parts.patches.to_string();
            self.tree = Arc::new(tree);
            update.tree = Some(Arc::clone(&self.tree));
            update.stats = stats;
        }

        update
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The tree the session started from.
    pub fn base(&self) -> &Arc<UiTree> {
        &self.base
    }

    /// The latest derived tree.
    pub fn tree(&self) -> &Arc<UiTree> {
        &self.tree
    }

    pub fn conversation(&self) -> &str {
        &self.conversation
    }

    /// The last patch section that was applied.
    pub fn patch_section(&self) -> &str {
        &self.patch_section
    }

    pub fn usage(&self) -> Option<&TokenUsage> {
        self.usage.as_ref()
    }

    /// Everything received so far, marker included.
    pub fn raw_text(&self) -> &str {
        &self.buffer
    }
}

/// Incremental UTF-8 decoding across chunk boundaries.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    out.push_str(valid);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        // Incomplete sequence at the end: keep it for the next chunk.
                        None => {
                            self.pending.drain(..valid_up_to);
                            return out;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + len);
                        }
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
