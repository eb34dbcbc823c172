//! The tree store: replaying a patch section onto a base tree.
//!
//! A streaming session never applies a chunk's *new* lines to the previous
//! result. Instead every chunk replays the whole patch section received so
//! far onto the tree the session started from. Lines that are still being
//! received fail to parse and are skipped, and once they are complete a
//! later replay picks them up. The result is the same no matter how the
//! text was chunked.

use crate::patch::{PatchOp, decode_line};
use crate::types::UiTree;

/// How many lines of a batch were applied and how many were skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Apply one decoded operation to a tree that is being built.
pub fn apply_patch(tree: &mut UiTree, op: PatchOp) {
    match op {
        PatchOp::SetRoot(root) => tree.set_root(root),
        PatchOp::SetElement(node) => {
            tree.insert(node);
        }
    }
}

/// Replay `patches` onto a copy of `base`. `base` itself is left untouched.
pub fn apply_batch(base: &UiTree, patches: &str) -> UiTree {
    apply_batch_with_stats(base, patches).0
}

/// Like [`apply_batch`], also counting applied and skipped lines.
/// Blank lines are not counted.
pub fn apply_batch_with_stats(base: &UiTree, patches: &str) -> (UiTree, BatchStats) {
    let mut tree = base.clone();
    let mut stats = BatchStats::default();

    for line in patches.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match decode_line(line) {
            Some(op) => {
                apply_patch(&mut tree, op);
                stats.applied += 1;
            }
            None => stats.skipped += 1,
        }
    }

    (tree, stats)
}
