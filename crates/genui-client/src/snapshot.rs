//! The observable tree and the deltas between published snapshots.

use crate::error::{StoreError, StoreResult};
use genui_core::{SessionId, UiTree};
use json_patch::{Patch, PatchOperation, diff};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// RFC 6902 operations that turn the previously published tree into the
/// current one.
///
/// Observers that mirror the tree elsewhere (a browser, a remote renderer)
/// can forward this instead of the whole snapshot.
#[derive(Debug, Clone, Default)]
pub struct TreeDelta(pub Patch);

impl TreeDelta {
    /// Create an empty delta (no operations).
    #[must_use]
    pub fn empty() -> Self {
        Self(Patch(Vec::new()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.0.len()
    }

    #[must_use]
    pub fn operations(&self) -> &[PatchOperation] {
        &self.0.0
    }

    /// Apply this delta to a JSON rendering of the previous tree.
    ///
    /// # Errors
    ///
    /// Fails if the target does not have the shape the delta was computed from.
    pub fn apply_to(&self, target: &mut serde_json::Value) -> Result<(), json_patch::PatchError> {
        json_patch::patch(target, &self.0)
    }
}

impl Serialize for TreeDelta {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// A tree published to observers.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub session_id: SessionId,
    /// 0 for the starting tree, then increasing by one per publish.
    pub sequence: u64,
    pub tree: Arc<UiTree>,
    pub delta: TreeDelta,
}

/// Holder of the latest published tree.
///
/// Readers get the current `Arc<UiTree>` and may keep it as long as they
/// like; publishing swaps the pointer and never touches a tree that was
/// handed out. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    current: Arc<RwLock<Option<Arc<UiTree>>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest published tree, or `None` before the first publish and
    /// after a reset.
    #[must_use]
    pub fn current(&self) -> Option<Arc<UiTree>> {
        self.current.read().clone()
    }

    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(Option<&UiTree>) -> R,
    {
        let guard = self.current.read();
        f(guard.as_deref())
    }

    /// Publish `tree` and return the delta from the previous tree. Nothing
    /// published counts as the empty tree.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if either tree cannot be
    /// serialized. The new tree is published regardless.
    pub fn publish(&self, tree: Arc<UiTree>) -> StoreResult<TreeDelta> {
        let previous = self.current.write().replace(Arc::clone(&tree));

        let before = match previous.as_deref() {
            Some(previous) => serde_json::to_value(previous),
            None => serde_json::to_value(UiTree::new()),
        }
        .map_err(|e| StoreError::Serialization {
            reason: format!("failed to serialize previous tree: {e}"),
        })?;
        let after = serde_json::to_value(&*tree).map_err(|e| StoreError::Serialization {
            reason: format!("failed to serialize published tree: {e}"),
        })?;

        Ok(TreeDelta(diff(&before, &after)))
    }

    /// Forget the published tree and return it.
    pub fn reset(&self) -> Option<Arc<UiTree>> {
        self.current.write().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genui_core::ElementNode;

    #[test]
    fn starts_empty() {
        let store = SnapshotStore::new();
        assert!(store.current().is_none());
        assert!(store.read(|tree| tree.is_none()));
    }

    #[test]
    fn publishing_the_empty_tree_yields_empty_delta() {
        let store = SnapshotStore::new();
        let delta = store.publish(Arc::new(UiTree::new())).unwrap();
        assert!(delta.is_empty());
        assert!(store.current().is_some());
    }

    #[test]
    fn delta_describes_the_change() {
        let store = SnapshotStore::new();
        store.publish(Arc::new(UiTree::new())).unwrap();

        let tree = UiTree::new()
            .with_root("x")
            .with_element(ElementNode::new("x", "Text"));
        let delta = store.publish(Arc::new(tree)).unwrap();
        assert_eq!(delta.len(), 2);

        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.contains("/elements/x"));
        assert!(json.contains("/root"));
    }

    #[test]
    fn delta_applies_to_previous_tree() {
        let store = SnapshotStore::new();
        let first = UiTree::new().with_element(ElementNode::new("a", "Text"));
        store.publish(Arc::new(first.clone())).unwrap();

        let second = first
            .clone()
            .with_root("a")
            .with_element(ElementNode::new("b", "Badge").with_child("a"));
        let delta = store.publish(Arc::new(second.clone())).unwrap();

        let mut mirror = serde_json::to_value(&first).unwrap();
        delta.apply_to(&mut mirror).expect("delta should apply");
        assert_eq!(mirror, serde_json::to_value(&second).unwrap());
    }

    #[test]
    fn held_snapshots_are_not_changed_by_publish() {
        let store = SnapshotStore::new();
        store.publish(Arc::new(UiTree::new().with_root("old"))).unwrap();
        let held = store.current().unwrap();

        store.publish(Arc::new(UiTree::new().with_root("new"))).unwrap();
        assert_eq!(held.root.as_ref().unwrap(), "old");
        assert_eq!(store.current().unwrap().root.as_ref().unwrap(), "new");
    }

    #[test]
    fn reset_clears_and_clones_share() {
        let store = SnapshotStore::new();
        let other = store.clone();
        store.publish(Arc::new(UiTree::new().with_root("r"))).unwrap();
        assert!(other.current().is_some());

        assert!(other.reset().is_some());
        assert!(store.current().is_none());
    }
}
