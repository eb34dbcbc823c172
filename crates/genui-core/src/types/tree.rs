use crate::types::element::{ElementKey, ElementNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A flat, keyed UI description.
///
/// `root` may name an element that is not in `elements` yet, and children may
/// do the same. Nothing here checks reachability or cycles: a tree is exactly
/// what the patches said, in the order they said it.
///
/// Published trees are shared as `Arc<UiTree>` snapshots and never mutated
/// after publication; the `&mut self` methods are for building a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiTree {
    #[serde(default)]
    pub root: Option<ElementKey>,
    #[serde(default)]
    pub elements: HashMap<ElementKey, ElementNode>,
}

impl UiTree {
    /// An empty tree with no root.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<ElementKey>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_element(mut self, node: ElementNode) -> Self {
        self.insert(node);
        self
    }

    pub fn set_root(&mut self, root: Option<ElementKey>) {
        self.root = root;
    }

    /// Insert or fully replace the element stored under `node.key`.
    pub fn insert(&mut self, node: ElementNode) -> Option<ElementNode> {
        self.elements.insert(node.key.clone(), node)
    }

    pub fn get(&self, key: &str) -> Option<&ElementNode> {
        self.elements.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.elements.contains_key(key)
    }

    pub fn root_element(&self) -> Option<&ElementNode> {
        self.root.as_ref().and_then(|root| self.get(root.as_str()))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when there is neither a root nor any element.
    pub fn is_empty(&self) -> bool {
        self.root.is_none() && self.elements.is_empty()
    }

    /// Resolve the children of `key` in order. Missing children come back as
    /// `None` next to the key that was asked for.
    pub fn children_of(&self, key: &str) -> Vec<(&ElementKey, Option<&ElementNode>)> {
        self.get(key)
            .map(|node| {
                node.children
                    .iter()
                    .map(|child| (child, self.get(child.as_str())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every `(parent, child)` pair where the child is not defined, sorted.
    ///
    /// Only direct references are inspected, so this terminates on trees
    /// that contain cycles.
    pub fn dangling_references(&self) -> Vec<(&ElementKey, &ElementKey)> {
        let mut dangling: Vec<_> = self
            .elements
            .iter()
            .flat_map(|(parent, node)| {
                node.children
                    .iter()
                    .filter(|child| !self.contains(child.as_str()))
                    .map(move |child| (parent, child))
            })
            .collect();
        dangling.sort();
        dangling
    }
}
