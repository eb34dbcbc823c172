use crate::JsonValue;
use crate::error::{PatchError, PatchResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;

/// Element Key
///
/// The stable identity of an element within a [`UiTree`](crate::UiTree).
/// Keys are chosen by the model and are opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementKey(String);

impl ElementKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ElementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for ElementKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl AsRef<str> for ElementKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lets maps keyed by `ElementKey` be queried with a plain `&str`.
impl Borrow<str> for ElementKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ElementKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ElementKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A single node of a generated UI.
///
/// Only `key` and `children` carry meaning for the tree store. `type` and
/// `props` are passed through untouched for the renderer, and any other
/// fields the model emits (visibility rules, actions, ...) are kept in
/// `extra` so a node survives a round trip unchanged.
///
/// Every field is optional on the wire and none of them can make a node
/// unreadable: a known field that is null or of the wrong JSON type reads as
/// its default, and a child entry that is not a string is left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(default, deserialize_with = "lenient_key")]
    pub key: ElementKey,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub element_type: String,
    #[serde(default, deserialize_with = "lenient_object")]
    pub props: serde_json::Map<String, JsonValue>,
    /// Child keys in render order. They may name elements that do not exist
    /// (yet); resolving them is the renderer's business.
    #[serde(default, deserialize_with = "lenient_children")]
    pub children: Vec<ElementKey>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl ElementNode {
    pub fn new(key: impl Into<ElementKey>, element_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            element_type: element_type.into(),
            ..Default::default()
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.props.insert(name.into(), value);
        self
    }

    pub fn with_child(mut self, child: impl Into<ElementKey>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I, K>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ElementKey>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Adopt a patch value as the element stored under `key`.
    ///
    /// The value must be a JSON object. Whatever `key` the object itself
    /// claims is dropped: the path decides identity.
    pub fn from_patch_value(key: ElementKey, value: JsonValue) -> PatchResult<Self> {
        let JsonValue::Object(mut fields) = value else {
            return Err(PatchError::InvalidValue {
                path: format!("/elements/{key}"),
                reason: "element value must be an object".to_string(),
            });
        };
        fields.remove("key");

        let mut node: ElementNode = serde_json::from_value(JsonValue::Object(fields))
            .map_err(|e| PatchError::InvalidValue {
                path: format!("/elements/{key}"),
                reason: e.to_string(),
            })?;
        node.key = key;
        Ok(node)
    }
}

fn lenient_key<'de, D>(deserializer: D) -> Result<ElementKey, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(ElementKey)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(value) => Ok(value),
        _ => Ok(String::new()),
    }
}

fn lenient_object<'de, D>(deserializer: D) -> Result<serde_json::Map<String, JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

fn lenient_children<'de, D>(deserializer: D) -> Result<Vec<ElementKey>, D::Error>
where
    D: Deserializer<'de>,
{
    let JsonValue::Array(items) = JsonValue::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            JsonValue::String(key) => Some(ElementKey(key)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_value_is_an_element() {
        let node =
            ElementNode::from_patch_value("x".into(), json!({"children": ["y"]})).unwrap();
        assert_eq!(node.key, "x");
        assert_eq!(node.element_type, "");
        assert!(node.props.is_empty());
        assert_eq!(node.children, vec![ElementKey::from("y")]);
    }

    #[test]
    fn path_key_wins_over_value_key() {
        let node = ElementNode::from_patch_value(
            "card".into(),
            json!({"key": "other", "type": "Card", "props": {"title": "Hi"}}),
        )
        .unwrap();
        assert_eq!(node.key, "card");
        assert_eq!(node.element_type, "Card");
        assert_eq!(node.props["title"], json!("Hi"));
    }

    #[test]
    fn null_props_and_children_are_empty() {
        let node = ElementNode::from_patch_value(
            "a".into(),
            json!({"type": "Text", "props": null, "children": null}),
        )
        .unwrap();
        assert!(node.props.is_empty());
        assert!(node.children.is_empty());
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let node = ElementNode::from_patch_value(
            "btn".into(),
            json!({"type": "Button", "visible": {"path": "/form/ok"}}),
        )
        .unwrap();
        assert_eq!(node.extra["visible"], json!({"path": "/form/ok"}));

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["visible"], json!({"path": "/form/ok"}));
        assert_eq!(back["type"], json!("Button"));
    }

    #[test]
    fn non_object_value_is_rejected() {
        let result = ElementNode::from_patch_value("a".into(), json!("text"));
        assert!(matches!(result, Err(PatchError::InvalidValue { .. })));

        let result = ElementNode::from_patch_value("a".into(), json!(["Text"]));
        assert!(matches!(result, Err(PatchError::InvalidValue { .. })));
    }

    #[test]
    fn value_key_of_any_type_is_ignored() {
        for claimed in [json!(null), json!(7), json!({"k": 1}), json!("other")] {
            let node = ElementNode::from_patch_value(
                "a".into(),
                json!({"key": claimed, "type": "Text"}),
            )
            .unwrap();
            assert_eq!(node.key, "a");
            assert_eq!(node.element_type, "Text");
            assert!(!node.extra.contains_key("key"));
        }
    }

    #[test]
    fn mistyped_type_reads_as_empty() {
        for element_type in [json!(null), json!(3), json!(["Text"])] {
            let node = ElementNode::from_patch_value(
                "a".into(),
                json!({"type": element_type, "props": {"text": "hi"}}),
            )
            .unwrap();
            assert_eq!(node.element_type, "");
            assert_eq!(node.props["text"], json!("hi"));
        }
    }

    #[test]
    fn mistyped_props_read_as_empty() {
        for props in [json!([]), json!("x"), json!(1)] {
            let node =
                ElementNode::from_patch_value("a".into(), json!({"type": "Text", "props": props}))
                    .unwrap();
            assert!(node.props.is_empty());
            assert_eq!(node.element_type, "Text");
        }
    }

    #[test]
    fn non_string_children_are_left_out() {
        let node = ElementNode::from_patch_value(
            "a".into(),
            json!({"type": "Stack", "children": ["b", null, 4, {"key": "c"}, "d"]}),
        )
        .unwrap();
        assert_eq!(node.children, vec![ElementKey::from("b"), ElementKey::from("d")]);

        let node =
            ElementNode::from_patch_value("a".into(), json!({"children": "b"})).unwrap();
        assert!(node.children.is_empty());
    }

    #[test]
    fn lenient_fields_apply_to_plain_deserialization() {
        let node: ElementNode =
            serde_json::from_value(json!({"key": 7, "type": null, "props": [], "extra": true}))
                .unwrap();
        assert_eq!(node.key, "");
        assert_eq!(node.element_type, "");
        assert!(node.props.is_empty());
        assert_eq!(node.extra["extra"], json!(true));
    }

    #[test]
    fn builder() {
        let node = ElementNode::new("list", "Stack")
            .with_prop("gap", json!(4))
            .with_children(["a", "b"])
            .with_child("c");
        assert_eq!(node.children.len(), 3);
        assert_eq!(node.props["gap"], json!(4));
    }
}
