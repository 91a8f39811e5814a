//! The nested value tree and its flat↔nested conversions.
//!
//! A tree is reconstructed incrementally from decoded `(path, value)` pairs.
//! The first key seen at a prefix fixes whether that prefix is an object or
//! an array; a later conflicting key is a [`ResolveError::ShapeConflict`].
//!
//! `flatten` is the wire-facing inverse: it walks the tree depth-first and
//! emits one `flat name → value` entry per leaf, collapsing an all-text list
//! into a single multi-value entry the way a multi-select or checkbox group
//! submits. `reconstruct(flatten(t)) == t` for trees with text leaves and no
//! empty containers.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use formwire_path::{decode, encode, PathKey};
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Metadata for an uploaded file. The bytes themselves never enter the tree:
/// a file input cannot be re-hydrated from a serialized result, so only the
/// identifying metadata is carried through resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size: u64,
}

/// A node of the reconstructed value tree.
///
/// Serializes untagged: maps, lists and strings render as plain JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormValue {
    Text(String),
    File(FileUpload),
    List(Vec<FormValue>),
    Map(BTreeMap<String, FormValue>),
}

impl FormValue {
    pub fn text(value: impl Into<String>) -> Self {
        FormValue::Text(value.into())
    }

    pub fn empty_map() -> Self {
        FormValue::Map(BTreeMap::new())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Look up the node addressed by `path`, if the tree has one.
    pub fn at<'a>(&'a self, path: &[PathKey]) -> Option<&'a FormValue> {
        let mut node = self;
        for key in path {
            node = match (node, key) {
                (FormValue::Map(entries), PathKey::Field(field)) => entries.get(field)?,
                (FormValue::List(items), PathKey::Index(index)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

/// A flattened leaf value: a single text entry, or the collected values of a
/// multi-value field in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatValue {
    One(String),
    Many(Vec<String>),
}

fn shape_conflict(name: &str, message: impl Into<String>) -> ResolveError {
    ResolveError::ShapeConflict {
        name: name.to_string(),
        message: message.into(),
    }
}

fn container_for(key: &PathKey) -> FormValue {
    match key {
        PathKey::Field(_) => FormValue::Map(BTreeMap::new()),
        PathKey::Index(_) => FormValue::List(Vec::new()),
    }
}

/// Merge a leaf value into an occupied slot: a repeated key accumulates into
/// an ordered list, preserving submission order.
fn merge_leaf(slot: &mut FormValue, value: FormValue, name: &str) -> Result<(), ResolveError> {
    match slot {
        FormValue::List(items) if items.iter().all(is_leaf) => {
            items.push(value);
            Ok(())
        }
        FormValue::Text(_) | FormValue::File(_) => {
            let prev = std::mem::replace(slot, FormValue::List(Vec::new()));
            let FormValue::List(items) = slot else {
                unreachable!()
            };
            items.push(prev);
            items.push(value);
            Ok(())
        }
        _ => Err(shape_conflict(
            name,
            "a value cannot repeat a name that already holds nested entries",
        )),
    }
}

fn is_leaf(value: &FormValue) -> bool {
    matches!(value, FormValue::Text(_) | FormValue::File(_))
}

fn insert_at(
    node: &mut FormValue,
    name: &str,
    path: &[PathKey],
    value: FormValue,
) -> Result<(), ResolveError> {
    let (key, rest) = path.split_first().expect("insert_at requires a non-empty path");
    match (node, key) {
        (FormValue::Map(entries), PathKey::Field(field)) => {
            if rest.is_empty() {
                return match entries.entry(field.clone()) {
                    Entry::Occupied(mut slot) => merge_leaf(slot.get_mut(), value, name),
                    Entry::Vacant(slot) => {
                        slot.insert(value);
                        Ok(())
                    }
                };
            }
            let child = entries
                .entry(field.clone())
                .or_insert_with(|| container_for(&rest[0]));
            insert_at(child, name, rest, value)
        }
        (FormValue::List(items), PathKey::Index(index)) => {
            if *index > items.len() {
                return Err(shape_conflict(
                    name,
                    format!(
                        "array index {index} skips ahead of the {} entries seen so far",
                        items.len()
                    ),
                ));
            }
            if *index == items.len() {
                if rest.is_empty() {
                    items.push(value);
                } else {
                    let mut child = container_for(&rest[0]);
                    insert_at(&mut child, name, rest, value)?;
                    items.push(child);
                }
                Ok(())
            } else {
                let child = &mut items[*index];
                if rest.is_empty() {
                    merge_leaf(child, value, name)
                } else {
                    insert_at(child, name, rest, value)
                }
            }
        }
        (FormValue::Map(_), PathKey::Index(_)) => Err(shape_conflict(
            name,
            "this prefix already resolved to an object, but the entry indexes an array",
        )),
        (FormValue::List(_), PathKey::Field(_)) => Err(shape_conflict(
            name,
            "this prefix already resolved to an array, but the entry names an object key",
        )),
        (FormValue::Text(_) | FormValue::File(_), _) => Err(shape_conflict(
            name,
            "this prefix already holds a value, but the entry descends below it",
        )),
    }
}

/// Insert one decoded `(path, value)` pair into a tree rooted at a map.
///
/// The root of a form is always keyed by field names: a name that starts with
/// an array index has nowhere to attach.
pub(crate) fn insert_root(
    root: &mut BTreeMap<String, FormValue>,
    name: &str,
    path: &[PathKey],
    value: FormValue,
) -> Result<(), ResolveError> {
    let Some((PathKey::Field(_), _)) = path.split_first() else {
        return Err(shape_conflict(
            name,
            "the root of a form is keyed by field names, not indices",
        ));
    };
    let mut wrapper = FormValue::Map(std::mem::take(root));
    let result = insert_at(&mut wrapper, name, path, value);
    let FormValue::Map(entries) = wrapper else {
        unreachable!()
    };
    *root = entries;
    result
}

/// Flatten a value tree into `flat name → value` entries.
///
/// A list whose elements are all text collapses into one multi-value entry in
/// element order; file leaves have no wire form and are skipped.
pub fn flatten(tree: &FormValue) -> BTreeMap<String, FlatValue> {
    let mut out = BTreeMap::new();
    let mut path: Vec<PathKey> = Vec::new();
    walk(tree, &mut path, &mut out);
    out
}

fn walk(node: &FormValue, path: &mut Vec<PathKey>, out: &mut BTreeMap<String, FlatValue>) {
    match node {
        FormValue::Text(value) => {
            out.insert(encode(path), FlatValue::One(value.clone()));
        }
        FormValue::File(_) => {}
        FormValue::List(items) => {
            let all_text = !items.is_empty()
                && items.iter().all(|item| matches!(item, FormValue::Text(_)));
            if all_text {
                let values = items
                    .iter()
                    .filter_map(|item| item.as_text().map(str::to_string))
                    .collect();
                out.insert(encode(path), FlatValue::Many(values));
            } else {
                for (index, item) in items.iter().enumerate() {
                    path.push(PathKey::Index(index));
                    walk(item, path, out);
                    path.pop();
                }
            }
        }
        FormValue::Map(entries) => {
            for (field, child) in entries {
                path.push(PathKey::Field(field.clone()));
                walk(child, path, out);
                path.pop();
            }
        }
    }
}

/// Rebuild a value tree from flattened entries. Inverse of [`flatten`] on
/// trees with text leaves and no empty containers.
pub fn reconstruct(flat: &BTreeMap<String, FlatValue>) -> Result<FormValue, ResolveError> {
    // Decode every name first and insert in path order. Lexicographic name
    // order would put `a[10]` before `a[2]` and break dense index ingestion.
    let mut entries: Vec<(Vec<PathKey>, &str, &FlatValue)> = Vec::with_capacity(flat.len());
    for (name, value) in flat {
        entries.push((decode(name)?, name, value));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut root = BTreeMap::new();
    for (path, name, value) in entries {
        let leaf = match value {
            FlatValue::One(text) => FormValue::Text(text.clone()),
            FlatValue::Many(texts) => {
                FormValue::List(texts.iter().cloned().map(FormValue::Text).collect())
            }
        };
        insert_root(&mut root, name, &path, leaf)?;
    }
    Ok(FormValue::Map(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(
        root: &mut BTreeMap<String, FormValue>,
        name: &str,
        value: &str,
    ) -> Result<(), ResolveError> {
        let path = decode(name).unwrap();
        insert_root(root, name, &path, FormValue::text(value))
    }

    #[test]
    fn builds_nested_objects_and_arrays() {
        let mut root = BTreeMap::new();
        insert(&mut root, "items[0].name", "socks").unwrap();
        insert(&mut root, "items[0].qty", "2").unwrap();
        insert(&mut root, "items[1].name", "hat").unwrap();
        insert(&mut root, "title", "order").unwrap();

        let tree = FormValue::Map(root);
        assert_eq!(
            tree.at(&decode("items[1].name").unwrap()),
            Some(&FormValue::text("hat"))
        );
        assert_eq!(tree.at(&decode("title").unwrap()), Some(&FormValue::text("order")));
    }

    #[test]
    fn repeated_key_accumulates_in_submission_order() {
        let mut root = BTreeMap::new();
        insert(&mut root, "tags", "red").unwrap();
        insert(&mut root, "tags", "green").unwrap();
        insert(&mut root, "tags", "blue").unwrap();

        assert_eq!(
            root.get("tags"),
            Some(&FormValue::List(vec![
                FormValue::text("red"),
                FormValue::text("green"),
                FormValue::text("blue"),
            ]))
        );
    }

    #[test]
    fn object_vs_array_prefix_is_a_hard_conflict() {
        let mut root = BTreeMap::new();
        insert(&mut root, "a.b", "x").unwrap();
        let err = insert(&mut root, "a[0]", "y").unwrap_err();
        assert!(matches!(err, ResolveError::ShapeConflict { .. }));

        let mut root = BTreeMap::new();
        insert(&mut root, "a[0]", "x").unwrap();
        let err = insert(&mut root, "a.b", "y").unwrap_err();
        assert!(matches!(err, ResolveError::ShapeConflict { .. }));
    }

    #[test]
    fn descending_below_a_value_is_a_conflict() {
        let mut root = BTreeMap::new();
        insert(&mut root, "a", "x").unwrap();
        let err = insert(&mut root, "a.b", "y").unwrap_err();
        assert!(matches!(err, ResolveError::ShapeConflict { .. }));
    }

    #[test]
    fn sparse_indices_are_rejected() {
        let mut root = BTreeMap::new();
        let err = insert(&mut root, "a[1]", "x").unwrap_err();
        assert!(matches!(err, ResolveError::ShapeConflict { .. }));
    }

    #[test]
    fn root_index_is_rejected() {
        let mut root = BTreeMap::new();
        let err = insert(&mut root, "[0]", "x").unwrap_err();
        assert!(matches!(err, ResolveError::ShapeConflict { .. }));
    }

    #[test]
    fn flatten_collapses_text_lists() {
        let mut root = BTreeMap::new();
        insert(&mut root, "tags", "red").unwrap();
        insert(&mut root, "tags", "green").unwrap();
        insert(&mut root, "items[0].name", "socks").unwrap();
        let flat = flatten(&FormValue::Map(root));

        assert_eq!(
            flat.get("tags"),
            Some(&FlatValue::Many(vec!["red".into(), "green".into()]))
        );
        assert_eq!(
            flat.get("items[0].name"),
            Some(&FlatValue::One("socks".into()))
        );
    }

    #[test]
    fn flatten_skips_file_leaves() {
        let mut root = BTreeMap::new();
        root.insert(
            "avatar".to_string(),
            FormValue::File(FileUpload {
                name: "me.png".into(),
                content_type: Some("image/png".into()),
                size: 1024,
            }),
        );
        root.insert("name".to_string(), FormValue::text("ada"));
        let flat = flatten(&FormValue::Map(root));
        assert_eq!(flat.len(), 1);
        assert!(flat.contains_key("name"));
    }

    #[test]
    fn reconstruct_inverts_flatten_past_ten_indices() {
        // Eleven entries force the `a[10]` vs `a[2]` lexicographic trap.
        let mut root = BTreeMap::new();
        for index in 0..11 {
            insert(&mut root, &format!("rows[{index}].v"), &index.to_string()).unwrap();
        }
        let tree = FormValue::Map(root);
        assert_eq!(reconstruct(&flatten(&tree)).unwrap(), tree);
    }

    #[test]
    fn json_rendering_is_untagged() {
        let mut root = BTreeMap::new();
        insert(&mut root, "user.name", "ada").unwrap();
        insert(&mut root, "tags", "a").unwrap();
        insert(&mut root, "tags", "b").unwrap();
        let json = serde_json::to_value(FormValue::Map(root)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user": {"name": "ada"}, "tags": ["a", "b"]})
        );
    }
}
