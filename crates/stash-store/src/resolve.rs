//! Read-only and mutation-targeting resolution of paths against documents.

use serde_json::Value;

use crate::error::StoreError;
use crate::path::{Path, Segment};

/// Resolves `path` against `root`, returning the addressed subtree.
///
/// Resolution never mutates the document. The empty path resolves to the
/// root itself.
///
/// # Errors
///
/// Returns [`StoreError::PathTypeMismatch`] when a segment is applied to a
/// value of the wrong kind and [`StoreError::PathNotFound`] for absent
/// members or out-of-range indices.
pub fn resolve<'a>(root: &'a Value, path: &Path) -> Result<&'a Value, StoreError> {
    let mut current = root;
    for (depth, segment) in path.segments().iter().enumerate() {
        current = step(current, segment, || traversed(path, depth + 1))?;
    }
    Ok(current)
}

/// Resolves the parent container of `path` for a mutation, returning the
/// container and the final segment addressing the slot to replace.
///
/// # Errors
///
/// Fails like [`resolve`] for the parent portion of the path. The root path
/// has no parent; callers handle whole-root replacement separately and this
/// function returns [`StoreError::PathNotFound`] for it.
pub fn resolve_parent_mut<'a>(
    root: &'a mut Value,
    path: &'a Path,
) -> Result<(&'a mut Value, &'a Segment), StoreError> {
    let Some((parent_segments, last)) = path.split_last() else {
        return Err(StoreError::path_not_found(
            path.to_string(),
            "the root has no parent container",
        ));
    };

    let mut current = root;
    for (depth, segment) in parent_segments.iter().enumerate() {
        current = step_mut(current, segment, || traversed(path, depth + 1))?;
    }
    Ok((current, last))
}

/// Replaces the slot addressed by `segment` within `parent`.
///
/// Field assignment on an object inserts or replaces the member, mirroring
/// JSON object assignment; index assignment requires the index to already be
/// in range.
///
/// # Errors
///
/// Returns [`StoreError::PathTypeMismatch`] when the container kind does not
/// match the segment and [`StoreError::PathNotFound`] for out-of-range
/// indices.
pub(crate) fn assign(
    parent: &mut Value,
    segment: &Segment,
    replacement: Value,
    path: &Path,
) -> Result<(), StoreError> {
    match (segment, parent) {
        (Segment::Field(name), Value::Object(members)) => {
            members.insert(name.clone(), replacement);
            Ok(())
        }
        (Segment::Index(index), Value::Array(elements)) => {
            let slot = elements.get_mut(*index).ok_or_else(|| {
                StoreError::path_not_found(
                    path.to_string(),
                    format!("index {index} out of range"),
                )
            })?;
            *slot = replacement;
            Ok(())
        }
        (Segment::Field(_), other) => Err(StoreError::type_mismatch(
            path.to_string(),
            "object",
            kind(other),
        )),
        (Segment::Index(_), other) => Err(StoreError::type_mismatch(
            path.to_string(),
            "array",
            kind(other),
        )),
    }
}

/// Labels for `range`: object field names in insertion order, or array
/// indices rendered as decimal strings.
pub(crate) fn range_labels(value: &Value, path: &Path) -> Result<Vec<String>, StoreError> {
    match value {
        Value::Object(members) => Ok(members.keys().cloned().collect()),
        Value::Array(elements) => Ok((0..elements.len()).map(|index| index.to_string()).collect()),
        _ => Err(StoreError::not_iterable(path.to_string())),
    }
}

fn step<'a>(
    value: &'a Value,
    segment: &Segment,
    at: impl Fn() -> String,
) -> Result<&'a Value, StoreError> {
    match (segment, value) {
        (Segment::Field(name), Value::Object(members)) => members
            .get(name)
            .ok_or_else(|| StoreError::path_not_found(at(), format!("no member '{name}'"))),
        (Segment::Index(index), Value::Array(elements)) => elements
            .get(*index)
            .ok_or_else(|| StoreError::path_not_found(at(), format!("index {index} out of range"))),
        (Segment::Field(_), other) => Err(StoreError::type_mismatch(at(), "object", kind(other))),
        (Segment::Index(_), other) => Err(StoreError::type_mismatch(at(), "array", kind(other))),
    }
}

fn step_mut<'a>(
    value: &'a mut Value,
    segment: &Segment,
    at: impl Fn() -> String,
) -> Result<&'a mut Value, StoreError> {
    match (segment, value) {
        (Segment::Field(name), Value::Object(members)) => members
            .get_mut(name)
            .ok_or_else(|| StoreError::path_not_found(at(), format!("no member '{name}'"))),
        (Segment::Index(index), Value::Array(elements)) => {
            let length = elements.len();
            elements.get_mut(*index).ok_or_else(|| {
                StoreError::path_not_found(
                    at(),
                    format!("index {index} out of range for length {length}"),
                )
            })
        }
        (Segment::Field(_), other) => Err(StoreError::type_mismatch(at(), "object", kind(other))),
        (Segment::Index(_), other) => Err(StoreError::type_mismatch(at(), "array", kind(other))),
    }
}

/// Renders the prefix of `path` up to `depth` segments, for error context.
fn traversed(path: &Path, depth: usize) -> String {
    let mut rendered = String::new();
    for (position, segment) in path.segments().iter().take(depth).enumerate() {
        if position > 0 && matches!(segment, Segment::Field(_)) {
            rendered.push('.');
        }
        rendered.push_str(&segment.to_string());
    }
    rendered
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({"a": {"b": [10, 20, 30]}, "s": "hello"})
    }

    fn path(text: &str) -> Path {
        Path::parse(text).expect("valid path")
    }

    #[test]
    fn empty_path_resolves_to_root() {
        let root = document();
        let resolved = resolve(&root, &Path::root()).expect("resolve root");
        assert_eq!(resolved, &root);
    }

    #[test]
    fn bracket_and_dotted_forms_resolve_identically() {
        let root = document();
        let bracket = resolve(&root, &path("a.b[1]")).expect("bracket");
        let dotted = resolve(&root, &path("a.b.1")).expect("dotted");
        assert_eq!(bracket, &json!(20));
        assert_eq!(bracket, dotted);
    }

    #[test]
    fn field_on_array_is_type_mismatch() {
        let root = document();
        let error = resolve(&root, &path("a.b.x")).expect_err("mismatch");
        assert!(matches!(error, StoreError::PathTypeMismatch { .. }), "{error}");
    }

    #[test]
    fn index_on_object_is_type_mismatch() {
        let root = document();
        let error = resolve(&root, &path("a[0]")).expect_err("mismatch");
        assert!(matches!(error, StoreError::PathTypeMismatch { .. }), "{error}");
    }

    #[test]
    fn out_of_range_index_is_not_found() {
        let root = document();
        let error = resolve(&root, &path("a.b[5]")).expect_err("out of range");
        assert!(matches!(error, StoreError::PathNotFound { .. }), "{error}");
    }

    #[test]
    fn absent_member_is_not_found() {
        let root = document();
        let error = resolve(&root, &path("a.missing")).expect_err("absent");
        assert!(matches!(error, StoreError::PathNotFound { .. }), "{error}");
    }

    #[test]
    fn index_into_scalar_is_type_mismatch() {
        let root = document();
        let error = resolve(&root, &path("s[0]")).expect_err("scalar");
        assert!(matches!(error, StoreError::PathTypeMismatch { .. }), "{error}");
    }

    #[test]
    fn resolve_parent_targets_final_slot() {
        let mut root = document();
        let target = path("a.b[0]");
        let (parent, last) = resolve_parent_mut(&mut root, &target).expect("parent");
        assert_eq!(parent, &json!([10, 20, 30]));
        assert_eq!(last, &Segment::Index(0));
    }

    #[test]
    fn assign_replaces_array_slot() {
        let mut root = document();
        let target = path("a.b[0]");
        let (parent, last) = resolve_parent_mut(&mut root, &target).expect("parent");
        assign(parent, last, json!(99), &target).expect("assign");
        assert_eq!(root, json!({"a": {"b": [99, 20, 30]}, "s": "hello"}));
    }

    #[test]
    fn assign_upserts_object_member() {
        let mut root = document();
        let target = path("a.fresh");
        let (parent, last) = resolve_parent_mut(&mut root, &target).expect("parent");
        assign(parent, last, json!(true), &target).expect("assign");
        assert_eq!(
            resolve(&root, &path("a.fresh")).expect("resolve new member"),
            &json!(true)
        );
    }

    #[test]
    fn assign_rejects_out_of_range_index() {
        let mut root = document();
        let target = path("a.b[9]");
        let (parent, last) = resolve_parent_mut(&mut root, &target).expect("parent");
        let error = assign(parent, last, json!(0), &target).expect_err("out of range");
        assert!(matches!(error, StoreError::PathNotFound { .. }), "{error}");
    }

    #[test]
    fn range_preserves_object_insertion_order() {
        let root = json!({"x": 1, "y": 2});
        let labels = range_labels(&root, &Path::root()).expect("labels");
        assert_eq!(labels, vec!["x", "y"]);
    }

    #[test]
    fn range_renders_array_indices() {
        let root = document();
        let value = resolve(&root, &path("a.b")).expect("array");
        let labels = range_labels(value, &path("a.b")).expect("labels");
        assert_eq!(labels, vec!["0", "1", "2"]);
    }

    #[test]
    fn range_rejects_scalars() {
        let root = document();
        let value = resolve(&root, &path("s")).expect("scalar");
        let error = range_labels(value, &path("s")).expect_err("not iterable");
        assert!(matches!(error, StoreError::RangeNotIterable { .. }), "{error}");
    }
}
