//! Query-document filtering against an endpoint allow-list.
//!
//! The client's `query` parameter is one JSON document. It is flattened
//! into ordered dot-path pairs, the pairs are filtered against the
//! endpoint's allowed fields, and the survivors are rebuilt into a nested
//! document. Arrays and operator expressions (objects carrying a
//! `$`-prefixed key) travel as atomic leaves, so `{"age": {"$gte": 18}}`
//! filters under the `age` path with its operator expression untouched.

use serde_json::{Map, Value};

use crate::{Error, Limits};

/// How one value behaves during flattening.
enum Node<'a> {
    /// Plain nesting: descend and extend the dot-path.
    Nested(&'a Map<String, Value>),
    /// Atomic value: arrays, scalars, and operator expressions.
    Leaf(&'a Value),
}

fn classify(value: &Value) -> Node<'_> {
    match value {
        Value::Object(map) if !map.keys().any(|key| key.starts_with('$')) => Node::Nested(map),
        other => Node::Leaf(other),
    }
}

/// Parse a raw `query` parameter and filter it down to the allowed fields.
///
/// # Errors
/// Returns `Error::InvalidQuery` when `raw` is not a JSON object, nesting
/// exceeds the configured depth, or surviving paths collide irreconcilably.
pub(crate) fn filter_document(
    raw: &str,
    allowed: &[String],
    limits: &Limits,
) -> Result<Map<String, Value>, Error> {
    let parsed: Value =
        serde_json::from_str(raw).map_err(|err| Error::InvalidQuery(err.to_string()))?;
    let Value::Object(document) = parsed else {
        return Err(Error::InvalidQuery("query must be a JSON object".to_owned()));
    };
    let flat = flatten(&document, limits)?;
    let kept = retain_allowed(flat, allowed);
    unflatten(kept)
}

/// Flatten a document into ordered `(dot-path, value)` pairs.
fn flatten(document: &Map<String, Value>, limits: &Limits) -> Result<Vec<(String, Value)>, Error> {
    let mut pairs = Vec::new();
    flatten_into(document, None, 0, limits.max_query_depth, &mut pairs)?;
    Ok(pairs)
}

fn flatten_into(
    map: &Map<String, Value>,
    prefix: Option<&str>,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<(String, Value)>,
) -> Result<(), Error> {
    if depth > max_depth {
        return Err(Error::InvalidQuery(format!(
            "query document exceeds maximum depth of {max_depth}"
        )));
    }
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match classify(value) {
            Node::Nested(inner) => flatten_into(inner, Some(&path), depth + 1, max_depth, out)?,
            Node::Leaf(leaf) => out.push((path, leaf.clone())),
        }
    }
    Ok(())
}

/// Keep pairs whose path is an allowed field or a dotted descendant of one.
/// Matching is exact on segment boundaries: allowing `user` admits `user`
/// and `user.name`, never `username`.
fn retain_allowed(pairs: Vec<(String, Value)>, allowed: &[String]) -> Vec<(String, Value)> {
    pairs
        .into_iter()
        .filter(|(path, _)| {
            allowed.iter().any(|field| {
                let prefix = format!("{field}.");
                path == field || path.starts_with(&prefix)
            })
        })
        .collect()
}

/// Rebuild a nested document from dot-path pairs, in pair order.
fn unflatten(pairs: Vec<(String, Value)>) -> Result<Map<String, Value>, Error> {
    let mut root = Map::new();
    for (path, value) in pairs {
        insert_path(&mut root, &path, value)?;
    }
    Ok(root)
}

/// Walk `path` into `root`, materializing objects along the way; the final
/// segment assigns, overwriting an earlier value.
///
/// Conflicting intermediates follow the values already in place: an object
/// is entered, a falsy scalar gives way to a fresh object, an array
/// swallows the write, and a truthy scalar fails the whole document.
fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) -> Result<(), Error> {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_owned(), value);
            return Ok(());
        }
        let slot = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if is_falsy(slot) {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(inner) => inner,
            Value::Array(_) => return Ok(()),
            _ => {
                return Err(Error::InvalidQuery(format!(
                    "path {path} collides with a non-object value"
                )));
            }
        };
    }
    Ok(())
}

/// Falsy in the document's source semantics: null, false, zero, "".
#[allow(clippy::float_cmp)] // exact zero test, not an epsilon comparison
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn allowed(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| (*f).to_owned()).collect()
    }

    fn filter(raw: &str, fields: &[&str]) -> Result<Map<String, Value>, Error> {
        filter_document(raw, &allowed(fields), &Limits::default())
    }

    #[test]
    fn keeps_allowed_and_drops_the_rest() {
        let out = filter(
            r#"{"status":"active","secret":"x","owner":{"id":7,"role":"admin"}}"#,
            &["status", "owner.id"],
        )
        .unwrap();
        assert_eq!(
            Value::Object(out),
            json!({"status": "active", "owner": {"id": 7}})
        );
    }

    #[test]
    fn matching_is_exact_segment_not_substring() {
        let out = filter(
            r#"{"user":"u1","username":"u2","user_name":"u3"}"#,
            &["user"],
        )
        .unwrap();
        assert_eq!(Value::Object(out), json!({"user": "u1"}));
    }

    #[test]
    fn dotted_descendants_of_allowed_fields_pass() {
        let out = filter(r#"{"user":{"name":"ada","role":"admin"}}"#, &["user.name"]).unwrap();
        assert_eq!(Value::Object(out), json!({"user": {"name": "ada"}}));
    }

    #[test]
    fn operator_expressions_stay_atomic() {
        let out = filter(r#"{"age":{"$gte":18,"$lt":65}}"#, &["age"]).unwrap();
        assert_eq!(Value::Object(out), json!({"age": {"$gte": 18, "$lt": 65}}));
    }

    #[test]
    fn arrays_stay_atomic() {
        let out = filter(r#"{"tags":{"$in":["a","b"]},"ids":[1,2]}"#, &["tags", "ids"]).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({"tags": {"$in": ["a", "b"]}, "ids": [1, 2]})
        );
    }

    #[test]
    fn filtering_is_idempotent() {
        let fields = ["status", "owner.id", "age"];
        let first = filter(
            r#"{"status":"active","owner":{"id":7,"role":"x"},"age":{"$gte":18}}"#,
            &fields,
        )
        .unwrap();
        let second = filter(&serde_json::to_string(&first).unwrap(), &fields).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_nested_objects_vanish() {
        let out = filter(r#"{"meta":{},"status":"open"}"#, &["meta", "status"]).unwrap();
        assert_eq!(Value::Object(out), json!({"status": "open"}));
    }

    #[test]
    fn literal_dot_keys_rebuild_as_nesting() {
        let out = filter(r#"{"owner.id":7}"#, &["owner"]).unwrap();
        assert_eq!(Value::Object(out), json!({"owner": {"id": 7}}));
    }

    #[test]
    fn falsy_intermediate_gives_way_to_nesting() {
        let out = filter(r#"{"a":0,"a.b":1}"#, &["a"]).unwrap();
        assert_eq!(Value::Object(out), json!({"a": {"b": 1}}));
    }

    #[test]
    fn truthy_scalar_intermediate_fails_the_document() {
        let err = filter(r#"{"a":5,"a.b":1}"#, &["a"]).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn array_intermediate_swallows_the_write() {
        let out = filter(r#"{"a":[1],"a.b":2}"#, &["a"]).unwrap();
        assert_eq!(Value::Object(out), json!({"a": [1]}));
    }

    #[test]
    fn later_path_merges_into_operator_object() {
        let out = filter(r#"{"a":{"$gte":5},"a.b":1}"#, &["a"]).unwrap();
        assert_eq!(Value::Object(out), json!({"a": {"$gte": 5, "b": 1}}));
    }

    #[test]
    fn final_segment_overwrites_earlier_value() {
        let out = filter(r#"{"a.b":1,"a":5}"#, &["a"]).unwrap();
        assert_eq!(Value::Object(out), json!({"a": 5}));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = filter("{not json", &["a"]).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn non_object_roots_are_rejected() {
        for raw in ["42", "\"text\"", "[1,2]", "null", "true"] {
            let err = filter(raw, &["a"]).unwrap_err();
            assert!(matches!(err, Error::InvalidQuery(_)), "root {raw} passed");
        }
    }

    #[test]
    fn nesting_beyond_the_depth_cap_is_rejected() {
        let limits = Limits::new().with_max_query_depth(2);
        let raw = r#"{"a":{"b":{"c":{"d":1}}}}"#;
        let err = filter_document(raw, &allowed(&["a"]), &limits).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn everything_filtered_leaves_an_empty_document() {
        let out = filter(r#"{"secret":"x"}"#, &["status"]).unwrap();
        assert!(out.is_empty());
    }
}
