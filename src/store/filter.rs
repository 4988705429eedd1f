//! Filter matching and update application for the shipped stores.
//!
//! Filters and update instructions are opaque payloads everywhere else
//! in the crate; only a concrete store interprets them. The dialect is
//! deliberately small: filters match by (dotted-path) field equality,
//! updates are `$set`, `$unset`, or a bare replacement document.

use crate::core::{MigrateError, Result};
use serde_json::{Map, Value};

/// Resolve a dotted path (`"address.city"`) against a document.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Assign a dotted path, creating intermediate objects as needed.
/// Fails when a path segment runs through a non-object value.
fn set_path(doc: &mut Map<String, Value>, path: &str, value: Value) -> Result<()> {
    let mut segments = path.split('.').peekable();
    let mut current = doc;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return Ok(());
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = entry.as_object_mut().ok_or_else(|| {
            MigrateError::InvalidUpdate(format!(
                "cannot set '{path}': '{segment}' is not an object"
            ))
        })?;
    }
    Ok(())
}

fn unset_path(doc: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(child) = doc.get_mut(head).and_then(Value::as_object_mut) {
                unset_path(child, rest);
            }
        }
    }
}

/// True when every filter field equals the corresponding document
/// field. An empty filter matches every document; a non-object filter
/// matches none.
pub fn matches_filter(doc: &Value, filter: &Value) -> bool {
    let Some(conditions) = filter.as_object() else {
        return false;
    };
    conditions
        .iter()
        .all(|(path, expected)| get_path(doc, path) == Some(expected))
}

/// Apply one update instruction to a document in place.
///
/// Operator form: every top-level key starts with `$` (`$set`,
/// `$unset`). Replacement form: no `$` keys at all; the document body
/// is replaced wholesale, keeping its `_id`. Mixing the two forms is
/// rejected.
pub fn apply_update(doc: &mut Value, update: &Value) -> Result<()> {
    let instruction = update
        .as_object()
        .ok_or_else(|| MigrateError::InvalidUpdate("instruction must be an object".into()))?;

    let operator_count = instruction.keys().filter(|k| k.starts_with('$')).count();
    if operator_count == 0 {
        return replace_body(doc, instruction);
    }
    if operator_count != instruction.len() {
        return Err(MigrateError::InvalidUpdate(
            "cannot mix $ operators with plain fields".into(),
        ));
    }

    let target = doc
        .as_object_mut()
        .ok_or_else(|| MigrateError::InvalidUpdate("target is not an object".into()))?;

    for (operator, argument) in instruction {
        let fields = argument.as_object().ok_or_else(|| {
            MigrateError::InvalidUpdate(format!("{operator} takes an object argument"))
        })?;
        match operator.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(target, path, value.clone())?;
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    unset_path(target, path);
                }
            }
            other => {
                return Err(MigrateError::InvalidUpdate(format!(
                    "unsupported operator '{other}'"
                )));
            }
        }
    }
    Ok(())
}

fn replace_body(doc: &mut Value, replacement: &Map<String, Value>) -> Result<()> {
    let id = doc.get("_id").cloned();
    let mut body = replacement.clone();
    if let Some(id) = id {
        body.insert("_id".to_string(), id);
    }
    *doc = Value::Object(body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches_filter(&json!({"a": 1}), &json!({})));
    }

    #[test]
    fn equality_and_dotted_paths() {
        let doc = json!({"status": "old", "address": {"city": "Riga"}});
        assert!(matches_filter(&doc, &json!({"status": "old"})));
        assert!(matches_filter(&doc, &json!({"address.city": "Riga"})));
        assert!(!matches_filter(&doc, &json!({"status": "new"})));
        assert!(!matches_filter(&doc, &json!({"missing": 1})));
    }

    #[test]
    fn set_adds_and_overwrites() {
        let mut doc = json!({"_id": "a", "status": "old"});
        apply_update(&mut doc, &json!({"$set": {"status": "new", "updatedAt": "t"}})).unwrap();
        assert_eq!(doc, json!({"_id": "a", "status": "new", "updatedAt": "t"}));
    }

    #[test]
    fn set_dotted_path_creates_intermediates() {
        let mut doc = json!({"_id": "a"});
        apply_update(&mut doc, &json!({"$set": {"address.city": "Riga"}})).unwrap();
        assert_eq!(doc, json!({"_id": "a", "address": {"city": "Riga"}}));
    }

    #[test]
    fn unset_removes_fields() {
        let mut doc = json!({"_id": "a", "status": "old", "n": 1});
        apply_update(&mut doc, &json!({"$unset": {"n": ""}})).unwrap();
        assert_eq!(doc, json!({"_id": "a", "status": "old"}));
    }

    #[test]
    fn replacement_preserves_id() {
        let mut doc = json!({"_id": "a", "status": "old"});
        apply_update(&mut doc, &json!({"name": "fresh"})).unwrap();
        assert_eq!(doc, json!({"_id": "a", "name": "fresh"}));
    }

    #[test]
    fn mixed_forms_are_rejected() {
        let mut doc = json!({"_id": "a"});
        let err = apply_update(&mut doc, &json!({"$set": {"x": 1}, "y": 2})).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidUpdate(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let mut doc = json!({"_id": "a", "n": 1});
        let err = apply_update(&mut doc, &json!({"$inc": {"n": 1}})).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidUpdate(_)));
    }
}
