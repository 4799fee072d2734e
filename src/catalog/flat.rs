//! Conversion between nested locale trees and flat key paths.

use std::collections::BTreeMap;

use serde_json::{
    Map,
    Value,
};

/// Flat key path → leaf value.
///
/// Leaves keep their JSON type; only string leaves are translatable text.
pub type FlatMap = BTreeMap<String, Value>;

/// Flatten a nested object into separator-joined key paths.
///
/// Scalar leaves (strings, numbers, booleans, `null`) are kept as they are.
/// Array elements use their index as the path segment, so [`unflatten`] can
/// restore them. Empty objects and arrays have no leaves and are dropped.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use auto_i18n::catalog::flat::flatten;
///
/// let json = json!({
///     "common": {
///         "hello": "Hello",
///         "goodbye": "Goodbye"
///     }
/// });
///
/// let flattened = flatten(&json, ".");
/// assert_eq!(flattened.get("common.hello"), Some(&json!("Hello")));
/// assert_eq!(flattened.get("common.goodbye"), Some(&json!("Goodbye")));
/// ```
#[must_use]
pub fn flatten(json: &Value, separator: &str) -> FlatMap {
    let mut result = FlatMap::new();
    flatten_value(json, separator, None, &mut result);
    result
}

/// Walks `json`, inserting every scalar leaf under `prefix` joined with its path.
fn flatten_value(json: &Value, separator: &str, prefix: Option<&str>, result: &mut FlatMap) {
    let join = |segment: &str| {
        prefix.map_or_else(|| segment.to_string(), |p| format!("{p}{separator}{segment}"))
    };

    match json {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_value(value, separator, Some(&join(key)), result);
            }
        }
        Value::Array(arr) => {
            for (index, value) in arr.iter().enumerate() {
                flatten_value(value, separator, Some(&join(&index.to_string())), result);
            }
        }
        leaf => {
            if let Some(key) = prefix {
                result.insert(key.to_string(), leaf.clone());
            }
        }
    }
}

/// Rebuild the nested object described by `flat`.
///
/// When a key path is both a leaf and a parent (`a` and `a.b`), the nested
/// object is kept.
#[must_use]
pub fn unflatten(flat: &FlatMap, separator: &str) -> Value {
    let mut root = Map::new();
    for (key, value) in flat {
        let parts: Vec<&str> = key.split(separator).collect();
        insert_path(&mut root, &parts, value);
    }
    restore_arrays(Value::Object(root))
}

/// Sets `value` at the path `parts`, creating intermediate objects.
fn insert_path(root: &mut Map<String, Value>, parts: &[&str], value: &Value) {
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = root;
    for part in parents {
        let entry = current.entry((*part).to_string()).or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            tracing::debug!(key = %part, "Leaf value replaced by nested keys");
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }

    if current.get(*last).is_some_and(Value::is_object) {
        tracing::debug!(key = %last, "Leaf value shadowed by nested keys");
        return;
    }
    current.insert((*last).to_string(), value.clone());
}

/// Objects keyed exactly `0..n` came from arrays.
fn restore_arrays(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut map: Map<String, Value> =
                map.into_iter().map(|(k, v)| (k, restore_arrays(v))).collect();
            let is_sequence =
                !map.is_empty() && (0..map.len()).all(|i| map.contains_key(&i.to_string()));
            if is_sequence {
                let len = map.len();
                Value::Array((0..len).filter_map(|i| map.remove(&i.to_string())).collect())
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

/// Joins a namespace and a key, leaving the key alone for the unnamed namespace.
#[must_use]
pub fn join_key(namespace: &str, key: &str, separator: &str) -> String {
    if namespace.is_empty() { key.to_string() } else { format!("{namespace}{separator}{key}") }
}
