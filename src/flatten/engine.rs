use crate::flatten::types::{FlatMap, FlatValue, FlattenConfig};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

/// The core flattener that turns nested JSON into dotted-path attributes
#[derive(Debug, Clone, Default)]
pub struct FlattenEngine {
    config: FlattenConfig,
}

/// Flatten a JSON value below `prefix` with the default configuration
pub fn flatten(value: &Value, prefix: &str) -> FlatMap {
    FlattenEngine::default().flatten(value, prefix)
}

impl FlattenEngine {
    pub fn new(config: FlattenConfig) -> Self {
        FlattenEngine { config }
    }

    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }

    /// Flatten a JSON value into an ordered map of path to leaf value
    pub fn flatten(&self, value: &Value, prefix: &str) -> FlatMap {
        self.flatten_with(value, prefix, |leaf| leaf)
    }

    /// Flatten a JSON value, converting every leaf with `convert`
    ///
    /// Lets a store build its native attribute type in the same pass.
    pub fn flatten_with<T, F>(
        &self,
        value: &Value,
        prefix: &str,
        mut convert: F,
    ) -> IndexMap<String, T>
    where
        F: FnMut(FlatValue) -> T,
    {
        let mut out = IndexMap::new();
        self.walk(value, prefix.to_string(), 0, &mut out, &mut convert);
        out
    }

    /// Depth-first walk; `depth` counts object levels below the root.
    ///
    /// Keys containing the separator can make two leaves share a path;
    /// the first leaf is kept and the later one is dropped with a warning.
    fn walk<T, F>(
        &self,
        value: &Value,
        path: String,
        depth: usize,
        out: &mut IndexMap<String, T>,
        convert: &mut F,
    ) where
        F: FnMut(FlatValue) -> T,
    {
        let leaf = match value {
            Value::Object(obj) if obj.is_empty() || depth < self.config.max_depth => {
                for (key, child) in obj.iter() {
                    let child_path = format!("{}{}{}", path, self.config.separator, key);
                    self.walk(child, child_path, depth + 1, out, convert);
                }
                return;
            }
            // Too deep to descend: keep the subtree whole
            Value::Object(_) => FlatValue::Serialized(value.to_string()),
            Value::Array(_) => FlatValue::Serialized(value.to_string()),
            Value::String(s) => FlatValue::String(s.clone()),
            Value::Number(n) => FlatValue::Number(n.clone()),
            Value::Bool(b) => FlatValue::Bool(*b),
            Value::Null => FlatValue::Null,
        };

        if out.contains_key(&path) {
            warn!(path = %path, "duplicate flattened path, keeping first value");
            return;
        }
        out.insert(path, convert(leaf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Number};
    use std::collections::HashSet;

    fn num(n: u64) -> FlatValue {
        FlatValue::Number(Number::from(n))
    }

    #[test]
    fn test_scalar_root() {
        let flat = flatten(&json!("x"), "P");

        assert_eq!(flat.len(), 1);
        assert_eq!(flat["P"], FlatValue::String("x".to_string()));

        let flat = flatten(&json!(7), "P");
        assert_eq!(flat["P"], num(7));

        let flat = flatten(&Value::Null, "P");
        assert!(flat["P"].is_null());
    }

    #[test]
    fn test_empty_object_has_no_leaves() {
        let flat = flatten(&json!({}), "P");
        assert!(flat.is_empty());

        let flat = flatten(&json!({"a": {}, "b": 1}), "P");
        assert_eq!(flat.len(), 1);
        assert!(!flat.contains_key("P.a"));
    }

    #[test]
    fn test_empty_array_is_one_leaf() {
        let flat = flatten(&json!([]), "P");

        assert_eq!(flat.len(), 1);
        assert_eq!(flat["P"], FlatValue::Serialized("[]".to_string()));
        assert_eq!(flat["P"].as_str(), Some("[]"));
    }

    #[test]
    fn test_nested_object() {
        let flat = flatten(&json!({"a": {"b": 1}}), "Root");

        assert_eq!(flat.len(), 1);
        assert_eq!(flat["Root.a.b"], num(1));
    }

    #[test]
    fn test_arrays_are_opaque() {
        let flat = flatten(&json!({"a": [1, 2, {"c": 3}]}), "Root");

        assert_eq!(flat.len(), 1);
        assert_eq!(
            flat["Root.a"],
            FlatValue::Serialized(r#"[1,2,{"c":3}]"#.to_string())
        );
        assert!(!flat.contains_key("Root.a.c"));
    }

    #[test]
    fn test_mixed_document() {
        let input = json!({
            "order": {
                "id": 42,
                "items": ["x", "y"],
                "paid": true,
                "note": null
            }
        });

        let flat = flatten(&input, "BodyJson");

        assert_eq!(flat.len(), 4);
        assert_eq!(flat["BodyJson.order.id"], num(42));
        assert_eq!(
            flat["BodyJson.order.items"],
            FlatValue::Serialized(r#"["x","y"]"#.to_string())
        );
        assert_eq!(flat["BodyJson.order.paid"], FlatValue::Bool(true));
        assert_eq!(flat["BodyJson.order.note"], FlatValue::Null);
    }

    #[test]
    fn test_paths_follow_source_key_order() {
        let input: Value =
            serde_json::from_str(r#"{"z": 1, "a": {"y": 2, "b": 3}, "m": 4}"#).unwrap();
        let flat = flatten(&input, "R");

        let paths: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["R.z", "R.a.y", "R.a.b", "R.m"]);
    }

    #[test]
    fn test_leaf_count_and_unique_paths() {
        let input = json!({
            "a": 1,
            "b": {"c": "two", "d": {}, "e": [[1, 2], {"f": [3]}]},
            "g": {"h": {"i": false, "j": null}},
            "k": []
        });

        let flat = flatten(&input, "P");

        // a, b.c, b.e, g.h.i, g.h.j, k
        assert_eq!(flat.len(), 6);
        let unique: HashSet<&String> = flat.keys().collect();
        assert_eq!(unique.len(), flat.len());
    }

    #[test]
    fn test_numbers_keep_literal_precision() {
        let input: Value = serde_json::from_str(
            r#"{"big": 123456789012345678901234567890,
                "dec": 0.1000000000000000000001,
                "exp": 1.50}"#,
        )
        .unwrap();

        let flat = flatten(&input, "P");

        let literal = |path: &str| match &flat[path] {
            FlatValue::Number(n) => n.to_string(),
            other => panic!("expected number, got {:?}", other),
        };
        assert_eq!(literal("P.big"), "123456789012345678901234567890");
        assert_eq!(literal("P.dec"), "0.1000000000000000000001");
        assert_eq!(literal("P.exp"), "1.50");
    }

    #[test]
    fn test_depth_limit_serializes_subtree() {
        let engine = FlattenEngine::new(FlattenConfig {
            max_depth: 2,
            ..FlattenConfig::default()
        });

        let flat = engine.flatten(&json!({"a": {"b": {"c": {"d": 1}}, "x": 2}}), "P");

        assert_eq!(flat.len(), 2);
        assert_eq!(
            flat["P.a.b"],
            FlatValue::Serialized(r#"{"c":{"d":1}}"#.to_string())
        );
        assert_eq!(flat["P.a.x"], num(2));
    }

    #[test]
    fn test_empty_object_at_depth_limit_has_no_leaves() {
        let engine = FlattenEngine::new(FlattenConfig {
            max_depth: 1,
            ..FlattenConfig::default()
        });

        let flat = engine.flatten(&json!({"a": {}, "b": {"c": 1}}), "P");

        assert_eq!(flat.len(), 1);
        assert!(!flat.contains_key("P.a"));
        assert_eq!(flat["P.b"], FlatValue::Serialized(r#"{"c":1}"#.to_string()));
    }

    #[test]
    fn test_colliding_paths_keep_first_leaf() {
        let input: Value = serde_json::from_str(r#"{"a.b": 1, "a": {"b": 2, "c": 3}}"#).unwrap();

        let flat = flatten(&input, "P");

        assert_eq!(flat.len(), 2);
        assert_eq!(flat["P.a.b"], num(1));
        assert_eq!(flat["P.a.c"], num(3));
    }

    #[test]
    fn test_deeply_nested_input_is_bounded() {
        let mut value = json!("leaf");
        for _ in 0..500 {
            value = json!({ "n": value });
        }

        let flat = flatten(&value, "P");

        assert_eq!(flat.len(), 1);
        let (path, leaf) = flat.iter().next().unwrap();
        assert_eq!(path.matches(".n").count(), 64);
        assert!(matches!(leaf, FlatValue::Serialized(_)));
    }

    #[test]
    fn test_flatten_with_converts_leaves() {
        let flat = FlattenEngine::default().flatten_with(
            &json!({"a": "s", "b": [1]}),
            "P",
            |leaf| leaf.to_json(),
        );

        assert_eq!(flat["P.a"], json!("s"));
        assert_eq!(flat["P.b"], json!("[1]"));
    }

    #[test]
    fn test_custom_separator() {
        let engine = FlattenEngine::new(FlattenConfig {
            separator: "/".to_string(),
            ..FlattenConfig::default()
        });

        let flat = engine.flatten(&json!({"a": {"b": true}}), "P");
        assert_eq!(flat["P/a/b"], FlatValue::Bool(true));
    }
}
