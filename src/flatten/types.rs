use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// Root prefix used for flattened message bodies
pub const DEFAULT_PREFIX: &str = "BodyJson";

/// A single flattened leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum FlatValue {
    String(String),

    /// Number with the literal text of the source document
    Number(Number),

    Bool(bool),

    Null,

    /// Compact JSON text of a subtree stored as one opaque value.
    /// Arrays always land here; objects only past the depth limit.
    Serialized(String),
}

impl FlatValue {
    /// String content for both `String` and `Serialized` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlatValue::String(s) | FlatValue::Serialized(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FlatValue::Null)
    }

    /// Plain JSON form, with serialized subtrees kept as strings
    pub fn to_json(&self) -> Value {
        match self {
            FlatValue::String(s) | FlatValue::Serialized(s) => Value::String(s.clone()),
            FlatValue::Number(n) => Value::Number(n.clone()),
            FlatValue::Bool(b) => Value::Bool(*b),
            FlatValue::Null => Value::Null,
        }
    }
}

impl Serialize for FlatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlatValue::String(s) | FlatValue::Serialized(s) => serializer.serialize_str(s),
            FlatValue::Number(n) => n.serialize(serializer),
            FlatValue::Bool(b) => serializer.serialize_bool(*b),
            FlatValue::Null => serializer.serialize_unit(),
        }
    }
}

/// Insertion-ordered map from dotted path to leaf value
pub type FlatMap = IndexMap<String, FlatValue>;

/// Configuration for the flattening process
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Object nesting depth below the root at which objects stop being
    /// descended and are stored as serialized JSON instead
    pub max_depth: usize,

    /// Separator placed between path segments
    pub separator: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        FlattenConfig {
            max_depth: 64,
            separator: String::from("."),
        }
    }
}
