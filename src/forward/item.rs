//! Store-native attribute models and the mapping from flattened leaves

use crate::flatten::FlatValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A DynamoDB attribute value, serialized in DynamoDB JSON form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),

    /// Number as its decimal text
    N(String),

    #[serde(rename = "BOOL")]
    Bool(bool),

    #[serde(rename = "NULL")]
    Null(bool),
}

impl AttributeValue {
    pub fn s(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }
}

impl From<FlatValue> for AttributeValue {
    fn from(value: FlatValue) -> Self {
        match value {
            FlatValue::String(s) | FlatValue::Serialized(s) => AttributeValue::S(s),
            FlatValue::Number(n) => AttributeValue::N(n.to_string()),
            FlatValue::Bool(b) => AttributeValue::Bool(b),
            FlatValue::Null => AttributeValue::Null(true),
        }
    }
}

/// A table item: attribute name to value, in insertion order
pub type Item = IndexMap<String, AttributeValue>;

/// A container document
pub type Document = Map<String, Value>;

/// Cosmos documents are plain JSON; serialized subtrees stay strings
pub fn document_value(value: FlatValue) -> Value {
    match value {
        FlatValue::String(s) | FlatValue::Serialized(s) => Value::String(s),
        FlatValue::Number(n) => Value::Number(n),
        FlatValue::Bool(b) => Value::Bool(b),
        FlatValue::Null => Value::Null,
    }
}
