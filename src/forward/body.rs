use crate::flatten::{FlatValue, FlattenEngine};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Field holding the raw message body text
pub const BODY_FIELD: &str = "Body";

/// Record fields written by the forwarders; a body prefix may not reuse them
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "MessageId",
    "ReceiptHandle",
    BODY_FIELD,
    "Md5OfBody",
    "Timestamp",
    "MessageAttributes",
    "ContentType",
    "CorrelationId",
    "Label",
    "TimeToLive",
    "ApplicationProperties",
];

/// A message body as received, plus its parsed JSON when it parsed cleanly
#[derive(Debug, Clone, PartialEq)]
pub struct BodyContent {
    pub raw: String,
    pub json: Option<Value>,
}

/// Parse a message body. Any parse failure (malformed, empty, non-UTF-8)
/// leaves `json` unset; no partial parse is attempted.
pub fn parse_body(bytes: &[u8]) -> BodyContent {
    let json = match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(error = %err, "message body is not valid JSON, storing as string");
            None
        }
    };

    BodyContent {
        raw: String::from_utf8_lossy(bytes).into_owned(),
        json,
    }
}

impl BodyContent {
    pub fn is_json(&self) -> bool {
        self.json.is_some()
    }

    /// Append the body fields to an outbound record.
    ///
    /// The raw text always goes under `Body`; a parsed body is flattened
    /// below `prefix` and merged after it.
    pub fn merge_into<T, F>(
        &self,
        record: &mut IndexMap<String, T>,
        engine: &FlattenEngine,
        prefix: &str,
        mut convert: F,
    ) where
        F: FnMut(FlatValue) -> T,
    {
        record.insert(
            BODY_FIELD.to_string(),
            convert(FlatValue::String(self.raw.clone())),
        );

        if let Some(json) = &self.json {
            record.extend(engine.flatten_with(json, prefix, convert));
        }
    }
}
