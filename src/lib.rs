//! # Ingot - queue message to attribute store forwarding
//!
//! Flattens JSON message bodies into single-level attribute maps and writes
//! them, together with message metadata, to key/attribute stores.
//!
//! ## Modules
//!
//! - **flatten**: Collapse nested JSON into dotted-path attributes
//! - **forward**: SQS and Service Bus forwarders and their stores
//! - **config**: Environment-driven forwarder settings
//!
//! ## Quick Start
//!
//! ```rust
//! use ingot::flatten::{flatten, FlatValue};
//! use serde_json::json;
//!
//! let body = json!({
//!     "order": {"id": 42, "items": ["x", "y"], "paid": true}
//! });
//!
//! let flat = flatten(&body, "BodyJson");
//!
//! assert_eq!(flat["BodyJson.order.paid"], FlatValue::Bool(true));
//! // Arrays are kept whole as JSON text
//! assert_eq!(flat["BodyJson.order.items"].as_str(), Some(r#"["x","y"]"#));
//! ```

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::io::{BufRead, Write};

pub mod bootstrap;
pub mod config;
pub mod flatten;
pub mod forward;

// Re-export commonly used types for convenience
pub use config::{BodyConfig, ConfigError, IdStrategy, ServiceBusConfig, SqsConfig};
pub use flatten::{flatten, FlatMap, FlatValue, FlattenConfig, FlattenEngine, DEFAULT_PREFIX};
pub use forward::{JsonlStore, MemoryStore, ServiceBusForwarder, SqsForwarder};

/// Flatten newline-delimited message bodies, writing one JSON object per line.
///
/// Lines that are not valid JSON come out as `{"Body": <raw line>}`.
/// Returns the number of lines that parsed as JSON.
pub fn flatten_json_lines<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    engine: &FlattenEngine,
    prefix: &str,
) -> Result<usize> {
    let mut parsed = 0;

    for line in reader.lines() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }

        let body = forward::parse_body(line.as_bytes());
        let output: Map<String, Value> = match &body.json {
            Some(json) => {
                parsed += 1;
                engine
                    .flatten_with(json, prefix, |leaf| leaf.to_json())
                    .into_iter()
                    .collect()
            }
            None => {
                let mut fallback = Map::new();
                fallback.insert(forward::BODY_FIELD.to_string(), Value::String(body.raw));
                fallback
            }
        };

        let json = serde_json::to_string(&output).context("Failed to serialize record")?;
        writeln!(writer, "{}", json).context("Failed to write record")?;
    }

    Ok(parsed)
}
