//! Message forwarding - write queue messages into key/attribute stores
//!
//! Each forwarder turns one inbound record into one store write: message
//! metadata, the raw body under `Body`, and, when the body parses as JSON,
//! the flattened body under the configured prefix.
//!
//! Stores are reached through [`TableStore`] and [`ContainerStore`];
//! [`MemoryStore`] and [`JsonlStore`] are the bundled implementations.

pub mod body;
pub mod error;
pub mod item;
pub mod message;
pub mod service_bus;
pub mod sqs;
pub mod store;
pub mod writer;

pub use body::{parse_body, BodyContent, BODY_FIELD};
pub use error::{ForwardError, SettlementError};
pub use item::{document_value, AttributeValue, Document, Item};
pub use message::{ServiceBusMessage, SqsEvent, SqsMessage};
pub use service_bus::{MessageActions, ServiceBusForwarder, SettleResult, Settlement};
pub use sqs::{BatchItemFailure, SqsBatchResponse, SqsForwarder};
pub use store::{ContainerStore, MemoryStore, StoreError, TableStore};
pub use writer::JsonlStore;
