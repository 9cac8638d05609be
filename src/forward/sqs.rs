use crate::config::SqsConfig;
use crate::flatten::FlattenEngine;
use crate::forward::body::parse_body;
use crate::forward::error::{ForwardError, Result};
use crate::forward::item::{AttributeValue, Item};
use crate::forward::message::{SqsEvent, SqsMessage};
use crate::forward::store::TableStore;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Partial batch response: only the listed records are redelivered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqsBatchResponse {
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

impl SqsBatchResponse {
    pub fn is_success(&self) -> bool {
        self.batch_item_failures.is_empty()
    }
}

/// Forwards SQS records into a table, one item per record
pub struct SqsForwarder<S: ?Sized> {
    store: Arc<S>,
    config: SqsConfig,
    engine: FlattenEngine,
}

impl<S: TableStore + ?Sized> SqsForwarder<S> {
    pub fn new(store: Arc<S>, config: SqsConfig) -> Self {
        let engine = config.body.engine();
        SqsForwarder { store, config, engine }
    }

    pub fn config(&self) -> &SqsConfig {
        &self.config
    }

    /// Build the table item for a record: metadata first, then body fields
    pub fn build_item(&self, record: &SqsMessage, received_at: DateTime<Utc>) -> Item {
        let mut item = Item::new();
        item.insert("MessageId".into(), AttributeValue::s(&record.message_id));
        item.insert("ReceiptHandle".into(), AttributeValue::s(&record.receipt_handle));
        item.insert("Md5OfBody".into(), AttributeValue::s(&record.md5_of_body));
        item.insert(
            "Timestamp".into(),
            AttributeValue::S(received_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );

        if !record.message_attributes.is_empty() {
            let attributes = Value::Object(record.message_attributes.clone()).to_string();
            item.insert("MessageAttributes".into(), AttributeValue::S(attributes));
        }

        let body = parse_body(record.body.as_bytes());
        body.merge_into(&mut item, &self.engine, &self.config.body.prefix, AttributeValue::from);
        item
    }

    /// Write one record to the configured table
    #[tracing::instrument(name = "sqs.write", skip_all, fields(message_id = %record.message_id))]
    pub async fn write_message(&self, record: &SqsMessage) -> Result<()> {
        let item = self.build_item(record, Utc::now());
        let table = &self.config.table_name;

        match self.store.put_item(table, item).await {
            Ok(()) => {
                info!(table = %table, "wrote message to table");
                Ok(())
            }
            Err(source) => {
                error!(table = %table, error = %source, "failed to write message to table");
                Err(ForwardError::Store {
                    message_id: record.message_id.clone(),
                    source,
                })
            }
        }
    }

    /// Process a batch. Failed records are reported, not fatal to the batch.
    pub async fn handle_event(&self, event: &SqsEvent) -> SqsBatchResponse {
        let mut response = SqsBatchResponse::default();

        if event.records.is_empty() {
            warn!("no SQS messages received");
            return response;
        }

        info!(records = event.records.len(), "processing SQS batch");

        for record in &event.records {
            info!(message_id = %record.message_id, "processing message");
            match self.write_message(record).await {
                Ok(()) => info!(message_id = %record.message_id, "processed message"),
                // Already logged by write_message
                Err(_) => {
                    response.batch_item_failures.push(BatchItemFailure {
                        item_identifier: record.message_id.clone(),
                    });
                }
            }
        }

        info!(
            failed = response.batch_item_failures.len(),
            "completed processing of all records"
        );
        response
    }
}
