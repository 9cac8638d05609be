use crate::config::{IdStrategy, ServiceBusConfig};
use crate::flatten::FlattenEngine;
use crate::forward::body::parse_body;
use crate::forward::error::{ForwardError, Result, SettlementError};
use crate::forward::item::{document_value, Document};
use crate::forward::message::ServiceBusMessage;
use crate::forward::store::ContainerStore;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

pub type SettleResult = std::result::Result<(), SettlementError>;

/// Settlement calls offered by the messaging platform for a received message
#[async_trait]
pub trait MessageActions: Send + Sync {
    /// Remove the message from the queue
    async fn complete(&self, message: &ServiceBusMessage) -> SettleResult;

    /// Release the lock so the message is redelivered
    async fn abandon(&self, message: &ServiceBusMessage) -> SettleResult;
}

/// How a handled message was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Completed,
    Abandoned,
}

/// Forwards Service Bus messages into a document container
pub struct ServiceBusForwarder<S: ?Sized> {
    store: Arc<S>,
    config: ServiceBusConfig,
    engine: FlattenEngine,
    container_ready: OnceCell<()>,
}

impl<S: ContainerStore + ?Sized> ServiceBusForwarder<S> {
    pub fn new(store: Arc<S>, config: ServiceBusConfig) -> Self {
        let engine = config.body.engine();
        ServiceBusForwarder {
            store,
            config,
            engine,
            container_ready: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ServiceBusConfig {
        &self.config
    }

    /// Build the container document for a message
    pub fn build_document(
        &self,
        message: &ServiceBusMessage,
        received_at: DateTime<Utc>,
    ) -> Document {
        let id = match self.config.id_strategy {
            IdStrategy::MessageId => message.message_id.clone(),
            IdStrategy::Random => uuid::Uuid::new_v4().to_string(),
        };
        let text = |field: &Option<String>| Value::String(field.clone().unwrap_or_default());

        let mut fields: IndexMap<String, Value> = IndexMap::new();
        fields.insert("id".into(), Value::String(id));
        fields.insert("MessageId".into(), Value::String(message.message_id.clone()));
        fields.insert("ContentType".into(), text(&message.content_type));
        fields.insert("CorrelationId".into(), text(&message.correlation_id));
        fields.insert("Label".into(), text(&message.subject));
        fields.insert(
            "TimeToLive".into(),
            message
                .time_to_live
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        );
        fields.insert(
            "Timestamp".into(),
            Value::String(received_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );

        if !message.application_properties.is_empty() {
            let properties = Value::Object(message.application_properties.clone()).to_string();
            fields.insert("ApplicationProperties".into(), Value::String(properties));
        }

        let body = parse_body(&message.body);
        body.merge_into(&mut fields, &self.engine, &self.config.body.prefix, document_value);

        fields.into_iter().collect()
    }

    /// Create the container on first use. A failed attempt is retried on the next call.
    async fn ensure_container(&self) -> Result<()> {
        self.container_ready
            .get_or_try_init(|| async {
                let config = &self.config;
                self.store
                    .ensure_container(
                        &config.database_name,
                        &config.container_name,
                        &config.partition_key_path,
                    )
                    .await
                    .map_err(|source| ForwardError::Provision {
                        container: config.container_name.clone(),
                        source,
                    })
            })
            .await?;
        Ok(())
    }

    /// Write one message to the configured container
    #[tracing::instrument(
        name = "service_bus.write",
        skip_all,
        fields(message_id = %message.message_id)
    )]
    pub async fn write_message(&self, message: &ServiceBusMessage) -> Result<()> {
        if let Err(err) = self.ensure_container().await {
            error!(error = %err, "container provisioning failed");
            return Err(err);
        }

        let document = self.build_document(message, Utc::now());
        let config = &self.config;

        match self
            .store
            .create_item(
                &config.database_name,
                &config.container_name,
                &message.message_id,
                document,
            )
            .await
        {
            Ok(()) => {
                info!(container = %config.container_name, "wrote message to container");
                Ok(())
            }
            Err(source) => {
                error!(
                    container = %config.container_name,
                    error = %source,
                    "failed to write message to container"
                );
                Err(ForwardError::Store {
                    message_id: message.message_id.clone(),
                    source,
                })
            }
        }
    }

    /// Write a message, then complete it; abandon it for redelivery when the write fails
    pub async fn handle<A>(&self, message: &ServiceBusMessage, actions: &A) -> Result<Settlement>
    where
        A: MessageActions + ?Sized,
    {
        info!(message_id = %message.message_id, "processing message");

        let (settled, outcome) = match self.write_message(message).await {
            Ok(()) => {
                info!(message_id = %message.message_id, "processed message");
                (actions.complete(message).await, Settlement::Completed)
            }
            Err(err) => {
                error!(
                    message_id = %message.message_id,
                    error = %err,
                    "error processing message, abandoning"
                );
                (actions.abandon(message).await, Settlement::Abandoned)
            }
        };

        settled.map_err(|source| ForwardError::Settlement {
            message_id: message.message_id.clone(),
            source,
        })?;
        Ok(outcome)
    }
}
