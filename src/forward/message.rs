use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One SQS record as delivered in a Lambda event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsMessage {
    pub message_id: String,

    /// Token used to delete the message from the queue
    #[serde(default)]
    pub receipt_handle: String,

    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub md5_of_body: String,

    /// Custom attributes, kept in their delivered JSON shape
    #[serde(default)]
    pub message_attributes: Map<String, Value>,

    #[serde(default, rename = "eventSourceARN", skip_serializing_if = "Option::is_none")]
    pub event_source_arn: Option<String>,
}

/// A batch of SQS records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsMessage>,
}

/// A received Service Bus message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBusMessage {
    pub message_id: String,

    #[serde(default, deserialize_with = "bytes_from_text", serialize_with = "bytes_to_text")]
    pub body: Vec<u8>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub correlation_id: Option<String>,

    /// Application-defined label
    #[serde(default)]
    pub subject: Option<String>,

    /// Time to live in seconds
    #[serde(default)]
    pub time_to_live: Option<f64>,

    #[serde(default)]
    pub application_properties: Map<String, Value>,
}

impl ServiceBusMessage {
    pub fn new(message_id: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        ServiceBusMessage {
            message_id: message_id.into(),
            body: body.into(),
            ..Default::default()
        }
    }
}

impl SqsMessage {
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        SqsMessage {
            message_id: message_id.into(),
            body: body.into(),
            ..Default::default()
        }
    }
}

fn bytes_from_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    String::deserialize(deserializer).map(String::into_bytes)
}

fn bytes_to_text<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sqs_event_from_lambda_payload() {
        let payload = json!({
            "Records": [{
                "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
                "receiptHandle": "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a",
                "body": "{\"order\": {\"id\": 1}}",
                "attributes": {"ApproximateReceiveCount": "1"},
                "messageAttributes": {
                    "source": {"stringValue": "web", "dataType": "String"}
                },
                "md5OfBody": "e4e68fb7bd0e697a0ae8f1bb342846b3",
                "eventSource": "aws:sqs",
                "eventSourceARN": "arn:aws:sqs:us-east-2:123456789012:my-queue",
                "awsRegion": "us-east-2"
            }]
        });

        let event: SqsEvent = serde_json::from_value(payload).unwrap();

        assert_eq!(event.records.len(), 1);
        let record = &event.records[0];
        assert_eq!(record.message_id, "059f36b4-87a3-44ab-83d2-661975830a7d");
        assert_eq!(record.md5_of_body, "e4e68fb7bd0e697a0ae8f1bb342846b3");
        assert!(record.message_attributes.contains_key("source"));
        assert_eq!(
            record.event_source_arn.as_deref(),
            Some("arn:aws:sqs:us-east-2:123456789012:my-queue")
        );
    }

    #[test]
    fn test_empty_sqs_event() {
        let event: SqsEvent = serde_json::from_value(json!({})).unwrap();
        assert!(event.records.is_empty());
    }

    #[test]
    fn test_service_bus_message_body_text() {
        let message: ServiceBusMessage = serde_json::from_value(json!({
            "messageId": "m-1",
            "body": "hello",
            "subject": "greeting",
            "timeToLive": 3600.0,
            "applicationProperties": {"tenant": "acme"}
        }))
        .unwrap();

        assert_eq!(message.body, b"hello");
        assert_eq!(message.subject.as_deref(), Some("greeting"));
        assert_eq!(message.time_to_live, Some(3600.0));
        assert!(message.content_type.is_none());
    }
}
