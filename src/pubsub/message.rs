use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use snsim_error::{DeliveryError, DeliveryResult};
use uuid::Uuid;

/// Structured per-message attributes, keyed by attribute name.
pub type MessageAttributes = HashMap<String, Value>;

/// A published message. Lives only as long as its deliveries.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub message_id: String,
    pub topic_arn: String,
    pub subject: Option<String>,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub attributes: MessageAttributes,
}

/// Wire shape of the notification delivered to subscribers.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Notification<'a> {
    #[serde(rename = "Type")]
    kind: &'static str,
    message_id: &'a str,
    topic_arn: &'a str,
    subject: &'a str,
    message: &'a str,
    timestamp: String,
    #[serde(skip_serializing_if = "no_attributes")]
    message_attributes: &'a MessageAttributes,
}

fn no_attributes(attributes: &&MessageAttributes) -> bool {
    attributes.is_empty()
}

impl Message {
    /// Builds a message with a fresh identifier. An empty subject counts as
    /// absent.
    pub fn new(
        topic_arn: impl Into<String>,
        subject: Option<String>,
        body: impl Into<String>,
        attributes: MessageAttributes,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            topic_arn: topic_arn.into(),
            subject: subject.filter(|s| !s.is_empty()),
            body: body.into(),
            timestamp: Utc::now(),
            attributes,
        }
    }

    pub fn subject_str(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    /// Serializes the notification JSON object sent to every endpoint.
    pub fn to_notification_json(&self) -> DeliveryResult<String> {
        let notification = Notification {
            kind: "Notification",
            message_id: &self.message_id,
            topic_arn: &self.topic_arn,
            subject: self.subject_str(),
            message: &self.body,
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            message_attributes: &self.attributes,
        };
        serde_json::to_string(&notification)
            .map_err(|e| DeliveryError::Serialization(e.to_string()))
    }
}
