use std::{collections::HashMap, fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::registry::Protocol;

/// Free-form details attached to an activity entry.
pub type Details = HashMap<String, Value>;

/// Kind of operation an activity entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CreateTopic,
    DeleteTopic,
    ListTopics,
    Subscribe,
    Unsubscribe,
    ConfirmSubscription,
    ListSubscriptions,
    Publish,
    Delivery,
    DeliveryError,
    HttpError,
    QueueError,
    GetAttributes,
    SetAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Failed,
    Retrying,
    Pending,
}

/// One immutable record in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: Details,
    /// Serialized as whole milliseconds.
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivityEntry {
    pub fn new(
        event_type: EventType,
        status: ActivityStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            topic_arn: None,
            message_id: None,
            subscription_arn: None,
            protocol: None,
            endpoint: None,
            status,
            details: Details::new(),
            duration: Duration::ZERO,
            error: None,
        }
    }

    pub fn with_topic(
        mut self,
        topic_arn: impl Into<String>,
    ) -> Self {
        let topic_arn = topic_arn.into();
        if !topic_arn.is_empty() {
            self.topic_arn = Some(topic_arn);
        }
        self
    }

    pub fn with_message(
        mut self,
        message_id: impl Into<String>,
    ) -> Self {
        let message_id = message_id.into();
        if !message_id.is_empty() {
            self.message_id = Some(message_id);
        }
        self
    }

    pub fn with_details(
        mut self,
        details: Details,
    ) -> Self {
        self.details = details;
        self
    }

    pub fn with_duration(
        mut self,
        duration: Duration,
    ) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_error(
        mut self,
        error: impl Into<String>,
    ) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Outcome of one delivery step, as reported by the delivery engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub topic_arn: String,
    pub message_id: String,
    pub subscription_arn: String,
    pub protocol: Protocol,
    pub endpoint: String,
    pub status: ActivityStatus,
    pub duration: Duration,
    pub error: Option<String>,
}

impl From<DeliveryRecord> for ActivityEntry {
    fn from(record: DeliveryRecord) -> Self {
        let mut entry = ActivityEntry::new(EventType::Delivery, record.status)
            .with_topic(record.topic_arn)
            .with_message(record.message_id)
            .with_duration(record.duration);
        entry.subscription_arn = Some(record.subscription_arn);
        entry.protocol = Some(record.protocol);
        entry.endpoint = Some(record.endpoint);
        entry.error = record.error;
        entry
    }
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTopic => "create_topic",
            Self::DeleteTopic => "delete_topic",
            Self::ListTopics => "list_topics",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::ConfirmSubscription => "confirm_subscription",
            Self::ListSubscriptions => "list_subscriptions",
            Self::Publish => "publish",
            Self::Delivery => "delivery",
            Self::DeliveryError => "delivery_error",
            Self::HttpError => "http_error",
            Self::QueueError => "queue_error",
            Self::GetAttributes => "get_attributes",
            Self::SetAttributes => "set_attributes",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(
            serde_json::to_value(EventType::ConfirmSubscription).unwrap(),
            json!("confirm_subscription")
        );
        assert_eq!(EventType::QueueError.to_string(), "queue_error");
        assert_eq!(
            serde_json::to_value(ActivityStatus::Retrying).unwrap(),
            json!("retrying")
        );
    }

    /// Empty identifiers are treated as absent.
    #[test]
    fn test_builder_skips_empty_ids() {
        let entry = ActivityEntry::new(EventType::ListTopics, ActivityStatus::Success)
            .with_topic("")
            .with_message("");
        assert!(entry.topic_arn.is_none());
        assert!(entry.message_id.is_none());
    }

    #[test]
    fn test_delivery_record_conversion() {
        let record = DeliveryRecord {
            topic_arn: "arn:t".into(),
            message_id: "m-1".into(),
            subscription_arn: "arn:t:1".into(),
            protocol: Protocol::Http,
            endpoint: "http://a".into(),
            status: ActivityStatus::Retrying,
            duration: Duration::from_millis(200),
            error: Some("retry attempt 2/3".into()),
        };
        let entry = ActivityEntry::from(record);
        assert_eq!(entry.event_type, EventType::Delivery);
        assert_eq!(entry.status, ActivityStatus::Retrying);
        assert_eq!(entry.duration_ms(), 200);
        assert_eq!(entry.subscription_arn.as_deref(), Some("arn:t:1"));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["duration_ms"], 200);
        assert_eq!(json["protocol"], "http");
        assert_eq!(json["error"], "retry attempt 2/3");
    }
}
