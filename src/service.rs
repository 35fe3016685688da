use std::{collections::HashMap, sync::Arc, time::Instant};

use serde_json::json;
use snsim_error::{RegistryError, RegistryResult};
use tracing::{info, warn};

use crate::{
    activity::{ActivityLog, ActivityStatus, Details, EventType},
    application::DeliveryPort,
    config::Settings,
    delivery::Deliverer,
    error::StartupError,
    pubsub::{MessageAttributes, Publisher},
    registry::{
        ArnScope, Protocol, Subscription, SubscriptionRegistry, SubscriptionStatus, Topic,
        TopicRegistry,
    },
};

/// Single entry point for every control-plane operation.
///
/// Validates requests, keeps the two registries in step and records each
/// mutation in the activity log. One instance is shared by every caller.
pub struct SnsService {
    topics: Arc<TopicRegistry>,
    subscriptions: Arc<SubscriptionRegistry>,
    activity: Arc<ActivityLog>,
    publisher: Publisher,
    auto_confirm: bool,
    max_message_size: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Construction
////////////////////////////////////////////////////////////////////////////////

impl SnsService {
    /// Builds the service with the real delivery engine.
    pub fn new(settings: &Settings) -> Result<Self, StartupError> {
        let activity = Arc::new(ActivityLog::with_listener_buffer(
            settings.activity.capacity,
            settings.activity.listener_buffer,
        ));
        let deliverer = Deliverer::from_settings(settings, activity.clone())?;
        Ok(Self::with_delivery(settings, activity, Arc::new(deliverer)))
    }

    /// Builds the service over an arbitrary delivery port.
    pub fn with_delivery(
        settings: &Settings,
        activity: Arc<ActivityLog>,
        delivery: Arc<dyn DeliveryPort>,
    ) -> Self {
        let scope = ArnScope::new(&settings.account.account_id, &settings.account.region);
        let topics = Arc::new(TopicRegistry::new(scope.clone()));
        let subscriptions = Arc::new(SubscriptionRegistry::new(scope));
        let publisher = Publisher::new(subscriptions.clone(), delivery, activity.clone());

        Self {
            topics,
            subscriptions,
            activity,
            publisher,
            auto_confirm: settings.developer.auto_confirm_subscriptions,
            max_message_size: settings.messages.max_size,
        }
    }

    pub fn topics(&self) -> &Arc<TopicRegistry> {
        &self.topics
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionRegistry> {
        &self.subscriptions
    }

    /// Activity log handle, for snapshots and live listeners.
    pub fn activity(&self) -> &Arc<ActivityLog> {
        &self.activity
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Cancels in-flight deliveries. Later calls are no-ops.
    pub fn shutdown(&self) {
        if self.publisher.is_shut_down() {
            return;
        }
        info!(
            in_flight = self.publisher.in_flight(),
            "shutting down, cancelling in-flight deliveries"
        );
        self.publisher.shutdown();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Topics
////////////////////////////////////////////////////////////////////////////////

impl SnsService {
    pub fn create_topic(
        &self,
        name: &str,
        attributes: HashMap<String, String>,
    ) -> RegistryResult<Topic> {
        let start = Instant::now();
        let result = self.topics.create_topic(name, attributes);
        match &result {
            Ok(topic) => self.activity.log_with_duration(
                EventType::CreateTopic,
                &topic.topic_arn,
                ActivityStatus::Success,
                details([("name", json!(name))]),
                start.elapsed(),
            ),
            Err(e) => self.record_error(EventType::CreateTopic, "", e),
        }
        result
    }

    /// Deletes the topic only; its subscriptions stay registered.
    pub fn delete_topic(
        &self,
        topic_arn: &str,
    ) -> RegistryResult<()> {
        let start = Instant::now();
        let result = self.topics.delete_topic(topic_arn);
        match &result {
            Ok(()) => self.activity.log_with_duration(
                EventType::DeleteTopic,
                topic_arn,
                ActivityStatus::Success,
                Details::new(),
                start.elapsed(),
            ),
            Err(e) => self.record_error(EventType::DeleteTopic, topic_arn, e),
        }
        result
    }

    pub fn list_topics(&self) -> Vec<Topic> {
        let start = Instant::now();
        let topics = self.topics.list_topics();
        self.activity.log_with_duration(
            EventType::ListTopics,
            "",
            ActivityStatus::Success,
            details([("count", json!(topics.len()))]),
            start.elapsed(),
        );
        topics
    }

    pub fn get_topic(
        &self,
        topic_arn: &str,
    ) -> RegistryResult<Topic> {
        self.topics.get_topic(topic_arn)
    }

    /// Stored attributes plus the derived `TopicArn`, `DisplayName`,
    /// `SubscriptionsConfirmed` and `SubscriptionsPending`.
    pub fn get_topic_attributes(
        &self,
        topic_arn: &str,
    ) -> RegistryResult<HashMap<String, String>> {
        let start = Instant::now();
        let topic = match self.topics.get_topic(topic_arn) {
            Ok(topic) => topic,
            Err(e) => {
                self.record_error(EventType::GetAttributes, topic_arn, &e);
                return Err(e);
            }
        };

        let subs = self.subscriptions.get_by_topic(topic_arn);
        let confirmed = subs.iter().filter(|s| s.is_confirmed()).count();

        let mut attributes = topic.attributes;
        attributes.insert("TopicArn".to_string(), topic.topic_arn);
        attributes.insert("DisplayName".to_string(), topic.display_name);
        attributes.insert("SubscriptionsConfirmed".to_string(), confirmed.to_string());
        attributes.insert(
            "SubscriptionsPending".to_string(),
            (subs.len() - confirmed).to_string(),
        );

        self.activity.log_with_duration(
            EventType::GetAttributes,
            topic_arn,
            ActivityStatus::Success,
            Details::new(),
            start.elapsed(),
        );
        Ok(attributes)
    }

    pub fn set_topic_attribute(
        &self,
        topic_arn: &str,
        name: &str,
        value: &str,
    ) -> RegistryResult<()> {
        let start = Instant::now();
        let result = if name.is_empty() {
            Err(RegistryError::MissingField {
                field: "AttributeName",
            })
        } else {
            self.topics.set_attribute(topic_arn, name, value)
        };

        match &result {
            Ok(()) => self.activity.log_with_duration(
                EventType::SetAttributes,
                topic_arn,
                ActivityStatus::Success,
                details([
                    ("attribute_name", json!(name)),
                    ("attribute_value", json!(value)),
                ]),
                start.elapsed(),
            ),
            Err(e) => self.record_error(EventType::SetAttributes, topic_arn, e),
        }
        result
    }
}

////////////////////////////////////////////////////////////////////////////////
// Subscriptions
////////////////////////////////////////////////////////////////////////////////

impl SnsService {
    /// Subscribes `endpoint` to an existing topic.
    ///
    /// `protocol` accepts the client-facing names (`https`, `sqs`, `lambda`,
    /// `email-json`) as well as the internal ones.
    pub fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: &str,
    ) -> RegistryResult<Subscription> {
        let result = self.try_subscribe(topic_arn, protocol, endpoint);
        match &result {
            Ok(sub) => self.activity.log(
                EventType::Subscribe,
                topic_arn,
                ActivityStatus::Success,
                details([
                    ("subscription_arn", json!(sub.subscription_arn)),
                    ("protocol", json!(sub.protocol)),
                    ("endpoint", json!(sub.endpoint)),
                    ("status", json!(sub.status)),
                ]),
            ),
            Err(e) => self.activity.log_error(
                EventType::Subscribe,
                topic_arn,
                "",
                e,
                details([("protocol", json!(protocol)), ("endpoint", json!(endpoint))]),
            ),
        }
        result
    }

    fn try_subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: &str,
    ) -> RegistryResult<Subscription> {
        if topic_arn.is_empty() {
            return Err(RegistryError::MissingField { field: "TopicArn" });
        }
        if protocol.is_empty() {
            return Err(RegistryError::MissingField { field: "Protocol" });
        }
        if endpoint.is_empty() {
            return Err(RegistryError::MissingField { field: "Endpoint" });
        }
        if !self.topics.contains(topic_arn) {
            return Err(RegistryError::topic_not_found(topic_arn));
        }
        let protocol: Protocol = protocol.parse()?;

        let sub = self
            .subscriptions
            .create(topic_arn, protocol, endpoint, self.auto_confirm)?;
        // A concurrent delete may have removed the topic since the check.
        if let Err(e) = self.topics.increment_subscription_count(topic_arn) {
            warn!(topic_arn, error = %e, "topic vanished while subscribing");
        }
        Ok(sub)
    }

    pub fn unsubscribe(
        &self,
        subscription_arn: &str,
    ) -> RegistryResult<()> {
        let result = self.subscriptions.delete(subscription_arn);
        match &result {
            Ok(sub) => {
                // The topic may already be gone; its count went with it.
                let _ = self.topics.decrement_subscription_count(&sub.topic_arn);
                self.activity.log(
                    EventType::Unsubscribe,
                    &sub.topic_arn,
                    ActivityStatus::Success,
                    details([("subscription_arn", json!(subscription_arn))]),
                );
            }
            Err(e) => self.record_error(EventType::Unsubscribe, "", e),
        }
        result.map(|_| ())
    }

    pub fn confirm_subscription(
        &self,
        subscription_arn: &str,
        token: &str,
    ) -> RegistryResult<Subscription> {
        let result = self.subscriptions.confirm(subscription_arn, token);
        match &result {
            Ok(sub) => self.activity.log(
                EventType::ConfirmSubscription,
                &sub.topic_arn,
                ActivityStatus::Success,
                details([("subscription_arn", json!(subscription_arn))]),
            ),
            Err(e) => self.activity.log_error(
                EventType::ConfirmSubscription,
                "",
                "",
                e,
                details([("subscription_arn", json!(subscription_arn))]),
            ),
        }
        result
    }

    pub fn get_subscription(
        &self,
        subscription_arn: &str,
    ) -> RegistryResult<Subscription> {
        self.subscriptions
            .get_by_arn(subscription_arn)
            .ok_or_else(|| RegistryError::subscription_not_found(subscription_arn))
    }

    /// Token needed to confirm a pending subscription; empty once confirmed.
    pub fn confirmation_token(
        &self,
        subscription_arn: &str,
    ) -> RegistryResult<String> {
        self.subscriptions.confirmation_token(subscription_arn)
    }

    pub fn list_subscriptions(&self) -> Vec<Subscription> {
        let subs = self.subscriptions.list_all();
        self.activity.log(
            EventType::ListSubscriptions,
            "",
            ActivityStatus::Success,
            details([("count", json!(subs.len()))]),
        );
        subs
    }

    pub fn list_subscriptions_by_topic(
        &self,
        topic_arn: &str,
    ) -> RegistryResult<Vec<Subscription>> {
        if !self.topics.contains(topic_arn) {
            let err = RegistryError::topic_not_found(topic_arn);
            self.record_error(EventType::ListSubscriptions, topic_arn, &err);
            return Err(err);
        }
        let subs = self.subscriptions.get_by_topic(topic_arn);
        self.activity.log(
            EventType::ListSubscriptions,
            topic_arn,
            ActivityStatus::Success,
            details([("count", json!(subs.len()))]),
        );
        Ok(subs)
    }

    /// Stored attributes plus the derived `SubscriptionArn`, `TopicArn`,
    /// `Protocol`, `Endpoint` and `PendingConfirmation`.
    pub fn get_subscription_attributes(
        &self,
        subscription_arn: &str,
    ) -> RegistryResult<HashMap<String, String>> {
        let sub = match self.get_subscription(subscription_arn) {
            Ok(sub) => sub,
            Err(e) => {
                self.record_error(EventType::GetAttributes, "", &e);
                return Err(e);
            }
        };

        let mut attributes = sub.attributes;
        attributes.insert("SubscriptionArn".to_string(), sub.subscription_arn);
        attributes.insert("TopicArn".to_string(), sub.topic_arn.clone());
        attributes.insert("Protocol".to_string(), sub.protocol.to_string());
        attributes.insert("Endpoint".to_string(), sub.endpoint);
        attributes.insert(
            "PendingConfirmation".to_string(),
            (sub.status != SubscriptionStatus::Confirmed).to_string(),
        );

        self.activity.log(
            EventType::GetAttributes,
            &sub.topic_arn,
            ActivityStatus::Success,
            details([("subscription_arn", json!(subscription_arn))]),
        );
        Ok(attributes)
    }

    pub fn set_subscription_attribute(
        &self,
        subscription_arn: &str,
        name: &str,
        value: &str,
    ) -> RegistryResult<()> {
        let result = if name.is_empty() {
            Err(RegistryError::MissingField {
                field: "AttributeName",
            })
        } else {
            self.subscriptions
                .set_attribute(subscription_arn, name, value)
        };

        match &result {
            Ok(()) => self.activity.log(
                EventType::SetAttributes,
                "",
                ActivityStatus::Success,
                details([
                    ("subscription_arn", json!(subscription_arn)),
                    ("attribute_name", json!(name)),
                ]),
            ),
            Err(e) => self.record_error(EventType::SetAttributes, "", e),
        }
        result
    }
}

////////////////////////////////////////////////////////////////////////////////
// Publishing
////////////////////////////////////////////////////////////////////////////////

impl SnsService {
    pub fn publish(
        &self,
        topic_arn: &str,
        subject: Option<&str>,
        body: &str,
    ) -> RegistryResult<String> {
        self.publish_with_attributes(topic_arn, subject, body, MessageAttributes::new())
    }

    /// Validates and hands the message to the publisher. Returns the message
    /// id before any delivery has happened.
    pub fn publish_with_attributes(
        &self,
        topic_arn: &str,
        subject: Option<&str>,
        body: &str,
        attributes: MessageAttributes,
    ) -> RegistryResult<String> {
        let result = self.validate_publish(topic_arn, body).and_then(|()| {
            self.publisher
                .publish(topic_arn, subject.map(str::to_string), body, attributes)
        });
        if let Err(e) = &result {
            self.activity.log_error(
                EventType::Publish,
                topic_arn,
                "",
                e,
                details([("message_length", json!(body.len()))]),
            );
        }
        result
    }

    fn validate_publish(
        &self,
        topic_arn: &str,
        body: &str,
    ) -> RegistryResult<()> {
        if topic_arn.is_empty() {
            return Err(RegistryError::MissingField { field: "TopicArn" });
        }
        if body.is_empty() {
            return Err(RegistryError::MissingField { field: "Message" });
        }
        if body.len() > self.max_message_size {
            return Err(RegistryError::MessageTooLarge {
                size: body.len(),
                max: self.max_message_size,
            });
        }
        if !self.topics.contains(topic_arn) {
            return Err(RegistryError::topic_not_found(topic_arn));
        }
        Ok(())
    }

    fn record_error(
        &self,
        event_type: EventType,
        topic_arn: &str,
        error: &RegistryError,
    ) {
        self.activity
            .log_error(event_type, topic_arn, "", error, Details::new());
    }
}

fn details<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Details {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
