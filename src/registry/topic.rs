use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use snsim_error::{RegistryError, RegistryResult};

use super::arn::ArnScope;

pub const ATTR_DISPLAY_NAME: &str = "DisplayName";
pub const ATTR_FIFO_TOPIC: &str = "FifoTopic";
pub const ATTR_CONTENT_BASED_DEDUP: &str = "ContentBasedDeduplication";

/// A named pub/sub channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub topic_arn: String,
    pub display_name: String,
    /// Label only; FIFO ordering is not enforced.
    pub fifo_topic: bool,
    pub content_based_deduplication: bool,
    pub attributes: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub subscription_count: u64,
}

/// Thread-safe topic store.
///
/// One `RwLock` guards the identifier → topic map. Every read returns an owned
/// copy, so callers never hold the lock while iterating.
#[derive(Debug)]
pub struct TopicRegistry {
    topics: RwLock<HashMap<String, Topic>>,
    scope: ArnScope,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl TopicRegistry {
    pub fn new(scope: ArnScope) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            scope,
        }
    }

    pub fn scope(&self) -> &ArnScope {
        &self.scope
    }

    /// Creates a topic, or returns the existing one untouched.
    ///
    /// # Errors
    /// - `MissingField` if `name` is empty.
    pub fn create_topic(
        &self,
        name: &str,
        attributes: HashMap<String, String>,
    ) -> RegistryResult<Topic> {
        if name.is_empty() {
            return Err(RegistryError::MissingField { field: "Name" });
        }

        let arn = self.scope.topic_arn(name);
        let mut topics = self.topics.write();

        if let Some(existing) = topics.get(&arn) {
            return Ok(existing.clone());
        }

        let topic = Topic {
            topic_arn: arn.clone(),
            display_name: attributes
                .get(ATTR_DISPLAY_NAME)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
            fifo_topic: is_true(&attributes, ATTR_FIFO_TOPIC),
            content_based_deduplication: is_true(&attributes, ATTR_CONTENT_BASED_DEDUP),
            attributes,
            created_at: Utc::now(),
            subscription_count: 0,
        };
        topics.insert(arn, topic.clone());

        Ok(topic)
    }

    pub fn get_topic(
        &self,
        arn: &str,
    ) -> RegistryResult<Topic> {
        self.topics
            .read()
            .get(arn)
            .cloned()
            .ok_or_else(|| RegistryError::topic_not_found(arn))
    }

    pub fn contains(
        &self,
        arn: &str,
    ) -> bool {
        self.topics.read().contains_key(arn)
    }

    /// Removes the topic. Subscriptions pointing at it are left alone.
    pub fn delete_topic(
        &self,
        arn: &str,
    ) -> RegistryResult<()> {
        self.topics
            .write()
            .remove(arn)
            .map(|_| ())
            .ok_or_else(|| RegistryError::topic_not_found(arn))
    }

    /// Snapshot of all topics, in no particular order.
    pub fn list_topics(&self) -> Vec<Topic> {
        self.topics.read().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.topics.read().len()
    }

    /// Sets one attribute. `DisplayName` also updates the display name field.
    pub fn set_attribute(
        &self,
        arn: &str,
        key: &str,
        value: &str,
    ) -> RegistryResult<()> {
        self.with_topic_mut(arn, |topic| {
            topic.attributes.insert(key.to_string(), value.to_string());
            if key == ATTR_DISPLAY_NAME {
                topic.display_name = value.to_string();
            }
        })
    }

    /// Missing keys read as an empty string.
    pub fn get_attribute(
        &self,
        arn: &str,
        key: &str,
    ) -> RegistryResult<String> {
        let topics = self.topics.read();
        let topic = topics
            .get(arn)
            .ok_or_else(|| RegistryError::topic_not_found(arn))?;
        Ok(topic.attributes.get(key).cloned().unwrap_or_default())
    }

    pub fn get_attributes(
        &self,
        arn: &str,
    ) -> RegistryResult<HashMap<String, String>> {
        let topics = self.topics.read();
        topics
            .get(arn)
            .map(|topic| topic.attributes.clone())
            .ok_or_else(|| RegistryError::topic_not_found(arn))
    }

    pub fn increment_subscription_count(
        &self,
        arn: &str,
    ) -> RegistryResult<()> {
        self.with_topic_mut(arn, |topic| topic.subscription_count += 1)
    }

    /// Floors at zero.
    pub fn decrement_subscription_count(
        &self,
        arn: &str,
    ) -> RegistryResult<()> {
        self.with_topic_mut(arn, |topic| {
            topic.subscription_count = topic.subscription_count.saturating_sub(1)
        })
    }

    fn with_topic_mut<F>(
        &self,
        arn: &str,
        f: F,
    ) -> RegistryResult<()>
    where
        F: FnOnce(&mut Topic),
    {
        let mut topics = self.topics.write();
        let topic = topics
            .get_mut(arn)
            .ok_or_else(|| RegistryError::topic_not_found(arn))?;
        f(topic);
        Ok(())
    }
}

fn is_true(
    attributes: &HashMap<String, String>,
    key: &str,
) -> bool {
    attributes.get(key).is_some_and(|v| v == "true")
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for TopicRegistry
////////////////////////////////////////////////////////////////////////////////

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new(ArnScope::default())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Creating the same name twice yields one topic with one identifier.
    #[test]
    fn test_create_is_idempotent() {
        let registry = TopicRegistry::default();
        let first = registry.create_topic("orders", HashMap::new()).unwrap();
        let second = registry
            .create_topic("orders", attrs(&[(ATTR_FIFO_TOPIC, "true")]))
            .unwrap();

        assert_eq!(first.topic_arn, second.topic_arn);
        assert_eq!(first, second, "existing topic is returned unchanged");
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let registry = TopicRegistry::default();
        let err = registry.create_topic("", HashMap::new()).unwrap_err();
        assert_eq!(err, RegistryError::MissingField { field: "Name" });
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_flags_from_attributes() {
        let registry = TopicRegistry::default();
        let topic = registry
            .create_topic(
                "events.fifo",
                attrs(&[
                    (ATTR_FIFO_TOPIC, "true"),
                    (ATTR_CONTENT_BASED_DEDUP, "false"),
                ]),
            )
            .unwrap();
        assert!(topic.fifo_topic);
        assert!(!topic.content_based_deduplication);
        assert_eq!(topic.display_name, "events.fifo");
        assert_eq!(topic.subscription_count, 0);
    }

    #[test]
    fn test_get_and_delete() {
        let registry = TopicRegistry::default();
        let arn = registry
            .create_topic("t", HashMap::new())
            .unwrap()
            .topic_arn;

        assert!(registry.get_topic(&arn).is_ok());
        registry.delete_topic(&arn).unwrap();
        assert!(registry.get_topic(&arn).unwrap_err().is_not_found());
        assert!(registry.delete_topic(&arn).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_is_snapshot() {
        let registry = TopicRegistry::default();
        registry.create_topic("a", HashMap::new()).unwrap();
        registry.create_topic("b", HashMap::new()).unwrap();

        let mut snapshot = registry.list_topics();
        registry.create_topic("c", HashMap::new()).unwrap();
        assert_eq!(snapshot.len(), 2);

        snapshot.sort_by(|x, y| x.topic_arn.cmp(&y.topic_arn));
        assert!(snapshot[0].topic_arn.ends_with(":a"));
        assert_eq!(registry.list_topics().len(), 3);
    }

    #[test]
    fn test_display_name_attribute() {
        let registry = TopicRegistry::default();
        let arn = registry
            .create_topic("t", HashMap::new())
            .unwrap()
            .topic_arn;

        registry
            .set_attribute(&arn, ATTR_DISPLAY_NAME, "Pretty")
            .unwrap();
        registry.set_attribute(&arn, "Policy", "{}").unwrap();

        assert_eq!(registry.get_topic(&arn).unwrap().display_name, "Pretty");
        assert_eq!(registry.get_attribute(&arn, "Policy").unwrap(), "{}");
        assert_eq!(registry.get_attribute(&arn, "Missing").unwrap(), "");
        assert_eq!(registry.get_attributes(&arn).unwrap().len(), 2);
        assert!(registry.set_attribute("nope", "k", "v").is_err());
    }

    /// The subscription count never drops below zero.
    #[test]
    fn test_subscription_count_floors_at_zero() {
        let registry = TopicRegistry::default();
        let arn = registry
            .create_topic("t", HashMap::new())
            .unwrap()
            .topic_arn;

        registry.increment_subscription_count(&arn).unwrap();
        registry.increment_subscription_count(&arn).unwrap();
        registry.decrement_subscription_count(&arn).unwrap();
        assert_eq!(registry.get_topic(&arn).unwrap().subscription_count, 1);

        registry.decrement_subscription_count(&arn).unwrap();
        registry.decrement_subscription_count(&arn).unwrap();
        assert_eq!(registry.get_topic(&arn).unwrap().subscription_count, 0);

        assert!(registry
            .increment_subscription_count("missing")
            .unwrap_err()
            .is_not_found());
    }
}
