use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use snsim_error::{RegistryError, RegistryResult};
use uuid::Uuid;

use super::arn::ArnScope;

/// Delivery protocol of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP or HTTPS endpoint.
    Http,
    /// Queue-service queue URL.
    Queue,
    /// Simulated.
    Email,
    /// Simulated.
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Confirmed,
    Unsubscribed,
}

/// Registration of one endpoint against one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_arn: String,
    /// Reference only: the topic may be deleted while this survives.
    pub topic_arn: String,
    pub protocol: Protocol,
    pub endpoint: String,
    pub status: SubscriptionStatus,
    #[serde(skip)]
    pub confirmation_token: String,
    pub created_at: DateTime<Utc>,
    pub attributes: HashMap<String, String>,
}

impl Subscription {
    pub fn is_confirmed(&self) -> bool {
        self.status == SubscriptionStatus::Confirmed
    }
}

/// Primary map and per-topic index. Always mutated together.
#[derive(Debug, Default)]
struct SubscriptionState {
    by_arn: HashMap<String, Subscription>,
    by_topic: HashMap<String, Vec<String>>,
    next_seq: u64,
}

/// Thread-safe subscription store.
///
/// A single lock covers both the primary map and the topic buckets so they
/// cannot disagree. Topic existence is not checked here: that is the job of the
/// layer above.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    state: RwLock<SubscriptionState>,
    scope: ArnScope,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl SubscriptionRegistry {
    pub fn new(scope: ArnScope) -> Self {
        Self {
            state: RwLock::new(SubscriptionState {
                next_seq: 1,
                ..Default::default()
            }),
            scope,
        }
    }

    /// Registers a new subscription.
    ///
    /// Status is `confirmed` when `auto_confirm` is set, `pending` otherwise.
    /// A fresh one-time confirmation token is generated either way.
    pub fn create(
        &self,
        topic_arn: &str,
        protocol: Protocol,
        endpoint: &str,
        auto_confirm: bool,
    ) -> RegistryResult<Subscription> {
        if topic_arn.is_empty() {
            return Err(RegistryError::MissingField { field: "TopicArn" });
        }
        if endpoint.is_empty() {
            return Err(RegistryError::MissingField { field: "Endpoint" });
        }

        let mut state = self.state.write();

        let seq = state.next_seq;
        state.next_seq += 1;

        let status = if auto_confirm {
            SubscriptionStatus::Confirmed
        } else {
            SubscriptionStatus::Pending
        };
        // An auto-confirmed subscription has nothing left to confirm.
        let confirmation_token = if auto_confirm {
            String::new()
        } else {
            Uuid::new_v4().simple().to_string()
        };

        let sub = Subscription {
            subscription_arn: self.scope.subscription_arn(topic_arn, seq),
            topic_arn: topic_arn.to_string(),
            protocol,
            endpoint: endpoint.to_string(),
            status,
            confirmation_token,
            created_at: Utc::now(),
            attributes: HashMap::new(),
        };

        state
            .by_topic
            .entry(sub.topic_arn.clone())
            .or_default()
            .push(sub.subscription_arn.clone());
        state
            .by_arn
            .insert(sub.subscription_arn.clone(), sub.clone());

        Ok(sub)
    }

    pub fn get_by_arn(
        &self,
        subscription_arn: &str,
    ) -> Option<Subscription> {
        self.state.read().by_arn.get(subscription_arn).cloned()
    }

    /// Copy of the topic's bucket.
    pub fn get_by_topic(
        &self,
        topic_arn: &str,
    ) -> Vec<Subscription> {
        let state = self.state.read();
        state
            .by_topic
            .get(topic_arn)
            .map(|arns| {
                arns.iter()
                    .filter_map(|arn| state.by_arn.get(arn).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn list_all(&self) -> Vec<Subscription> {
        self.state.read().by_arn.values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.state.read().by_arn.len()
    }

    /// Removes the subscription from the primary map and its topic bucket.
    pub fn delete(
        &self,
        subscription_arn: &str,
    ) -> RegistryResult<Subscription> {
        let mut state = self.state.write();

        let sub = state
            .by_arn
            .remove(subscription_arn)
            .ok_or_else(|| RegistryError::subscription_not_found(subscription_arn))?;

        if let Some(bucket) = state.by_topic.get_mut(&sub.topic_arn) {
            if let Some(pos) = bucket.iter().position(|arn| arn == subscription_arn) {
                bucket.swap_remove(pos);
            }
            if bucket.is_empty() {
                state.by_topic.remove(&sub.topic_arn);
            }
        }

        Ok(sub)
    }

    /// Moves a subscription to `confirmed` and burns its token.
    ///
    /// # Errors
    /// - `SubscriptionNotFound` if absent.
    /// - `InvalidToken` if `token` differs from the stored one. Once confirmed
    ///   the stored token is empty, so repeating the call fails.
    pub fn confirm(
        &self,
        subscription_arn: &str,
        token: &str,
    ) -> RegistryResult<Subscription> {
        let mut state = self.state.write();
        let sub = state
            .by_arn
            .get_mut(subscription_arn)
            .ok_or_else(|| RegistryError::subscription_not_found(subscription_arn))?;

        if sub.confirmation_token.is_empty() || sub.confirmation_token != token {
            return Err(RegistryError::InvalidToken);
        }

        sub.status = SubscriptionStatus::Confirmed;
        sub.confirmation_token.clear();
        Ok(sub.clone())
    }

    /// Current confirmation token; empty once confirmed.
    pub fn confirmation_token(
        &self,
        subscription_arn: &str,
    ) -> RegistryResult<String> {
        self.state
            .read()
            .by_arn
            .get(subscription_arn)
            .map(|sub| sub.confirmation_token.clone())
            .ok_or_else(|| RegistryError::subscription_not_found(subscription_arn))
    }

    pub fn set_attribute(
        &self,
        subscription_arn: &str,
        key: &str,
        value: &str,
    ) -> RegistryResult<()> {
        let mut state = self.state.write();
        let sub = state
            .by_arn
            .get_mut(subscription_arn)
            .ok_or_else(|| RegistryError::subscription_not_found(subscription_arn))?;
        sub.attributes.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn get_attributes(
        &self,
        subscription_arn: &str,
    ) -> RegistryResult<HashMap<String, String>> {
        self.state
            .read()
            .by_arn
            .get(subscription_arn)
            .map(|sub| sub.attributes.clone())
            .ok_or_else(|| RegistryError::subscription_not_found(subscription_arn))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations
////////////////////////////////////////////////////////////////////////////////

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(ArnScope::default())
    }
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Queue => "queue",
            Self::Email => "email",
            Self::Function => "function",
        }
    }
}

/// Accepts the names client SDKs send as well as the internal ones.
impl FromStr for Protocol {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" | "https" => Ok(Self::Http),
            "sqs" | "queue" => Ok(Self::Queue),
            "email" | "email-json" => Ok(Self::Email),
            "lambda" | "function" => Ok(Self::Function),
            other => Err(RegistryError::InvalidProtocol {
                protocol: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Unsubscribed => "unsubscribed",
        };
        f.write_str(s)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
