use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};

use serde_json::json;
use snsim_error::{RegistryError, RegistryResult};
use tokio_util::sync::CancellationToken;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::{Message, MessageAttributes};
use crate::{
    activity::{ActivityLog, ActivityStatus, EventType},
    application::DeliveryPort,
    registry::SubscriptionRegistry,
};

/// Error text recorded for deliveries that could not be scheduled.
pub const NO_RUNTIME: &str = "no tokio runtime available, delivery skipped";

/// Fans a message out to every confirmed subscription of its topic.
///
/// Each delivery runs in its own task. `publish` returns as soon as the tasks
/// are spawned; delivery outcomes only show up in the activity log.
pub struct Publisher {
    subscriptions: Arc<SubscriptionRegistry>,
    delivery: Arc<dyn DeliveryPort>,
    activity: Arc<ActivityLog>,
    shutdown: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter when a delivery task ends, even if it
/// panicked.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Publisher {
    pub fn new(
        subscriptions: Arc<SubscriptionRegistry>,
        delivery: Arc<dyn DeliveryPort>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            subscriptions,
            delivery,
            activity,
            shutdown: CancellationToken::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publishes `body` to `topic_arn` and returns the new message id.
    ///
    /// Does not check that the topic exists. Deliveries are spawned on the
    /// current tokio runtime; without one they are recorded as failed
    /// `delivery_error` entries and the message id is still returned.
    pub fn publish(
        &self,
        topic_arn: &str,
        subject: Option<String>,
        body: &str,
        attributes: MessageAttributes,
    ) -> RegistryResult<String> {
        if topic_arn.is_empty() {
            return Err(RegistryError::MissingField { field: "TopicArn" });
        }

        let start = Instant::now();
        let message = Arc::new(Message::new(topic_arn, subject, body, attributes));

        let subscriptions = self.subscriptions.get_by_topic(topic_arn);
        let total = subscriptions.len();
        let confirmed: Vec<_> = subscriptions
            .into_iter()
            .filter(|sub| sub.is_confirmed())
            .collect();
        let confirmed_count = confirmed.len();

        let mut skipped = 0usize;
        match Handle::try_current() {
            Ok(runtime) => {
                for subscription in confirmed {
                    let delivery = self.delivery.clone();
                    let message = message.clone();
                    let cancel = self.shutdown.child_token();

                    self.in_flight.fetch_add(1, Ordering::AcqRel);
                    let guard = InFlightGuard(self.in_flight.clone());

                    runtime.spawn(async move {
                        let _guard = guard;
                        delivery.deliver(message, subscription, cancel).await;
                    });
                }
            }
            Err(_) => {
                // Nothing to run the deliveries on; record each one as failed.
                for subscription in confirmed {
                    self.activity.log_error(
                        EventType::DeliveryError,
                        topic_arn,
                        &message.message_id,
                        &NO_RUNTIME,
                        HashMap::from([
                            (
                                "subscription_arn".to_string(),
                                json!(subscription.subscription_arn),
                            ),
                            ("protocol".to_string(), json!(subscription.protocol)),
                            ("endpoint".to_string(), json!(subscription.endpoint)),
                        ]),
                    );
                    skipped += 1;
                }
                if skipped > 0 {
                    warn!(
                        message_id = %message.message_id,
                        topic_arn,
                        skipped,
                        "no tokio runtime, deliveries skipped"
                    );
                }
            }
        }

        let mut details = HashMap::new();
        details.insert("message_id".to_string(), json!(message.message_id));
        details.insert("subscriptions".to_string(), json!(total));
        details.insert("confirmed_subs".to_string(), json!(confirmed_count));
        details.insert("subject".to_string(), json!(message.subject_str()));
        details.insert("message_length".to_string(), json!(message.body.len()));
        details.insert("skipped".to_string(), json!(skipped));

        self.activity.log_with_duration(
            EventType::Publish,
            topic_arn,
            ActivityStatus::Success,
            details,
            start.elapsed(),
        );

        debug!(
            message_id = %message.message_id,
            topic_arn,
            subscriptions = total,
            confirmed_subs = confirmed_count,
            "message published"
        );

        Ok(message.message_id.clone())
    }

    /// Number of delivery tasks still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Cancels every in-flight delivery. Publishing afterwards still spawns
    /// deliveries, but they are cancelled on their first wait.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
