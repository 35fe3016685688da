use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use reqwest::Client;
use snsim_error::{ErrorExt, LogLevel};
use tokio_util::sync::CancellationToken;
use tracing::{debug, event, Level};

use super::{HttpSender, QueueSender, RetryPolicy, SimulatedSender};
use crate::{
    activity::{ActivityLog, ActivityStatus, DeliveryRecord},
    application::{DeliveryPort, ProtocolSender},
    config::Settings,
    pubsub::Message,
    registry::{Protocol, Subscription},
};

/// Routes each delivery to the sender for the subscription's protocol and
/// records the final outcome.
pub struct Deliverer {
    http: Arc<dyn ProtocolSender>,
    queue: Arc<dyn ProtocolSender>,
    simulated: Arc<dyn ProtocolSender>,
    activity: Arc<ActivityLog>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Deliverer {
    pub fn new(
        http: Arc<dyn ProtocolSender>,
        queue: Arc<dyn ProtocolSender>,
        simulated: Arc<dyn ProtocolSender>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            http,
            queue,
            simulated,
            activity,
        }
    }

    /// Builds the real senders over one shared HTTP client.
    pub fn from_settings(
        settings: &Settings,
        activity: Arc<ActivityLog>,
    ) -> reqwest::Result<Self> {
        let client = build_client(settings)?;

        let http = HttpSender::new(
            client.clone(),
            RetryPolicy::from(&settings.http),
            settings.http.enabled,
            activity.clone(),
        );
        let queue = QueueSender::new(client, &settings.queue.endpoint, settings.queue.enabled);

        Ok(Self::new(
            Arc::new(http),
            Arc::new(queue),
            Arc::new(SimulatedSender),
            activity,
        ))
    }

    fn sender_for(
        &self,
        protocol: Protocol,
    ) -> &Arc<dyn ProtocolSender> {
        match protocol {
            Protocol::Http => &self.http,
            Protocol::Queue => &self.queue,
            Protocol::Email | Protocol::Function => &self.simulated,
        }
    }
}

/// Shared client; the timeout applies to every request.
pub fn build_client(settings: &Settings) -> reqwest::Result<Client> {
    Client::builder().timeout(settings.http.timeout()).build()
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for Deliverer
////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl DeliveryPort for Deliverer {
    async fn deliver(
        &self,
        message: Arc<Message>,
        subscription: Subscription,
        cancel: CancellationToken,
    ) {
        if !subscription.is_confirmed() {
            debug!(
                subscription_arn = %subscription.subscription_arn,
                status = %subscription.status,
                "skipping delivery to non-confirmed subscription"
            );
            return;
        }

        let sender = self.sender_for(subscription.protocol);
        let start = Instant::now();
        let result = sender.send(&message, &subscription, &cancel).await;
        let duration = start.elapsed();

        let (status, error_text) = match &result {
            Ok(()) => (ActivityStatus::Success, None),
            Err(e) => (ActivityStatus::Failed, Some(e.to_string())),
        };

        self.activity.log_delivery(DeliveryRecord {
            topic_arn: message.topic_arn.clone(),
            message_id: message.message_id.clone(),
            subscription_arn: subscription.subscription_arn.clone(),
            protocol: subscription.protocol,
            endpoint: subscription.endpoint.clone(),
            status,
            duration,
            error: error_text,
        });

        match result {
            Ok(()) => debug!(
                message_id = %message.message_id,
                subscription_arn = %subscription.subscription_arn,
                sender = sender.name(),
                duration_ms = duration.as_millis() as u64,
                "message delivered successfully"
            ),
            Err(e) => {
                let tags = e.metrics_tags();
                macro_rules! delivery_failed {
                    ($level:expr) => {
                        event!(
                            $level,
                            message_id = %message.message_id,
                            subscription_arn = %subscription.subscription_arn,
                            protocol = %subscription.protocol,
                            endpoint = %subscription.endpoint,
                            error = %e,
                            tags = ?tags,
                            "message delivery failed"
                        )
                    };
                }
                match e.status_code().log_level() {
                    LogLevel::Trace => delivery_failed!(Level::TRACE),
                    LogLevel::Debug => delivery_failed!(Level::DEBUG),
                    LogLevel::Info => delivery_failed!(Level::INFO),
                    LogLevel::Warn => delivery_failed!(Level::WARN),
                    LogLevel::Error => delivery_failed!(Level::ERROR),
                }
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
