use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    header::{CONTENT_TYPE, USER_AGENT},
    Client,
};
use snsim_error::{DeliveryError, DeliveryResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::RetryPolicy;
use crate::{
    activity::{ActivityLog, ActivityStatus, DeliveryRecord},
    application::ProtocolSender,
    pubsub::Message,
    registry::Subscription,
};

pub const HEADER_MESSAGE_TYPE: &str = "X-Amz-Sns-Message-Type";
pub const HEADER_TOPIC_ARN: &str = "X-Amz-Sns-Topic-Arn";
pub const HEADER_MESSAGE_ID: &str = "X-Amz-Sns-Message-Id";

/// Posts the notification JSON to HTTP endpoints, retrying transient
/// failures with exponential backoff.
pub struct HttpSender {
    client: Client,
    policy: RetryPolicy,
    enabled: bool,
    activity: Arc<ActivityLog>,
    user_agent: String,
}

impl HttpSender {
    pub fn new(
        client: Client,
        policy: RetryPolicy,
        enabled: bool,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            client,
            policy,
            enabled,
            activity,
            user_agent: format!("snsim/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// One POST. Non-2xx answers are classified by status.
    async fn attempt(
        &self,
        payload: &str,
        message: &Message,
        subscription: &Subscription,
    ) -> DeliveryResult<()> {
        let response = self
            .client
            .post(&subscription.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .header(HEADER_MESSAGE_TYPE, "Notification")
            .header(HEADER_TOPIC_ARN, &message.topic_arn)
            .header(HEADER_MESSAGE_ID, &message.message_id)
            .body(payload.to_owned())
            .send()
            .await
            .map_err(DeliveryError::transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::from_status(status.as_u16(), &body))
    }

    fn log_retry(
        &self,
        message: &Message,
        subscription: &Subscription,
        attempt: u32,
        backoff: std::time::Duration,
    ) {
        self.activity.log_delivery(DeliveryRecord {
            topic_arn: message.topic_arn.clone(),
            message_id: message.message_id.clone(),
            subscription_arn: subscription.subscription_arn.clone(),
            protocol: subscription.protocol,
            endpoint: subscription.endpoint.clone(),
            status: ActivityStatus::Retrying,
            duration: backoff,
            error: Some(format!(
                "retry attempt {attempt}/{}",
                self.policy.max_retries
            )),
        });
    }
}

#[async_trait]
impl ProtocolSender for HttpSender {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(
        &self,
        message: &Message,
        subscription: &Subscription,
        cancel: &CancellationToken,
    ) -> DeliveryResult<()> {
        if !self.enabled {
            info!(
                message_id = %message.message_id,
                endpoint = %subscription.endpoint,
                "HTTP delivery skipped (disabled in config)"
            );
            return Ok(());
        }

        let payload = message.to_notification_json()?;
        let max_attempts = self.policy.max_attempts();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let backoff = self.policy.backoff(attempt);
                debug!(
                    message_id = %message.message_id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "retrying HTTP delivery"
                );
                self.log_retry(message, subscription, attempt, backoff);

                tokio::select! {
                    _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
                result = self.attempt(&payload, message, subscription) => result,
            };

            match result {
                Ok(()) => {
                    if attempt > 0 {
                        info!(
                            message_id = %message.message_id,
                            attempts = attempt + 1,
                            "HTTP delivery succeeded after retries"
                        );
                    }
                    return Ok(());
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        message_id = %message.message_id,
                        endpoint = %subscription.endpoint,
                        attempt = attempt + 1,
                        error = %e,
                        "HTTP delivery attempt failed"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(
                        message_id = %message.message_id,
                        endpoint = %subscription.endpoint,
                        error = %e,
                        "HTTP delivery failed with non-retryable error"
                    );
                    return Err(e);
                }
            }
        }

        // max_attempts is at least one, so a transient error was recorded.
        let last = last_error.unwrap_or_else(|| DeliveryError::transport("no attempt made"));
        Err(DeliveryError::Exhausted {
            attempts: max_attempts,
            last: Box::new(last),
        })
    }
}
