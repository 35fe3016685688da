use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use snsim_error::{DeliveryError, DeliveryResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{application::ProtocolSender, pubsub::Message, registry::Subscription};

/// Hands notifications to the queue-service emulator with a single
/// `SendMessage` call. The subscription endpoint is the target queue URL.
pub struct QueueSender {
    client: Client,
    service_endpoint: String,
    enabled: bool,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    #[serde(rename = "MessageId")]
    message_id: String,
}

impl QueueSender {
    pub fn new(
        client: Client,
        service_endpoint: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            client,
            service_endpoint: service_endpoint.into(),
            enabled,
        }
    }

    async fn send_message(
        &self,
        payload: &str,
        queue_url: &str,
    ) -> DeliveryResult<Option<String>> {
        let form = [
            ("Action", "SendMessage"),
            ("QueueUrl", queue_url),
            ("MessageBody", payload),
        ];

        let response = self
            .client
            .post(&self.service_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| DeliveryError::Permanent {
                status: None,
                reason: format!("queue request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DeliveryError::Permanent {
                status: Some(status.as_u16()),
                reason: format!("queue endpoint returned status {}: {body}", status.as_u16()),
            });
        }

        Ok(serde_json::from_str::<SendMessageResponse>(&body)
            .ok()
            .map(|r| r.message_id))
    }
}

#[async_trait]
impl ProtocolSender for QueueSender {
    fn name(&self) -> &'static str {
        "queue"
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
                queue_url = %subscription.endpoint,
                "queue delivery skipped (disabled in config)"
            );
            return Ok(());
        }

        let payload = message.to_notification_json()?;

        let queue_message_id = tokio::select! {
            _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
            result = self.send_message(&payload, &subscription.endpoint) => result?,
        };

        match queue_message_id {
            Some(id) => debug!(
                message_id = %message.message_id,
                queue_message_id = %id,
                "queue delivery successful"
            ),
            None => debug!(
                message_id = %message.message_id,
                "queue delivery successful (could not parse response)"
            ),
        }
        Ok(())
    }
}
