use async_trait::async_trait;
use snsim_error::DeliveryResult;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{application::ProtocolSender, pubsub::Message, registry::Subscription};

/// Stands in for protocols with no local target (email, function). Logs the
/// payload and always succeeds.
#[derive(Debug, Default)]
pub struct SimulatedSender;

#[async_trait]
impl ProtocolSender for SimulatedSender {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn send(
        &self,
        message: &Message,
        subscription: &Subscription,
        _cancel: &CancellationToken,
    ) -> DeliveryResult<()> {
        info!(
            protocol = %subscription.protocol,
            endpoint = %subscription.endpoint,
            message_id = %message.message_id,
            subject = message.subject_str(),
            message = %message.body,
            "simulated delivery"
        );
        Ok(())
    }
}
