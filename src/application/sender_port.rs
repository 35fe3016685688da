//! Port implemented by every protocol-specific sender.

use async_trait::async_trait;
use snsim_error::DeliveryResult;
use tokio_util::sync::CancellationToken;

use crate::{pubsub::Message, registry::Subscription};

#[async_trait]
pub trait ProtocolSender: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Sends `message` to the subscription's endpoint, retrying if the
    /// protocol supports it.
    async fn send(
        &self,
        message: &Message,
        subscription: &Subscription,
        cancel: &CancellationToken,
    ) -> DeliveryResult<()>;
}
