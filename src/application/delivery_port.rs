//! Port through which the publisher hands one message to one subscription.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{pubsub::Message, registry::Subscription};

#[async_trait]
pub trait DeliveryPort: Send + Sync {
    /// Delivers `message` to `subscription` and records the outcome.
    ///
    /// Never returns an error to the caller. `cancel` aborts retry waits and
    /// in-flight requests.
    async fn deliver(
        &self,
        message: Arc<Message>,
        subscription: Subscription,
        cancel: CancellationToken,
    );
}
