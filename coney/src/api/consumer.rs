use async_trait::async_trait;
use tracing::info;

use super::channel::Delivery;

/// Error type surfaced by consumer callbacks; routed to the channel
/// callback's error hook, never allowed to close the channel.
pub type ConsumerError = Box<dyn std::error::Error + Send>;

/// A subscription's message handler.
///
/// Both hooks run on the channel's dispatcher task, so a slow handler
/// stalls that channel's inbound traffic; offload long work. `on_cancel`
/// fires exactly once when the subscription ends, whether by client
/// cancel, server cancel, or channel teardown.
#[async_trait]
pub trait Consumer: Send {
    async fn on_message(&mut self, delivery: Delivery) -> Result<(), ConsumerError>;

    async fn on_cancel(&mut self) {}
}

/// Logs deliveries and drops them.
pub struct DefaultConsumer;

#[async_trait]
impl Consumer for DefaultConsumer {
    async fn on_message(&mut self, delivery: Delivery) -> Result<(), ConsumerError> {
        info!(
            consumer_tag = %delivery.deliver.consumer_tag,
            delivery_tag = delivery.deliver.delivery_tag,
            size = delivery.content.len(),
            "delivery discarded by default consumer"
        );
        Ok(())
    }
}
