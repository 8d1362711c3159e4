use async_trait::async_trait;
use tracing::{error, warn};

use super::channel::ReturnedMessage;
use super::consumer::ConsumerError;
use crate::frame::CloseChannel;

/// Channel-level notifications that have no awaiting future: server close,
/// flow control, returned mandatory publishes, and consumer failures.
///
/// Every hook has a logging default, so implementors override only what
/// they care about.
#[async_trait]
pub trait ChannelCallback: Send {
    /// Server is closing the channel; the close-ok reply and teardown
    /// happen after this returns.
    async fn close(&mut self, close: &CloseChannel) {
        error!(
            reply_code = close.reply_code,
            reply_text = %close.reply_text,
            "server closed channel"
        );
    }

    /// Server requests a flow change; the returned value is sent back in
    /// `flow-ok`.
    async fn flow(&mut self, active: bool) -> bool {
        warn!(active, "server flow request acknowledged as-is");
        active
    }

    /// An unroutable mandatory publish came back. Orthogonal to publisher
    /// confirms: the publish future settles via ack/nack regardless.
    async fn publish_return(&mut self, ret: ReturnedMessage) {
        warn!(
            reply_code = ret.ret.reply_code,
            reply_text = %ret.ret.reply_text,
            exchange = %ret.ret.exchange,
            routing_key = %ret.ret.routing_key,
            size = ret.content.len(),
            "message returned"
        );
    }

    /// A consumer's `on_message` failed. The channel stays up.
    async fn consumer_error(&mut self, consumer_tag: &str, error: ConsumerError) {
        error!(consumer_tag, %error, "consumer callback failed");
    }
}

/// Accepts every default hook.
pub struct DefaultChannelCallback;

#[async_trait]
impl ChannelCallback for DefaultChannelCallback {}
