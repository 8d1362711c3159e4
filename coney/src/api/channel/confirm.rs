//! Confirm-class operations (RabbitMQ publisher confirms).

use tokio::sync::oneshot;

use crate::api::error::{Error, Result};
use crate::frame::{Frame, Select};

use super::{Channel, DispatcherCommand, RpcReply};

/// Arguments for [`Channel::confirm_select`].
#[derive(Debug, Clone, Default)]
pub struct ConfirmSelectArguments {
    pub no_wait: bool,
}

impl ConfirmSelectArguments {
    pub fn new(no_wait: bool) -> Self {
        Self { no_wait }
    }
}

impl Channel {
    /// Put the channel into confirm mode; irreversible for the channel's
    /// lifetime. Delivery tags start at 1 with the first publish after
    /// this resolves.
    ///
    /// See [RabbitMQ confirms](https://www.rabbitmq.com/confirms.html#publisher-confirms).
    pub async fn confirm_select(&self, args: ConfirmSelectArguments) -> Result<()> {
        if !self.is_open() {
            return Err(Error::ChannelClosed);
        }
        let select = Select::new(args.no_wait);

        if args.no_wait {
            self.command(DispatcherCommand::ConfirmSelect {
                frames: vec![select.into_frame()],
                responder: None,
            })
            .await
        } else {
            let (responder, rx) = oneshot::channel();
            self.command(DispatcherCommand::ConfirmSelect {
                frames: vec![select.into_frame()],
                responder: Some(responder),
            })
            .await?;
            match rx.await.map_err(|_| Error::ChannelClosed)?? {
                RpcReply::Method(Frame::SelectOk(..)) => Ok(()),
                other => Err(Error::ProtocolError(format!(
                    "unexpected reply {:?}",
                    other
                ))),
            }
        }
    }
}
