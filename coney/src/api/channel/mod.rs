//! The channel handle and the command protocol it shares with its
//! dispatcher task.
//!
//! A [`Channel`] is a cheap clone over shared state; all mutable channel
//! state (pending RPCs, consumers, unconfirmed publishes, content
//! assembly) lives in the dispatcher task. Every outbound frame flows
//! through the dispatcher's command inbox, which is what makes responder
//! registration order equal write order and keeps publish frame groups
//! contiguous.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use coney_wire::types::{AmqpChannelId, AmqpDeliveryTag, LongUint};
use tokio::sync::{mpsc, oneshot};

use crate::frame::{
    BasicProperties, CloseChannel, Deliver, Flow, Frame, GetOk, Return,
};

use super::callbacks::ChannelCallback;
use super::consumer::Consumer;
use super::error::{Error, Result};
use super::synchronous_request;

mod basic;
mod confirm;
mod dispatcher;
mod exchange;
mod queue;
mod tx;

pub use basic::*;
pub use confirm::*;
pub use exchange::*;
pub use queue::*;
pub use tx::*;

pub(crate) use dispatcher::ChannelDispatcher;

/// A message pushed to a consumer by `basic.deliver`.
#[derive(Debug)]
pub struct Delivery {
    pub deliver: Deliver,
    pub properties: BasicProperties,
    pub content: Vec<u8>,
}

/// A message pulled with `basic.get`.
#[derive(Debug)]
pub struct GetMessage {
    pub get_ok: GetOk,
    pub properties: BasicProperties,
    pub content: Vec<u8>,
}

/// An unroutable mandatory publish handed back by `basic.return`.
#[derive(Debug)]
pub struct ReturnedMessage {
    pub ret: Return,
    pub properties: BasicProperties,
    pub content: Vec<u8>,
}

/// What a pending RPC resolves with.
#[derive(Debug)]
pub(crate) enum RpcReply {
    Method(Frame),
    Get(Option<GetMessage>),
}

/// How the dispatcher must treat a pending RPC's reply.
pub(crate) enum RpcKind {
    /// Plain method call: the reply frame resolves the FIFO head.
    Method,
    /// `basic.get`: resolution is deferred until the content arrives (or
    /// `get-empty` resolves it with `None`).
    Get,
    /// `basic.consume`: the consumer registered under the provisional tag
    /// is rekeyed to the server tag before the reply resolves.
    Consume { provisional_tag: String },
    /// `channel.close`: the reply also tears the channel down.
    Close,
}

pub(crate) type RpcResponder = oneshot::Sender<Result<RpcReply>>;
pub(crate) type ConfirmResponder = oneshot::Sender<Result<Option<AmqpDeliveryTag>>>;

/// Commands from channel handles to the dispatcher task.
pub(crate) enum DispatcherCommand {
    /// Queue a responder FIFO, then write the frames.
    Rpc {
        frames: Vec<Frame>,
        kind: RpcKind,
        responder: RpcResponder,
    },
    /// Register the consumer under its provisional tag, then send
    /// `basic.consume`. `responder` is `None` for no-wait.
    Consume {
        frames: Vec<Frame>,
        provisional_tag: String,
        consumer: Box<dyn Consumer>,
        responder: Option<RpcResponder>,
    },
    /// Send `basic.cancel`. With no responder (no-wait) the consumer is
    /// retired immediately; otherwise `cancel-ok` retires it.
    Cancel {
        frames: Vec<Frame>,
        consumer_tag: String,
        responder: Option<RpcResponder>,
    },
    /// Send `confirm.select`. With no responder (no-wait) confirm mode
    /// starts immediately; otherwise `select-ok` starts it.
    ConfirmSelect {
        frames: Vec<Frame>,
        responder: Option<RpcResponder>,
    },
    /// Write a publish frame group. In confirm mode the dispatcher
    /// allocates the delivery tag and parks the responder until the
    /// matching ack/nack; otherwise it resolves once the group is handed
    /// to the socket funnel.
    Publish {
        frames: Vec<Frame>,
        responder: ConfirmResponder,
    },
    /// Fire-and-forget frames (ack/nack/reject, no-wait declarations).
    Send { frames: Vec<Frame> },
    RegisterCallback {
        callback: Box<dyn ChannelCallback>,
    },
}

/// Completion handle returned by `basic_publish`.
///
/// Outside confirm mode it resolves `Ok(None)` as soon as the frames are
/// handed to the socket funnel. In confirm mode it resolves
/// `Ok(Some(delivery_tag))` on `basic.ack` and
/// `Err(Error::PublishNacked(..))` on `basic.nack`. Dropping the handle
/// abandons the result without disturbing confirm tracking.
#[derive(Debug)]
pub struct PublishConfirm {
    rx: oneshot::Receiver<Result<Option<AmqpDeliveryTag>>>,
}

impl PublishConfirm {
    pub async fn wait(self) -> Result<Option<AmqpDeliveryTag>> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::ChannelClosed),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ChannelShared {
    channel_id: AmqpChannelId,
    frame_max: LongUint,
    is_open: AtomicBool,
    consumer_seq: AtomicU64,
}

/// Handle to one AMQP channel.
///
/// Clones share the same channel; keep one inside a consumer to ack from
/// the callback. Only `Open` channels accept operations; after `close`
/// (local or server-initiated) everything fails with
/// [`Error::ChannelClosed`].
#[derive(Clone, Debug)]
pub struct Channel {
    shared: Arc<ChannelShared>,
    command_tx: mpsc::Sender<DispatcherCommand>,
}

impl Channel {
    pub(crate) fn new(
        channel_id: AmqpChannelId,
        frame_max: LongUint,
        command_tx: mpsc::Sender<DispatcherCommand>,
    ) -> (Self, Arc<ChannelShared>) {
        let shared = Arc::new(ChannelShared {
            channel_id,
            frame_max,
            is_open: AtomicBool::new(true),
            consumer_seq: AtomicU64::new(0),
        });
        (
            Self {
                shared: shared.clone(),
                command_tx,
            },
            shared,
        )
    }

    pub fn channel_id(&self) -> AmqpChannelId {
        self.shared.channel_id
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open.load(Ordering::SeqCst)
    }

    pub(crate) fn frame_max(&self) -> LongUint {
        self.shared.frame_max
    }

    pub(crate) fn next_consumer_seq(&self) -> u64 {
        self.shared.consumer_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Hand a command to the dispatcher; a gone dispatcher means the
    /// channel is closed.
    pub(crate) async fn command(&self, command: DispatcherCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Issue a synchronous method and await its reply in FIFO order.
    pub(crate) async fn rpc(&self, frames: Vec<Frame>, kind: RpcKind) -> Result<RpcReply> {
        if !self.is_open() {
            return Err(Error::ChannelClosed);
        }
        let (responder, rx) = oneshot::channel();
        self.command(DispatcherCommand::Rpc {
            frames,
            kind,
            responder,
        })
        .await?;
        // a dropped responder means the dispatcher died before answering
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    /// Write frames with no reply expected; resolves once handed over.
    pub(crate) async fn send_nowait(&self, frames: Vec<Frame>) -> Result<()> {
        if !self.is_open() {
            return Err(Error::ChannelClosed);
        }
        self.command(DispatcherCommand::Send { frames }).await
    }

    /// Replace the channel callback.
    pub async fn register_callback<C>(&self, callback: C) -> Result<()>
    where
        C: ChannelCallback + 'static,
    {
        self.command(DispatcherCommand::RegisterCallback {
            callback: Box::new(callback),
        })
        .await
    }

    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#channel.flow).
    pub async fn flow(&self, active: bool) -> Result<bool> {
        let flow_ok = synchronous_request!(self, vec![Flow::new(active).into_frame()], Frame::FlowOk)?;
        Ok(flow_ok.active != 0)
    }

    /// Gracefully close the channel: sends `channel.close`, resolves on
    /// `close-ok`, and settles any remaining waiters with
    /// [`Error::ChannelClosed`].
    pub async fn close(self) -> Result<()> {
        if self.shared.is_open.swap(false, Ordering::SeqCst) {
            let (responder, rx) = oneshot::channel();
            let sent = self
                .command_tx
                .send(DispatcherCommand::Rpc {
                    frames: vec![CloseChannel::default().into_frame()],
                    kind: RpcKind::Close,
                    responder,
                })
                .await;
            if sent.is_err() {
                // dispatcher already gone: the channel is closed
                return Ok(());
            }
            match rx.await {
                Ok(Ok(_)) | Err(_) => Ok(()),
                Ok(Err(Error::ChannelClosed)) => Ok(()),
                Ok(Err(err)) => Err(err),
            }
        } else {
            Ok(())
        }
    }
}
