//! The connection engine: binds a negotiated transport and multiplexes
//! channels over it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use coney_wire::types::{AmqpChannelId, LongUint, ShortUint};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use crate::frame::{Frame, OpenChannel};
use crate::net::{
    ConnManagementCommand, FrameReader, FrameWriter, OutgoingMessage, ReaderHandler,
    RegisterChannel, WriterHandler,
};

use super::callbacks::DefaultChannelCallback;
use super::channel::{Channel, ChannelDispatcher, RpcKind, RpcReply};
use super::error::{Error, Result};
use super::impl_chainable_setter;

const OUTGOING_BUFFER_SIZE: usize = 256;
const MANAGEMENT_BUFFER_SIZE: usize = 16;
const DISPATCHER_FRAME_BUFFER_SIZE: usize = 256;
const DISPATCHER_COMMAND_BUFFER_SIZE: usize = 64;

/// RabbitMQ's default negotiated frame size.
const DEFAULT_FRAME_MAX: LongUint = 131_072;
const DEFAULT_CHANNEL_MAX: ShortUint = 2047;

/// Parameters a finished handshake has already negotiated.
///
/// See [`Connection::bind`].
#[derive(Debug, Clone)]
pub struct ConnectionArguments {
    /// Largest whole frame (envelope included) either peer may send.
    pub frame_max: LongUint,
    /// Highest usable channel id.
    pub channel_max: ShortUint,
}

impl Default for ConnectionArguments {
    fn default() -> Self {
        Self {
            frame_max: DEFAULT_FRAME_MAX,
            channel_max: DEFAULT_CHANNEL_MAX,
        }
    }
}

impl ConnectionArguments {
    pub fn new() -> Self {
        Self::default()
    }

    impl_chainable_setter! {
        frame_max, LongUint
    }
    impl_chainable_setter! {
        channel_max, ShortUint
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

struct ConnectionShared {
    outgoing_tx: mpsc::Sender<OutgoingMessage>,
    conn_mgmt_tx: mpsc::Sender<ConnManagementCommand>,
    frame_max: LongUint,
    channel_max: ShortUint,
    is_open: AtomicBool,
}

/// Handle to a bound connection engine.
///
/// The engine does not perform the AMQP handshake: callers hand over a
/// transport whose protocol header, Start/Tune/Open negotiation, and
/// authentication are already done, together with the negotiated limits.
/// Heartbeat emission and reconnection likewise stay with the transport
/// owner; inbound heartbeats are observed and dropped.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<ConnectionShared>,
}

impl Connection {
    /// Spawn the reader and writer tasks over `stream` and return the
    /// engine handle.
    pub fn bind<S>(stream: S, args: ConnectionArguments) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_BUFFER_SIZE);
        let (conn_mgmt_tx, conn_mgmt_rx) = mpsc::channel(MANAGEMENT_BUFFER_SIZE);

        tokio::spawn(
            ReaderHandler::new(
                FrameReader::new(reader),
                outgoing_tx.clone(),
                conn_mgmt_rx,
                args.channel_max,
            )
            .run_until_shutdown(),
        );
        tokio::spawn(
            WriterHandler::new(FrameWriter::new(writer, args.frame_max), outgoing_rx)
                .run_until_shutdown(),
        );

        Self {
            shared: Arc::new(ConnectionShared {
                outgoing_tx,
                conn_mgmt_tx,
                frame_max: args.frame_max,
                channel_max: args.channel_max,
                is_open: AtomicBool::new(true),
            }),
        }
    }

    pub fn frame_max(&self) -> LongUint {
        self.shared.frame_max
    }

    pub fn channel_max(&self) -> ShortUint {
        self.shared.channel_max
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open.load(Ordering::SeqCst)
    }

    /// Open a channel, optionally claiming a specific id.
    ///
    /// Registers the channel with the reader, spawns its dispatcher, and
    /// completes the `channel.open` handshake through the ordinary RPC
    /// engine.
    pub async fn open_channel(&self, channel_id: Option<AmqpChannelId>) -> Result<Channel> {
        if !self.is_open() {
            return Err(Error::ConnectionError(
                "connection engine is shut down".to_owned(),
            ));
        }

        let (dispatcher_tx, frame_rx) = mpsc::channel(DISPATCHER_FRAME_BUFFER_SIZE);
        let (acker, acked) = oneshot::channel();
        self.shared
            .conn_mgmt_tx
            .send(ConnManagementCommand::RegisterChannel(RegisterChannel {
                channel_id,
                dispatcher_tx,
                acker,
            }))
            .await
            .map_err(|_| Error::ConnectionError("connection lost".to_owned()))?;
        let id = acked
            .await
            .map_err(|_| Error::ConnectionError("connection lost".to_owned()))?
            .ok_or_else(|| {
                Error::ConnectionError("channel id unavailable or exhausted".to_owned())
            })?;

        let (command_tx, command_rx) = mpsc::channel(DISPATCHER_COMMAND_BUFFER_SIZE);
        let (channel, shared) = Channel::new(id, self.shared.frame_max, command_tx);
        ChannelDispatcher::new(
            shared,
            self.shared.outgoing_tx.clone(),
            self.shared.conn_mgmt_tx.clone(),
            command_rx,
            frame_rx,
            Box::new(DefaultChannelCallback),
        )
        .spawn();

        match channel
            .rpc(vec![OpenChannel::default().into_frame()], RpcKind::Method)
            .await?
        {
            RpcReply::Method(Frame::OpenChannelOk(..)) => Ok(channel),
            other => Err(Error::ProtocolError(format!(
                "unexpected reply to channel.open: {:?}",
                other
            ))),
        }
    }

    /// Stop the engine.
    ///
    /// Channels still open fail their pending work with a connection
    /// error; close them first for a graceful exit. The connection-class
    /// close handshake, if desired, is the transport owner's business
    /// before calling this.
    pub async fn shutdown(self) {
        if self.shared.is_open.swap(false, Ordering::SeqCst) {
            let _ = self
                .shared
                .conn_mgmt_tx
                .send(ConnManagementCommand::Shutdown)
                .await;
        }
    }
}
