//! Transport plumbing: framed stream halves, the reader and writer tasks,
//! and the channel-id allocator.

mod channel_id_repo;
mod framed;
mod reader_handler;
mod writer_handler;

pub(crate) use channel_id_repo::ChannelIdRepository;
pub(crate) use framed::{FrameReader, FrameWriter};
pub(crate) use reader_handler::ReaderHandler;
pub(crate) use writer_handler::WriterHandler;

use coney_wire::types::AmqpChannelId;
use tokio::sync::{mpsc, oneshot};

use crate::frame::Frame;

/// A contiguous group of frames bound for one channel.
///
/// The writer task encodes and writes a whole group before touching the
/// next message, so a publish's method/header/body frames can never be
/// interleaved with other traffic on the same channel.
pub(crate) type OutgoingMessage = (AmqpChannelId, Vec<Frame>);

/// Registration commands handled by the reader task, which owns the
/// channel registry.
pub(crate) enum ConnManagementCommand {
    RegisterChannel(RegisterChannel),
    DeregisterChannel(AmqpChannelId),
    /// Stop the engine: the reader exits, dropping every dispatcher inbox.
    Shutdown,
}

pub(crate) struct RegisterChannel {
    /// `None` lets the registry pick a free id.
    pub channel_id: Option<AmqpChannelId>,
    /// Inbox of the channel's dispatcher task.
    pub dispatcher_tx: mpsc::Sender<Frame>,
    /// Acknowledged with the assigned id, or `None` when exhausted/taken.
    pub acker: oneshot::Sender<Option<AmqpChannelId>>,
}
