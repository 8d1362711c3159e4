use std::collections::BTreeMap;

use coney_wire::types::AmqpChannelId;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::frame::{CloseOk, Frame};

use super::{
    ChannelIdRepository, ConnManagementCommand, FrameReader, OutgoingMessage, RegisterChannel,
};

/// Channel 0 carries connection-class traffic and heartbeats.
const CONTROL_CHANNEL: AmqpChannelId = 0;

/// Registry of live channels, owned by the reader task.
struct ChannelRegistry {
    id_repo: ChannelIdRepository,
    dispatchers: BTreeMap<AmqpChannelId, mpsc::Sender<Frame>>,
}

impl ChannelRegistry {
    fn new(channel_max: u16) -> Self {
        Self {
            id_repo: ChannelIdRepository::new(channel_max),
            dispatchers: BTreeMap::new(),
        }
    }

    fn register(
        &mut self,
        channel_id: Option<AmqpChannelId>,
        dispatcher_tx: mpsc::Sender<Frame>,
    ) -> Option<AmqpChannelId> {
        let id = match channel_id {
            Some(id) => {
                if !self.id_repo.reserve(id) {
                    return None;
                }
                id
            }
            None => self.id_repo.allocate()?,
        };
        let replaced = self.dispatchers.insert(id, dispatcher_tx);
        debug_assert!(replaced.is_none(), "id allocator handed out a live id");
        Some(id)
    }

    fn deregister(&mut self, id: AmqpChannelId) {
        if self.dispatchers.remove(&id).is_some() {
            self.id_repo.release(id);
        }
    }

    fn dispatcher(&self, id: AmqpChannelId) -> Option<&mpsc::Sender<Frame>> {
        self.dispatchers.get(&id)
    }
}

/// Reads frames off the transport and routes them to per-channel
/// dispatcher inboxes.
///
/// When this task exits every dispatcher inbox sender drops with it, which
/// is how connection loss reaches the channels: each dispatcher sees its
/// inbox close and tears down with a connection error.
pub(crate) struct ReaderHandler<R> {
    stream: FrameReader<R>,
    outgoing_tx: mpsc::Sender<OutgoingMessage>,
    conn_mgmt_rx: mpsc::Receiver<ConnManagementCommand>,
    registry: ChannelRegistry,
}

impl<R> ReaderHandler<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        stream: FrameReader<R>,
        outgoing_tx: mpsc::Sender<OutgoingMessage>,
        conn_mgmt_rx: mpsc::Receiver<ConnManagementCommand>,
        channel_max: u16,
    ) -> Self {
        Self {
            stream,
            outgoing_tx,
            conn_mgmt_rx,
            registry: ChannelRegistry::new(channel_max),
        }
    }

    /// Returns false when the engine should stop.
    fn handle_command(&mut self, command: ConnManagementCommand) -> bool {
        match command {
            ConnManagementCommand::RegisterChannel(RegisterChannel {
                channel_id,
                dispatcher_tx,
                acker,
            }) => {
                let id = self.registry.register(channel_id, dispatcher_tx);
                if acker.send(id).is_err() {
                    // requester gave up; do not leak the id
                    if let Some(id) = id {
                        self.registry.deregister(id);
                    }
                }
                true
            }
            ConnManagementCommand::DeregisterChannel(id) => {
                self.registry.deregister(id);
                true
            }
            ConnManagementCommand::Shutdown => false,
        }
    }

    /// Returns false when the connection is done and the task should exit.
    async fn handle_frame(&mut self, channel: AmqpChannelId, frame: Frame) -> bool {
        if channel == CONTROL_CHANNEL {
            return self.handle_control_frame(frame).await;
        }
        match self.registry.dispatcher(channel) {
            Some(dispatcher) => {
                if dispatcher.send(frame).await.is_err() {
                    warn!(channel, "dispatcher gone, frame discarded");
                }
            }
            None => {
                warn!(channel, ?frame, "frame for unregistered channel discarded");
            }
        }
        true
    }

    async fn handle_control_frame(&mut self, frame: Frame) -> bool {
        match frame {
            Frame::Heartbeat(_) => {
                // heartbeat policy lives with the transport owner
                trace!("heartbeat observed");
                true
            }
            Frame::Close(_, close) => {
                info!(
                    reply_code = close.reply_code,
                    reply_text = %close.reply_text,
                    "server closed the connection"
                );
                if self
                    .outgoing_tx
                    .send((CONTROL_CHANNEL, vec![CloseOk.into_frame()]))
                    .await
                    .is_err()
                {
                    warn!("writer already gone, close-ok not sent");
                }
                false
            }
            Frame::CloseOk(..) => false,
            other => {
                warn!(?other, "control-channel frame outside engine scope discarded");
                true
            }
        }
    }

    pub async fn run_until_shutdown(mut self) {
        loop {
            tokio::select! {
                biased;

                command = self.conn_mgmt_rx.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command) {
                                break;
                            }
                        }
                        // all connection/channel handles dropped
                        None => break,
                    }
                }
                frame = self.stream.read_frame() => {
                    match frame {
                        Ok((channel, frame)) => {
                            if !self.handle_frame(channel, frame).await {
                                break;
                            }
                        }
                        Err(err) => {
                            error!(%err, "failed to read frame");
                            break;
                        }
                    }
                }
            }
        }
        debug!("reader handler exits");
    }
}
