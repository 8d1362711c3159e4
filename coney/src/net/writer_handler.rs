use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::{FrameWriter, OutgoingMessage};

/// Drains the outbound funnel onto the socket.
///
/// Exits when every sender half is gone or a write fails; a failed write
/// surfaces to the channels through the reader side going down with it.
pub(crate) struct WriterHandler<W> {
    stream: FrameWriter<W>,
    outgoing_rx: mpsc::Receiver<OutgoingMessage>,
}

impl<W> WriterHandler<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(stream: FrameWriter<W>, outgoing_rx: mpsc::Receiver<OutgoingMessage>) -> Self {
        Self {
            stream,
            outgoing_rx,
        }
    }

    pub async fn run_until_shutdown(mut self) {
        while let Some((channel, frames)) = self.outgoing_rx.recv().await {
            if let Err(err) = self.stream.write_frames(channel, &frames).await {
                error!(channel, %err, "failed to write frame group");
                break;
            }
        }
        debug!("writer handler exits");
    }
}
