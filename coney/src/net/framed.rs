use bytes::{Buf, BytesMut};
use coney_wire::types::AmqpChannelId;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::api::error::Error;
use crate::frame::Frame;

type Result<T> = std::result::Result<T, Error>;

const READ_BUFFER_SIZE: usize = 8192;

/// Decoding half of a bound transport.
pub(crate) struct FrameReader<R> {
    stream: R,
    buffer: BytesMut,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Read until the buffer holds a complete frame, then decode it.
    pub async fn read_frame(&mut self) -> Result<(AmqpChannelId, Frame)> {
        loop {
            if let Some((consumed, channel, frame)) = Frame::decode(&self.buffer)? {
                self.buffer.advance(consumed);
                trace!(channel, ?frame, "recv");
                return Ok((channel, frame));
            }
            let read = self.stream.read_buf(&mut self.buffer).await?;
            if read == 0 {
                return Err(if self.buffer.is_empty() {
                    Error::ConnectionError("connection closed by peer".to_owned())
                } else {
                    Error::ConnectionError("connection closed mid-frame".to_owned())
                });
            }
        }
    }
}

/// Encoding half of a bound transport.
///
/// The scratch buffer is reused across writes; a whole frame group is
/// encoded into it and flushed in one `write_all`, which is what keeps a
/// publish's frames contiguous on the wire.
pub(crate) struct FrameWriter<W> {
    stream: W,
    buffer: BytesMut,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(stream: W, frame_max: u32) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(frame_max as usize),
        }
    }

    /// Encode and write `frames` back to back, returning the bytes put on
    /// the wire.
    pub async fn write_frames(&mut self, channel: AmqpChannelId, frames: &[Frame]) -> Result<usize> {
        for frame in frames {
            trace!(channel, ?frame, "sent");
            frame.encode(channel, &mut self.buffer)?;
        }
        self.stream.write_all(&self.buffer).await?;

        let written = self.buffer.len();
        self.buffer.advance(written);
        Ok(written)
    }
}
