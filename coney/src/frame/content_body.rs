use serde::Serialize;

use super::Frame;

/// One body frame's worth of message payload.
///
/// Bodies longer than the negotiated frame size travel as several of these
/// in a row; reassembly is the dispatcher's job.
#[derive(Debug, Serialize, Default)]
pub struct ContentBody {
    pub inner: Vec<u8>,
}

impl ContentBody {
    pub fn new(inner: Vec<u8>) -> Self {
        Self { inner }
    }

    pub fn into_frame(self) -> Frame {
        Frame::ContentBody(self)
    }
}
