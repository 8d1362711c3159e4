use serde::Serialize;

use super::Frame;

/// Heartbeat frame: empty payload on channel 0.
#[derive(Debug, Serialize, Default)]
pub struct Heartbeat;

impl Heartbeat {
    pub fn into_frame(self) -> Frame {
        Frame::Heartbeat(self)
    }
}
