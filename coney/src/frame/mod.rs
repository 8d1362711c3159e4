//! AMQP frame layer: envelope codec and typed method payloads.
//!
//! A frame is `type:u8 | channel:u16 | size:u32 | payload | 0xCE`. Method
//! payloads open with a class/method id pair; content header and body
//! frames carry a publish or delivery's properties and bytes; heartbeats
//! are empty.

use bytes::BytesMut;
use coney_wire::constants::{
    FRAME_BODY, FRAME_END, FRAME_HEADER, FRAME_HEADER_SIZE, FRAME_HEARTBEAT, FRAME_METHOD,
    FRAME_OVERHEAD,
};
use coney_wire::types::{AmqpChannelId, LongUint, Octet};
use coney_wire::{from_bytes, to_buffer};
use serde::{Deserialize, Serialize};

mod content_body;
mod content_header;
mod error;
mod heartbeat;
mod method;

pub use content_body::*;
pub use content_header::*;
pub use error::*;
pub use heartbeat::*;
pub use method::*;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct FrameHeader {
    pub frame_type: Octet,
    pub channel: AmqpChannelId,
    pub payload_size: LongUint,
}

/// A decoded frame payload.
///
/// Only the payload is wrapped; the channel id travels beside the frame so
/// one type serves every channel. Method variants pair the static header
/// with the method struct, which lets serialization emit the id words and
/// decoding match on them without a second table.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Frame {
    // connection class (close pair only; the handshake happens before bind)
    Close(&'static MethodHeader, Close),
    CloseOk(&'static MethodHeader, CloseOk),

    // channel class
    OpenChannel(&'static MethodHeader, OpenChannel),
    OpenChannelOk(&'static MethodHeader, OpenChannelOk),
    Flow(&'static MethodHeader, Flow),
    FlowOk(&'static MethodHeader, FlowOk),
    CloseChannel(&'static MethodHeader, CloseChannel),
    CloseChannelOk(&'static MethodHeader, CloseChannelOk),

    // exchange class
    Declare(&'static MethodHeader, Declare),
    DeclareOk(&'static MethodHeader, DeclareOk),
    Delete(&'static MethodHeader, Delete),
    DeleteOk(&'static MethodHeader, DeleteOk),
    Bind(&'static MethodHeader, Bind),
    BindOk(&'static MethodHeader, BindOk),
    Unbind(&'static MethodHeader, Unbind),
    UnbindOk(&'static MethodHeader, UnbindOk),

    // queue class
    DeclareQueue(&'static MethodHeader, DeclareQueue),
    DeclareQueueOk(&'static MethodHeader, DeclareQueueOk),
    BindQueue(&'static MethodHeader, BindQueue),
    BindQueueOk(&'static MethodHeader, BindQueueOk),
    PurgeQueue(&'static MethodHeader, PurgeQueue),
    PurgeQueueOk(&'static MethodHeader, PurgeQueueOk),
    DeleteQueue(&'static MethodHeader, DeleteQueue),
    DeleteQueueOk(&'static MethodHeader, DeleteQueueOk),
    UnbindQueue(&'static MethodHeader, UnbindQueue),
    UnbindQueueOk(&'static MethodHeader, UnbindQueueOk),

    // basic class
    Qos(&'static MethodHeader, Qos),
    QosOk(&'static MethodHeader, QosOk),
    Consume(&'static MethodHeader, Consume),
    ConsumeOk(&'static MethodHeader, ConsumeOk),
    Cancel(&'static MethodHeader, Cancel),
    CancelOk(&'static MethodHeader, CancelOk),
    Publish(&'static MethodHeader, Publish),
    Return(&'static MethodHeader, Return),
    Deliver(&'static MethodHeader, Deliver),
    Get(&'static MethodHeader, Get),
    GetOk(&'static MethodHeader, GetOk),
    GetEmpty(&'static MethodHeader, GetEmpty),
    Ack(&'static MethodHeader, Ack),
    Reject(&'static MethodHeader, Reject),
    RecoverAsync(&'static MethodHeader, RecoverAsync),
    Recover(&'static MethodHeader, Recover),
    RecoverOk(&'static MethodHeader, RecoverOk),
    Nack(&'static MethodHeader, Nack),

    // confirm class
    Select(&'static MethodHeader, Select),
    SelectOk(&'static MethodHeader, SelectOk),

    // tx class
    TxSelect(&'static MethodHeader, TxSelect),
    TxSelectOk(&'static MethodHeader, TxSelectOk),
    TxCommit(&'static MethodHeader, TxCommit),
    TxCommitOk(&'static MethodHeader, TxCommitOk),
    TxRollback(&'static MethodHeader, TxRollback),
    TxRollbackOk(&'static MethodHeader, TxRollbackOk),

    // content and heartbeat
    ContentHeader(ContentHeader),
    ContentBody(ContentBody),
    Heartbeat(Heartbeat),
}

impl Frame {
    pub fn frame_type(&self) -> Octet {
        match self {
            Frame::ContentHeader(_) => FRAME_HEADER,
            Frame::ContentBody(_) => FRAME_BODY,
            Frame::Heartbeat(_) => FRAME_HEARTBEAT,
            _ => FRAME_METHOD,
        }
    }

    /// Try to decode one frame from the front of `buf`.
    ///
    /// `Ok(None)` means the buffer does not yet hold a complete frame;
    /// `Ok(Some((consumed, channel, frame)))` reports how many bytes to
    /// advance past.
    pub fn decode(buf: &[u8]) -> Result<Option<(usize, AmqpChannelId, Frame)>, Error> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }
        let header: FrameHeader = from_bytes(&buf[..FRAME_HEADER_SIZE])?;

        let total = header.payload_size as usize + FRAME_OVERHEAD;
        if buf.len() < total {
            return Ok(None);
        }
        if buf[total - 1] != FRAME_END {
            return Err(Error::Corrupted);
        }

        let payload = &buf[FRAME_HEADER_SIZE..total - 1];
        let frame = match header.frame_type {
            FRAME_METHOD => Self::decode_method(payload)?,
            FRAME_HEADER => Frame::ContentHeader(from_bytes(payload)?),
            FRAME_BODY => Frame::ContentBody(ContentBody::new(payload.to_vec())),
            FRAME_HEARTBEAT => Frame::Heartbeat(Heartbeat),
            other => return Err(Error::UnsupportedFrameType(other)),
        };
        Ok(Some((total, header.channel, frame)))
    }

    fn decode_method(payload: &[u8]) -> Result<Frame, Error> {
        if payload.len() < 4 {
            return Err(Error::Corrupted);
        }
        let header: MethodHeader = from_bytes(&payload[..4])?;
        let body = &payload[4..];

        let frame = match (header.class_id(), header.method_id()) {
            (10, 50) => from_bytes::<Close>(body)?.into_frame(),
            (10, 51) => from_bytes::<CloseOk>(body)?.into_frame(),

            (20, 10) => from_bytes::<OpenChannel>(body)?.into_frame(),
            (20, 11) => from_bytes::<OpenChannelOk>(body)?.into_frame(),
            (20, 20) => from_bytes::<Flow>(body)?.into_frame(),
            (20, 21) => from_bytes::<FlowOk>(body)?.into_frame(),
            (20, 40) => from_bytes::<CloseChannel>(body)?.into_frame(),
            (20, 41) => from_bytes::<CloseChannelOk>(body)?.into_frame(),

            (40, 10) => from_bytes::<Declare>(body)?.into_frame(),
            (40, 11) => from_bytes::<DeclareOk>(body)?.into_frame(),
            (40, 20) => from_bytes::<Delete>(body)?.into_frame(),
            (40, 21) => from_bytes::<DeleteOk>(body)?.into_frame(),
            (40, 30) => from_bytes::<Bind>(body)?.into_frame(),
            (40, 31) => from_bytes::<BindOk>(body)?.into_frame(),
            (40, 40) => from_bytes::<Unbind>(body)?.into_frame(),
            (40, 51) => from_bytes::<UnbindOk>(body)?.into_frame(),

            (50, 10) => from_bytes::<DeclareQueue>(body)?.into_frame(),
            (50, 11) => from_bytes::<DeclareQueueOk>(body)?.into_frame(),
            (50, 20) => from_bytes::<BindQueue>(body)?.into_frame(),
            (50, 21) => from_bytes::<BindQueueOk>(body)?.into_frame(),
            (50, 30) => from_bytes::<PurgeQueue>(body)?.into_frame(),
            (50, 31) => from_bytes::<PurgeQueueOk>(body)?.into_frame(),
            (50, 40) => from_bytes::<DeleteQueue>(body)?.into_frame(),
            (50, 41) => from_bytes::<DeleteQueueOk>(body)?.into_frame(),
            (50, 50) => from_bytes::<UnbindQueue>(body)?.into_frame(),
            (50, 51) => from_bytes::<UnbindQueueOk>(body)?.into_frame(),

            (60, 10) => from_bytes::<Qos>(body)?.into_frame(),
            (60, 11) => from_bytes::<QosOk>(body)?.into_frame(),
            (60, 20) => from_bytes::<Consume>(body)?.into_frame(),
            (60, 21) => from_bytes::<ConsumeOk>(body)?.into_frame(),
            (60, 30) => from_bytes::<Cancel>(body)?.into_frame(),
            (60, 31) => from_bytes::<CancelOk>(body)?.into_frame(),
            (60, 40) => from_bytes::<Publish>(body)?.into_frame(),
            (60, 50) => from_bytes::<Return>(body)?.into_frame(),
            (60, 60) => from_bytes::<Deliver>(body)?.into_frame(),
            (60, 70) => from_bytes::<Get>(body)?.into_frame(),
            (60, 71) => from_bytes::<GetOk>(body)?.into_frame(),
            (60, 72) => from_bytes::<GetEmpty>(body)?.into_frame(),
            (60, 80) => from_bytes::<Ack>(body)?.into_frame(),
            (60, 90) => from_bytes::<Reject>(body)?.into_frame(),
            (60, 100) => from_bytes::<RecoverAsync>(body)?.into_frame(),
            (60, 110) => from_bytes::<Recover>(body)?.into_frame(),
            (60, 111) => from_bytes::<RecoverOk>(body)?.into_frame(),
            (60, 120) => from_bytes::<Nack>(body)?.into_frame(),

            (85, 10) => from_bytes::<Select>(body)?.into_frame(),
            (85, 11) => from_bytes::<SelectOk>(body)?.into_frame(),

            (90, 10) => from_bytes::<TxSelect>(body)?.into_frame(),
            (90, 11) => from_bytes::<TxSelectOk>(body)?.into_frame(),
            (90, 20) => from_bytes::<TxCommit>(body)?.into_frame(),
            (90, 21) => from_bytes::<TxCommitOk>(body)?.into_frame(),
            (90, 30) => from_bytes::<TxRollback>(body)?.into_frame(),
            (90, 31) => from_bytes::<TxRollbackOk>(body)?.into_frame(),

            (class_id, method_id) => return Err(Error::UnknownMethod(class_id, method_id)),
        };
        Ok(frame)
    }

    /// Append the complete framed encoding to `buf`, returning the bytes
    /// written.
    ///
    /// The envelope header is reserved first and its size field patched
    /// once the payload length is known.
    pub fn encode(&self, channel: AmqpChannelId, buf: &mut BytesMut) -> Result<usize, Error> {
        let start = buf.len();
        let header = FrameHeader {
            frame_type: self.frame_type(),
            channel,
            payload_size: 0,
        };
        to_buffer(&header, buf)?;

        let payload_size = to_buffer(self, buf)?;
        let size_at = start + 3;
        buf[size_at..size_at + 4].copy_from_slice(&(payload_size as u32).to_be_bytes());

        to_buffer(&FRAME_END, buf)?;
        Ok(buf.len() - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coney_wire::types::{FieldTable, FieldValue};

    fn encode_on(frame: &Frame, channel: AmqpChannelId) -> BytesMut {
        let mut buf = BytesMut::new();
        frame.encode(channel, &mut buf).unwrap();
        buf
    }

    #[test]
    fn method_frame_round_trips() {
        let mut arguments = FieldTable::new();
        arguments.insert("x-max-length".try_into().unwrap(), FieldValue::i(100));
        let mut declare = DeclareQueue::new("jobs".try_into().unwrap(), arguments);
        declare.set_durable(true);

        let buf = encode_on(&declare.into_frame(), 7);
        let (consumed, channel, frame) = Frame::decode(&buf).unwrap().unwrap();

        assert_eq!(consumed, buf.len());
        assert_eq!(channel, 7);
        match frame {
            Frame::DeclareQueue(header, method) => {
                assert_eq!(header, DeclareQueue::header());
                assert_eq!(method.queue.as_str(), "jobs");
                assert!(method.durable());
            }
            other => panic!("decoded {:?}", other),
        }
    }

    #[test]
    fn content_header_frame_round_trips() {
        let properties = BasicProperties::default()
            .with_content_type("text/plain")
            .finish();
        let header = ContentHeader::new(
            ContentHeaderCommon {
                class: 60,
                weight: 0,
                body_size: 11,
            },
            properties.clone(),
        );

        let buf = encode_on(&header.into_frame(), 1);
        match Frame::decode(&buf).unwrap().unwrap().2 {
            Frame::ContentHeader(decoded) => {
                assert_eq!(decoded.common.body_size, 11);
                assert_eq!(decoded.basic_properties, properties);
            }
            other => panic!("decoded {:?}", other),
        }
    }

    #[test]
    fn body_frame_round_trips() {
        let buf = encode_on(&ContentBody::new(b"hello".to_vec()).into_frame(), 3);
        match Frame::decode(&buf).unwrap().unwrap().2 {
            Frame::ContentBody(body) => assert_eq!(body.inner, b"hello"),
            other => panic!("decoded {:?}", other),
        }
    }

    #[test]
    fn heartbeat_frame_has_empty_payload() {
        let buf = encode_on(&Heartbeat.into_frame(), 0);
        assert_eq!(&buf[..], &[8, 0, 0, 0, 0, 0, 0, FRAME_END]);
        assert!(matches!(
            Frame::decode(&buf).unwrap().unwrap().2,
            Frame::Heartbeat(_)
        ));
    }

    #[test]
    fn incomplete_buffer_yields_none() {
        let buf = encode_on(&Heartbeat.into_frame(), 0);
        assert!(Frame::decode(&buf[..3]).unwrap().is_none());
        assert!(Frame::decode(&buf[..buf.len() - 1]).unwrap().is_none());
    }

    #[test]
    fn two_frames_decode_in_sequence() {
        let mut buf = encode_on(&Heartbeat.into_frame(), 0);
        Qos::new(0, 10, false)
            .into_frame()
            .encode(2, &mut buf)
            .unwrap();

        let (first_len, _, first) = Frame::decode(&buf).unwrap().unwrap();
        assert!(matches!(first, Frame::Heartbeat(_)));
        let (_, channel, second) = Frame::decode(&buf[first_len..]).unwrap().unwrap();
        assert_eq!(channel, 2);
        assert!(matches!(second, Frame::Qos(..)));
    }

    #[test]
    fn missing_frame_end_is_corrupted() {
        let mut buf = encode_on(&Heartbeat.into_frame(), 0);
        let last = buf.len() - 1;
        buf[last] = 0x00;
        assert_eq!(Frame::decode(&buf).unwrap_err(), Error::Corrupted);
    }

    #[test]
    fn unsupported_frame_type_is_rejected() {
        let mut buf = encode_on(&Heartbeat.into_frame(), 0);
        buf[0] = 9;
        assert_eq!(
            Frame::decode(&buf).unwrap_err(),
            Error::UnsupportedFrameType(9)
        );
    }

    #[test]
    fn unknown_method_is_rejected() {
        // class 10, method 60 (connection.blocked) is outside the surface
        let payload = [0x00, 0x0A, 0x00, 0x3C];
        let mut buf = BytesMut::new();
        let header = FrameHeader {
            frame_type: FRAME_METHOD,
            channel: 0,
            payload_size: payload.len() as u32,
        };
        to_buffer(&header, &mut buf).unwrap();
        buf.extend_from_slice(&payload);
        buf.extend_from_slice(&[FRAME_END]);

        assert_eq!(
            Frame::decode(&buf).unwrap_err(),
            Error::UnknownMethod(10, 60)
        );
    }
}
