//! Shared test plumbing: logging setup and an in-memory broker speaking
//! real AMQP frames over a duplex pipe.

#![allow(dead_code)]

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tracing::Level;

use coney::connection::{Connection, ConnectionArguments};
use coney::frame::{
    ContentBody, ContentHeader, ContentHeaderCommon, BasicProperties, Deliver, Frame,
    OpenChannelOk, Publish, SelectOk,
};

pub fn setup_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Scripted broker half of a bound engine.
///
/// Tests drive it from a spawned task: receive the frames the client
/// engine writes, assert on them, and answer with hand-built frames.
pub struct MockBroker {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
    buffer: BytesMut,
    frame_max: u32,
}

impl MockBroker {
    /// Bind a connection engine to one end of a duplex pipe and keep the
    /// other end.
    pub fn bind(args: ConnectionArguments) -> (Connection, MockBroker) {
        let (client, server) = tokio::io::duplex(1 << 20);
        let frame_max = args.frame_max;
        let connection = Connection::bind(client, args);
        let (reader, writer) = tokio::io::split(server);
        (
            connection,
            MockBroker {
                reader,
                writer,
                buffer: BytesMut::new(),
                frame_max,
            },
        )
    }

    pub async fn recv_frame(&mut self) -> (u16, Frame) {
        loop {
            if let Some((consumed, channel, frame)) = Frame::decode(&self.buffer).unwrap() {
                self.buffer.advance(consumed);
                return (channel, frame);
            }
            let read = self.reader.read_buf(&mut self.buffer).await.unwrap();
            assert!(read > 0, "client closed the transport");
        }
    }

    pub async fn send_frame(&mut self, channel: u16, frame: Frame) {
        let mut buf = BytesMut::new();
        frame.encode(channel, &mut buf).unwrap();
        self.writer.write_all(&buf).await.unwrap();
    }

    /// Answer a `channel.open`, returning the channel id the client chose.
    pub async fn accept_channel_open(&mut self) -> u16 {
        match self.recv_frame().await {
            (channel, Frame::OpenChannel(..)) => {
                self.send_frame(channel, OpenChannelOk::default().into_frame())
                    .await;
                channel
            }
            (_, other) => panic!("expected channel.open, got {:?}", other),
        }
    }

    /// Answer a `confirm.select`.
    pub async fn accept_confirm_select(&mut self, channel: u16) {
        match self.recv_frame().await {
            (ch, Frame::Select(..)) if ch == channel => {
                self.send_frame(channel, SelectOk.into_frame()).await;
            }
            (_, other) => panic!("expected confirm.select, got {:?}", other),
        }
    }

    /// Collect one publish: the method frame, the content header, and the
    /// body split into its frame-sized chunks.
    pub async fn recv_publish(&mut self, channel: u16) -> (Publish, ContentHeader, Vec<Vec<u8>>) {
        let publish = match self.recv_frame().await {
            (ch, Frame::Publish(_, publish)) if ch == channel => publish,
            (_, other) => panic!("expected basic.publish, got {:?}", other),
        };
        let header = match self.recv_frame().await {
            (ch, Frame::ContentHeader(header)) if ch == channel => header,
            (_, other) => panic!("expected content header, got {:?}", other),
        };
        let mut chunks = Vec::new();
        let mut received = 0u64;
        while received < header.common.body_size {
            match self.recv_frame().await {
                (ch, Frame::ContentBody(body)) if ch == channel => {
                    received += body.inner.len() as u64;
                    chunks.push(body.inner);
                }
                (_, other) => panic!("expected content body, got {:?}", other),
            }
        }
        (publish, header, chunks)
    }

    /// Push a message at a consumer: deliver, header, chunked body.
    pub async fn deliver(
        &mut self,
        channel: u16,
        consumer_tag: &str,
        delivery_tag: u64,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) {
        let deliver = Deliver {
            consumer_tag: consumer_tag.try_into().unwrap(),
            delivery_tag,
            redelivered: 0,
            exchange: exchange.try_into().unwrap(),
            routing_key: routing_key.try_into().unwrap(),
        };
        self.send_frame(channel, deliver.into_frame()).await;
        self.send_content(channel, body).await;
    }

    /// Send a content header and the body split at the negotiated size.
    pub async fn send_content(&mut self, channel: u16, body: &[u8]) {
        let header = ContentHeader::new(
            ContentHeaderCommon {
                class: 60,
                weight: 0,
                body_size: body.len() as u64,
            },
            BasicProperties::default(),
        );
        self.send_frame(channel, header.into_frame()).await;

        let chunk_size = (self.frame_max as usize).saturating_sub(8).max(1);
        for chunk in body.chunks(chunk_size) {
            self.send_frame(channel, ContentBody::new(chunk.to_vec()).into_frame())
                .await;
        }
    }
}
