//! Per-channel dispatcher task.
//!
//! Owns every piece of mutable channel state and is the only place that
//! touches it: the FIFO of pending RPCs, the consumer table, the
//! unconfirmed-publish map, and the single in-flight content assembly
//! slot. Commands from channel handles and inbound frames from the reader
//! are interleaved by one `select!` loop, so ordering is decided here and
//! nowhere else.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use coney_wire::constants::UNEXPECTED_FRAME;
use coney_wire::types::{AmqpChannelId, AmqpDeliveryTag, ShortStr};
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::api::callbacks::ChannelCallback;
use crate::api::consumer::Consumer;
use crate::api::error::Error;
use crate::frame::{
    BasicProperties, CancelOk, CloseChannel, CloseChannelOk, ContentBody, ContentHeader, Deliver,
    FlowOk, Frame, GetOk, Return,
};
use crate::net::{ConnManagementCommand, OutgoingMessage};

use super::{
    ChannelShared, ConfirmResponder, Delivery, DispatcherCommand, GetMessage, ReturnedMessage,
    RpcKind, RpcReply, RpcResponder,
};

struct PendingRpc {
    kind: RpcKind,
    responder: RpcResponder,
}

/// Which method opened the in-flight content sequence.
enum InFlightKind {
    Deliver(Deliver),
    /// Carries the popped `basic.get` responder until the body completes.
    Get(GetOk, RpcResponder),
    Return(Return),
}

/// At most one partially assembled inbound message per channel.
struct InFlight {
    kind: InFlightKind,
    /// `None` until the content header arrives.
    properties: Option<BasicProperties>,
    body_size: u64,
    body: Vec<u8>,
}

enum Flow {
    Continue,
    Exit,
}

pub(crate) struct ChannelDispatcher {
    channel_id: AmqpChannelId,
    shared: Arc<ChannelShared>,
    outgoing_tx: mpsc::Sender<OutgoingMessage>,
    conn_mgmt_tx: mpsc::Sender<ConnManagementCommand>,
    command_rx: mpsc::Receiver<DispatcherCommand>,
    frame_rx: mpsc::Receiver<Frame>,

    pending_rpcs: VecDeque<PendingRpc>,
    consumers: HashMap<String, Box<dyn Consumer>>,
    unconfirmed: BTreeMap<AmqpDeliveryTag, ConfirmResponder>,
    /// Last delivery tag assigned to a publish; only advances in confirm
    /// mode.
    publish_tag: AmqpDeliveryTag,
    confirm_mode: bool,
    in_flight: Option<InFlight>,
    callback: Box<dyn ChannelCallback>,
}

impl ChannelDispatcher {
    pub fn new(
        shared: Arc<ChannelShared>,
        outgoing_tx: mpsc::Sender<OutgoingMessage>,
        conn_mgmt_tx: mpsc::Sender<ConnManagementCommand>,
        command_rx: mpsc::Receiver<DispatcherCommand>,
        frame_rx: mpsc::Receiver<Frame>,
        callback: Box<dyn ChannelCallback>,
    ) -> Self {
        Self {
            channel_id: shared.channel_id,
            shared,
            outgoing_tx,
            conn_mgmt_tx,
            command_rx,
            frame_rx,
            pending_rpcs: VecDeque::new(),
            consumers: HashMap::new(),
            unconfirmed: BTreeMap::new(),
            publish_tag: 0,
            confirm_mode: false,
            in_flight: None,
            callback,
        }
    }

    pub fn spawn(self) {
        tokio::spawn(self.run());
    }

    async fn run(mut self) {
        trace!(channel = self.channel_id, "dispatcher starts");
        let mut commands_open = true;
        loop {
            tokio::select! {
                biased;

                command = self.command_rx.recv(), if commands_open => {
                    match command {
                        Some(command) => {
                            if let Flow::Exit = self.handle_command(command).await {
                                break;
                            }
                        }
                        None => {
                            // every handle dropped: close towards the
                            // server and keep draining frames until the
                            // close-ok (or connection loss) ends the task
                            commands_open = false;
                            self.shared.is_open.store(false, Ordering::SeqCst);
                            if self
                                .forward(vec![CloseChannel::default().into_frame()])
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                    }
                }
                frame = self.frame_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if let Flow::Exit = self.handle_frame(frame).await {
                                break;
                            }
                        }
                        None => {
                            // reader gone: connection lost
                            self.teardown(Error::ConnectionError(
                                "connection lost".to_owned(),
                            ))
                            .await;
                            break;
                        }
                    }
                }
            }
        }
        debug!(channel = self.channel_id, "dispatcher exits");
    }

    /// Forward a frame group to the socket funnel.
    async fn forward(&mut self, frames: Vec<Frame>) -> Result<(), ()> {
        if self.outgoing_tx.send((self.channel_id, frames)).await.is_err() {
            self.teardown(Error::ConnectionError("connection lost".to_owned()))
                .await;
            Err(())
        } else {
            Ok(())
        }
    }

    async fn handle_command(&mut self, command: DispatcherCommand) -> Flow {
        let forwarded = match command {
            DispatcherCommand::Rpc {
                frames,
                kind,
                responder,
            } => {
                // responder first, write second: registration order is
                // write order
                self.pending_rpcs.push_back(PendingRpc { kind, responder });
                self.forward(frames).await
            }
            DispatcherCommand::Consume {
                frames,
                provisional_tag,
                consumer,
                responder,
            } => {
                self.consumers.insert(provisional_tag.clone(), consumer);
                if let Some(responder) = responder {
                    self.pending_rpcs.push_back(PendingRpc {
                        kind: RpcKind::Consume { provisional_tag },
                        responder,
                    });
                }
                self.forward(frames).await
            }
            DispatcherCommand::Cancel {
                frames,
                consumer_tag,
                responder,
            } => {
                match responder {
                    Some(responder) => {
                        // cancel-ok retires the consumer
                        self.pending_rpcs.push_back(PendingRpc {
                            kind: RpcKind::Method,
                            responder,
                        });
                    }
                    None => self.retire_consumer(&consumer_tag).await,
                }
                self.forward(frames).await
            }
            DispatcherCommand::ConfirmSelect { frames, responder } => {
                match responder {
                    Some(responder) => {
                        self.pending_rpcs.push_back(PendingRpc {
                            kind: RpcKind::Method,
                            responder,
                        });
                    }
                    None => self.confirm_mode = true,
                }
                self.forward(frames).await
            }
            DispatcherCommand::Publish { frames, responder } => {
                if self.confirm_mode {
                    self.publish_tag += 1;
                    self.unconfirmed.insert(self.publish_tag, responder);
                    self.forward(frames).await
                } else {
                    let forwarded = self.forward(frames).await;
                    if forwarded.is_ok() {
                        // no confirm coming; handing the group to the
                        // funnel is the completion
                        let _ = responder.send(Ok(None));
                    }
                    forwarded
                }
            }
            DispatcherCommand::Send { frames } => self.forward(frames).await,
            DispatcherCommand::RegisterCallback { callback } => {
                self.callback = callback;
                Ok(())
            }
        };
        match forwarded {
            Ok(()) => Flow::Continue,
            Err(()) => Flow::Exit,
        }
    }

    async fn handle_frame(&mut self, frame: Frame) -> Flow {
        match frame {
            // ---- channel close handshake -------------------------------
            frame @ Frame::CloseChannelOk(..) => {
                if let Some(pending) = self.pending_rpcs.pop_front() {
                    let _ = pending.responder.send(Ok(RpcReply::Method(frame)));
                }
                self.teardown(Error::ChannelClosed).await;
                Flow::Exit
            }
            Frame::CloseChannel(_, close) => {
                self.callback.close(&close).await;
                // acknowledge before teardown
                let _ = self
                    .outgoing_tx
                    .send((self.channel_id, vec![CloseChannelOk.into_frame()]))
                    .await;
                self.teardown(Error::ChannelError {
                    reply_code: close.reply_code,
                    reply_text: close.reply_text.to_string(),
                    class_id: close.class_id,
                    method_id: close.method_id,
                })
                .await;
                Flow::Exit
            }

            // ---- content-bearing methods -------------------------------
            Frame::Deliver(_, deliver) => self.begin_content(InFlightKind::Deliver(deliver)).await,
            Frame::Return(_, ret) => self.begin_content(InFlightKind::Return(ret)).await,
            Frame::GetOk(_, get_ok) => match self.pending_rpcs.pop_front() {
                Some(pending) if matches!(pending.kind, RpcKind::Get) => {
                    self.begin_content(InFlightKind::Get(get_ok, pending.responder))
                        .await
                }
                _ => self.protocol_error("get-ok without a pending basic.get").await,
            },
            Frame::GetEmpty(..) => match self.pending_rpcs.pop_front() {
                Some(pending) if matches!(pending.kind, RpcKind::Get) => {
                    let _ = pending.responder.send(Ok(RpcReply::Get(None)));
                    Flow::Continue
                }
                _ => {
                    self.protocol_error("get-empty without a pending basic.get")
                        .await
                }
            },
            Frame::ContentHeader(header) => self.on_content_header(header).await,
            Frame::ContentBody(body) => self.on_content_body(body).await,

            // ---- publisher confirms ------------------------------------
            Frame::Ack(_, ack) => {
                let multiple = ack.multiple();
                self.on_confirm(ack.delivery_tag, multiple, true).await
            }
            Frame::Nack(_, nack) => {
                let multiple = nack.multiple();
                self.on_confirm(nack.delivery_tag, multiple, false).await
            }

            // ---- server-initiated requests -----------------------------
            Frame::Flow(_, flow) => {
                let active = self.callback.flow(flow.active != 0).await;
                match self.forward(vec![FlowOk::new(active).into_frame()]).await {
                    Ok(()) => Flow::Continue,
                    Err(()) => Flow::Exit,
                }
            }
            Frame::Cancel(_, cancel) => {
                let consumer_tag = cancel.consumer_tag.to_string();
                self.retire_consumer(&consumer_tag).await;
                if cancel.no_wait == 0 {
                    let reply = CancelOk::new(cancel.consumer_tag);
                    if self.forward(vec![reply.into_frame()]).await.is_err() {
                        return Flow::Exit;
                    }
                }
                Flow::Continue
            }

            // ---- synchronous replies: FIFO head ------------------------
            frame @ (Frame::OpenChannelOk(..)
            | Frame::FlowOk(..)
            | Frame::DeclareOk(..)
            | Frame::DeleteOk(..)
            | Frame::BindOk(..)
            | Frame::UnbindOk(..)
            | Frame::DeclareQueueOk(..)
            | Frame::BindQueueOk(..)
            | Frame::PurgeQueueOk(..)
            | Frame::DeleteQueueOk(..)
            | Frame::UnbindQueueOk(..)
            | Frame::QosOk(..)
            | Frame::ConsumeOk(..)
            | Frame::CancelOk(..)
            | Frame::RecoverOk(..)
            | Frame::SelectOk(..)
            | Frame::TxSelectOk(..)
            | Frame::TxCommitOk(..)
            | Frame::TxRollbackOk(..)) => self.on_sync_reply(frame).await,

            other => {
                self.protocol_error(format!("unexpected frame {:?}", other))
                    .await
            }
        }
    }

    async fn on_sync_reply(&mut self, frame: Frame) -> Flow {
        let pending = match self.pending_rpcs.pop_front() {
            Some(pending) => pending,
            None => {
                return self
                    .protocol_error("synchronous reply without a pending request")
                    .await
            }
        };

        match (&frame, &pending.kind) {
            (Frame::ConsumeOk(_, consume_ok), RpcKind::Consume { provisional_tag }) => {
                // rekey before anything else can observe the server tag
                let server_tag = consume_ok.consumer_tag.to_string();
                if *provisional_tag != server_tag {
                    if let Some(consumer) = self.consumers.remove(provisional_tag) {
                        self.consumers.insert(server_tag, consumer);
                    }
                }
            }
            (Frame::CancelOk(_, cancel_ok), _) => {
                let consumer_tag = cancel_ok.consumer_tag.to_string();
                self.retire_consumer(&consumer_tag).await;
            }
            (Frame::SelectOk(..), _) => {
                self.confirm_mode = true;
            }
            _ => {}
        }

        let _ = pending.responder.send(Ok(RpcReply::Method(frame)));
        Flow::Continue
    }

    /// Remove a consumer and fire its cancellation signal once.
    async fn retire_consumer(&mut self, consumer_tag: &str) {
        if let Some(mut consumer) = self.consumers.remove(consumer_tag) {
            consumer.on_cancel().await;
        }
    }

    // ---- content assembly ---------------------------------------------

    async fn begin_content(&mut self, kind: InFlightKind) -> Flow {
        if self.in_flight.is_some() {
            return self
                .protocol_error("content method while another message is in flight")
                .await;
        }
        self.in_flight = Some(InFlight {
            kind,
            properties: None,
            body_size: 0,
            body: Vec::new(),
        });
        Flow::Continue
    }

    async fn on_content_header(&mut self, header: ContentHeader) -> Flow {
        match self.in_flight.as_mut() {
            Some(in_flight) if in_flight.properties.is_none() => {
                in_flight.body_size = header.common.body_size;
                in_flight.properties = Some(header.basic_properties);
                in_flight.body = Vec::with_capacity(header.common.body_size as usize);
                if header.common.body_size == 0 {
                    self.finish_content().await
                } else {
                    Flow::Continue
                }
            }
            _ => self.protocol_error("unexpected content header").await,
        }
    }

    async fn on_content_body(&mut self, body: ContentBody) -> Flow {
        match self.in_flight.as_mut() {
            Some(in_flight) if in_flight.properties.is_some() => {
                in_flight.body.extend_from_slice(&body.inner);
                if (in_flight.body.len() as u64) > in_flight.body_size {
                    self.protocol_error("content body exceeds declared size")
                        .await
                } else if (in_flight.body.len() as u64) == in_flight.body_size {
                    self.finish_content().await
                } else {
                    Flow::Continue
                }
            }
            _ => self.protocol_error("content body without header").await,
        }
    }

    /// Body complete: dispatch exactly once and clear the slot.
    async fn finish_content(&mut self) -> Flow {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) => in_flight,
            None => return Flow::Continue,
        };
        let properties = in_flight.properties.unwrap_or_default();
        let content = in_flight.body;

        match in_flight.kind {
            InFlightKind::Deliver(deliver) => {
                let consumer_tag = deliver.consumer_tag.to_string();
                let outcome = match self.consumers.get_mut(&consumer_tag) {
                    Some(consumer) => Some(
                        consumer
                            .on_message(Delivery {
                                deliver,
                                properties,
                                content,
                            })
                            .await,
                    ),
                    None => None,
                };
                match outcome {
                    None => {
                        self.protocol_error(format!(
                            "delivery for unknown consumer {}",
                            consumer_tag
                        ))
                        .await
                    }
                    Some(Err(err)) => {
                        // consumer failures go to the error sink, never
                        // to channel state
                        self.callback.consumer_error(&consumer_tag, err).await;
                        Flow::Continue
                    }
                    Some(Ok(())) => Flow::Continue,
                }
            }
            InFlightKind::Get(get_ok, responder) => {
                let _ = responder.send(Ok(RpcReply::Get(Some(GetMessage {
                    get_ok,
                    properties,
                    content,
                }))));
                Flow::Continue
            }
            InFlightKind::Return(ret) => {
                self.callback
                    .publish_return(ReturnedMessage {
                        ret,
                        properties,
                        content,
                    })
                    .await;
                Flow::Continue
            }
        }
    }

    // ---- publisher confirms -------------------------------------------

    async fn on_confirm(&mut self, tag: AmqpDeliveryTag, multiple: bool, positive: bool) -> Flow {
        if !self.confirm_mode {
            return self.protocol_error("confirm outside confirm mode").await;
        }
        if multiple {
            let rest = self.unconfirmed.split_off(&(tag + 1));
            let drained = std::mem::replace(&mut self.unconfirmed, rest);
            if drained.is_empty() {
                return self
                    .protocol_error(format!("batch confirm up to unknown tag {}", tag))
                    .await;
            }
            // ascending order per the BTreeMap
            for (tag, responder) in drained {
                let _ = responder.send(Self::confirm_outcome(tag, positive));
            }
        } else {
            match self.unconfirmed.remove(&tag) {
                Some(responder) => {
                    let _ = responder.send(Self::confirm_outcome(tag, positive));
                }
                None => {
                    return self
                        .protocol_error(format!("confirm for unknown tag {}", tag))
                        .await
                }
            }
        }
        Flow::Continue
    }

    fn confirm_outcome(
        tag: AmqpDeliveryTag,
        positive: bool,
    ) -> Result<Option<AmqpDeliveryTag>, Error> {
        if positive {
            Ok(Some(tag))
        } else {
            Err(Error::PublishNacked(tag))
        }
    }

    // ---- failure paths -------------------------------------------------

    /// Inbound protocol violation: close the channel upstream with 505,
    /// then settle every local waiter.
    async fn protocol_error(&mut self, reason: impl Into<String>) -> Flow {
        let reason = reason.into();
        error!(channel = self.channel_id, %reason, "protocol error");

        let reply_text = ShortStr::try_from(reason.as_str())
            .unwrap_or_else(|_| ShortStr::try_from("unexpected frame").unwrap_or_default());
        let close = CloseChannel::new(UNEXPECTED_FRAME, reply_text, 0, 0);
        let _ = self
            .outgoing_tx
            .send((self.channel_id, vec![close.into_frame()]))
            .await;

        self.teardown(Error::ProtocolError(reason)).await;
        Flow::Exit
    }

    /// Settle everything with `reason` and deregister the channel.
    async fn teardown(&mut self, reason: Error) {
        self.shared.is_open.store(false, Ordering::SeqCst);

        for pending in self.pending_rpcs.drain(..) {
            let _ = pending.responder.send(Err(reason.clone()));
        }
        if let Some(in_flight) = self.in_flight.take() {
            if let InFlightKind::Get(_, responder) = in_flight.kind {
                let _ = responder.send(Err(reason.clone()));
            }
        }
        for (_, responder) in std::mem::take(&mut self.unconfirmed) {
            let _ = responder.send(Err(reason.clone()));
        }
        for (_, mut consumer) in self.consumers.drain() {
            consumer.on_cancel().await;
        }

        let _ = self
            .conn_mgmt_tx
            .send(ConnManagementCommand::DeregisterChannel(self.channel_id))
            .await;
    }
}
