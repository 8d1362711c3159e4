//! AMQP 0-9-1 client core, compatible with the RabbitMQ dialect.
//!
//! This crate is the channel layer and its wire-protocol engine: frame
//! encode/decode, the per-channel state machine, RPC-over-frames with FIFO
//! reply matching, consumer dispatch, and publisher-confirm tracking. It
//! binds to any already-negotiated transport (see
//! [`Connection::bind`][connection::Connection::bind]); the socket
//! handshake, TLS, heartbeat policy, and reconnection belong to the caller.

pub mod frame;
mod net;

mod api;

pub use api::*;
pub use frame::{BasicProperties, Deliver, GetOk, Return};
