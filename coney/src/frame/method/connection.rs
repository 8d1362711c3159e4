//! Connection class (id 10), close pair only.
//!
//! The handshake methods (start/tune/open) are the transport owner's
//! business; the engine still has to recognize a server-initiated
//! `connection.close` after binding and answer it before shutting down.

use coney_wire::constants::REPLY_SUCCESS;
use coney_wire::types::{AmqpClassId, AmqpMethodId, AmqpReplyCode, ShortStr};
use serde::{Deserialize, Serialize};

use super::impl_method;

impl_method!(Close, 10, 50);
impl_method!(CloseOk, 10, 51);

#[derive(Debug, Serialize, Deserialize)]
pub struct Close {
    pub reply_code: AmqpReplyCode,
    pub reply_text: ShortStr,
    pub class_id: AmqpClassId,
    pub method_id: AmqpMethodId,
}

impl Default for Close {
    fn default() -> Self {
        Self {
            reply_code: REPLY_SUCCESS,
            reply_text: ShortStr::default(),
            class_id: 0,
            method_id: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct CloseOk;
