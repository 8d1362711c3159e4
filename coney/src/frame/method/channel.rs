//! Channel class (id 20).

use coney_wire::constants::REPLY_SUCCESS;
use coney_wire::types::{
    AmqpClassId, AmqpMethodId, AmqpReplyCode, Boolean, LongStr, ShortStr,
};
use serde::{Deserialize, Serialize};

use super::impl_method;

impl_method!(OpenChannel, 20, 10);
impl_method!(OpenChannelOk, 20, 11);
impl_method!(Flow, 20, 20);
impl_method!(FlowOk, 20, 21);
impl_method!(CloseChannel, 20, 40);
impl_method!(CloseChannelOk, 20, 41);

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct OpenChannel {
    // deprecated in 0-9-1, always empty
    pub out_of_band: ShortStr,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct OpenChannelOk {
    // deprecated in 0-9-1
    pub channel_id: LongStr,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Flow {
    pub active: Boolean,
}

impl Flow {
    pub fn new(active: bool) -> Self {
        Self {
            active: active as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct FlowOk {
    pub active: Boolean,
}

impl FlowOk {
    pub fn new(active: bool) -> Self {
        Self {
            active: active as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseChannel {
    pub reply_code: AmqpReplyCode,
    pub reply_text: ShortStr,
    pub class_id: AmqpClassId,
    pub method_id: AmqpMethodId,
}

impl CloseChannel {
    pub fn new(
        reply_code: AmqpReplyCode,
        reply_text: ShortStr,
        class_id: AmqpClassId,
        method_id: AmqpMethodId,
    ) -> Self {
        Self {
            reply_code,
            reply_text,
            class_id,
            method_id,
        }
    }
}

impl Default for CloseChannel {
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
pub struct CloseChannelOk;
