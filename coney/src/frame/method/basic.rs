//! Basic class (id 60).

use coney_wire::types::{
    AmqpConsumerTag, AmqpDeliveryTag, AmqpExchangeName, AmqpMessageCount, AmqpQueueName,
    AmqpReplyCode, Boolean, FieldTable, LongUint, Octet, ShortStr, ShortUint,
};
use serde::{Deserialize, Serialize};

use super::impl_method;

impl_method!(Qos, 60, 10);
impl_method!(QosOk, 60, 11);
impl_method!(Consume, 60, 20);
impl_method!(ConsumeOk, 60, 21);
impl_method!(Cancel, 60, 30);
impl_method!(CancelOk, 60, 31);
impl_method!(Publish, 60, 40);
impl_method!(Return, 60, 50);
impl_method!(Deliver, 60, 60);
impl_method!(Get, 60, 70);
impl_method!(GetOk, 60, 71);
impl_method!(GetEmpty, 60, 72);
impl_method!(Ack, 60, 80);
impl_method!(Reject, 60, 90);
impl_method!(RecoverAsync, 60, 100);
impl_method!(Recover, 60, 110);
impl_method!(RecoverOk, 60, 111);
impl_method!(Nack, 60, 120);

mod bit_flag {
    pub mod consume {
        pub const NO_LOCAL: u8 = 0b0000_0001;
        pub const NO_ACK: u8 = 0b0000_0010;
        pub const EXCLUSIVE: u8 = 0b0000_0100;
        pub const NO_WAIT: u8 = 0b0000_1000;
    }
    pub mod publish {
        pub const MANDATORY: u8 = 0b0000_0001;
        pub const IMMEDIATE: u8 = 0b0000_0010;
    }
    pub mod nack {
        pub const MULTIPLE: u8 = 0b0000_0001;
        pub const REQUEUE: u8 = 0b0000_0010;
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Qos {
    pub prefetch_size: LongUint,
    pub prefetch_count: ShortUint,
    pub global: Boolean,
}

impl Qos {
    pub fn new(prefetch_size: LongUint, prefetch_count: ShortUint, global: bool) -> Self {
        Self {
            prefetch_size,
            prefetch_count,
            global: global as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct QosOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Consume {
    pub ticket: ShortUint,
    pub queue: AmqpQueueName,
    pub consumer_tag: AmqpConsumerTag,
    bits: Octet,
    pub arguments: FieldTable,
}

impl Consume {
    pub fn new(queue: AmqpQueueName, consumer_tag: AmqpConsumerTag, arguments: FieldTable) -> Self {
        Self {
            ticket: 0,
            queue,
            consumer_tag,
            bits: 0,
            arguments,
        }
    }

    pub fn set_no_local(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::consume::NO_LOCAL;
        } else {
            self.bits &= !bit_flag::consume::NO_LOCAL;
        }
    }

    pub fn set_no_ack(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::consume::NO_ACK;
        } else {
            self.bits &= !bit_flag::consume::NO_ACK;
        }
    }

    pub fn set_exclusive(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::consume::EXCLUSIVE;
        } else {
            self.bits &= !bit_flag::consume::EXCLUSIVE;
        }
    }

    pub fn set_no_wait(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::consume::NO_WAIT;
        } else {
            self.bits &= !bit_flag::consume::NO_WAIT;
        }
    }

    pub fn no_ack(&self) -> bool {
        self.bits & bit_flag::consume::NO_ACK != 0
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ConsumeOk {
    pub consumer_tag: AmqpConsumerTag,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Cancel {
    pub consumer_tag: AmqpConsumerTag,
    pub no_wait: Boolean,
}

impl Cancel {
    pub fn new(consumer_tag: AmqpConsumerTag, no_wait: bool) -> Self {
        Self {
            consumer_tag,
            no_wait: no_wait as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct CancelOk {
    pub consumer_tag: AmqpConsumerTag,
}

impl CancelOk {
    pub fn new(consumer_tag: AmqpConsumerTag) -> Self {
        Self { consumer_tag }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Publish {
    pub ticket: ShortUint,
    pub exchange: AmqpExchangeName,
    pub routing_key: ShortStr,
    bits: Octet,
}

impl Publish {
    pub fn new(exchange: AmqpExchangeName, routing_key: ShortStr) -> Self {
        Self {
            ticket: 0,
            exchange,
            routing_key,
            bits: 0,
        }
    }

    pub fn set_mandatory(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::publish::MANDATORY;
        } else {
            self.bits &= !bit_flag::publish::MANDATORY;
        }
    }

    pub fn set_immediate(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::publish::IMMEDIATE;
        } else {
            self.bits &= !bit_flag::publish::IMMEDIATE;
        }
    }

    pub fn mandatory(&self) -> bool {
        self.bits & bit_flag::publish::MANDATORY != 0
    }

    pub fn immediate(&self) -> bool {
        self.bits & bit_flag::publish::IMMEDIATE != 0
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Return {
    pub reply_code: AmqpReplyCode,
    pub reply_text: ShortStr,
    pub exchange: AmqpExchangeName,
    pub routing_key: ShortStr,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Deliver {
    pub consumer_tag: AmqpConsumerTag,
    pub delivery_tag: AmqpDeliveryTag,
    pub redelivered: Boolean,
    pub exchange: AmqpExchangeName,
    pub routing_key: ShortStr,
}

impl Deliver {
    pub fn redelivered(&self) -> bool {
        self.redelivered != 0
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Get {
    pub ticket: ShortUint,
    pub queue: AmqpQueueName,
    pub no_ack: Boolean,
}

impl Get {
    pub fn new(queue: AmqpQueueName, no_ack: bool) -> Self {
        Self {
            ticket: 0,
            queue,
            no_ack: no_ack as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GetOk {
    pub delivery_tag: AmqpDeliveryTag,
    pub redelivered: Boolean,
    pub exchange: AmqpExchangeName,
    pub routing_key: ShortStr,
    pub message_count: AmqpMessageCount,
}

impl GetOk {
    pub fn redelivered(&self) -> bool {
        self.redelivered != 0
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GetEmpty {
    // deprecated in 0-9-1
    pub cluster_id: ShortStr,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Ack {
    pub delivery_tag: AmqpDeliveryTag,
    pub multiple: Boolean,
}

impl Ack {
    pub fn new(delivery_tag: AmqpDeliveryTag, multiple: bool) -> Self {
        Self {
            delivery_tag,
            multiple: multiple as Boolean,
        }
    }

    pub fn multiple(&self) -> bool {
        self.multiple != 0
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Reject {
    pub delivery_tag: AmqpDeliveryTag,
    pub requeue: Boolean,
}

impl Reject {
    pub fn new(delivery_tag: AmqpDeliveryTag, requeue: bool) -> Self {
        Self {
            delivery_tag,
            requeue: requeue as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RecoverAsync {
    pub requeue: Boolean,
}

impl RecoverAsync {
    pub fn new(requeue: bool) -> Self {
        Self {
            requeue: requeue as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Recover {
    pub requeue: Boolean,
}

impl Recover {
    pub fn new(requeue: bool) -> Self {
        Self {
            requeue: requeue as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RecoverOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Nack {
    pub delivery_tag: AmqpDeliveryTag,
    bits: Octet,
}

impl Nack {
    pub fn new(delivery_tag: AmqpDeliveryTag) -> Self {
        Self {
            delivery_tag,
            bits: 0,
        }
    }

    pub fn set_multiple(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::nack::MULTIPLE;
        } else {
            self.bits &= !bit_flag::nack::MULTIPLE;
        }
    }

    pub fn set_requeue(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::nack::REQUEUE;
        } else {
            self.bits &= !bit_flag::nack::REQUEUE;
        }
    }

    pub fn multiple(&self) -> bool {
        self.bits & bit_flag::nack::MULTIPLE != 0
    }

    pub fn requeue(&self) -> bool {
        self.bits & bit_flag::nack::REQUEUE != 0
    }
}
