//! Queue class (id 50).

use coney_wire::types::{
    AmqpExchangeName, AmqpMessageCount, AmqpQueueName, Boolean, FieldTable, LongUint, Octet,
    ShortStr, ShortUint,
};
use serde::{Deserialize, Serialize};

use super::impl_method;

impl_method!(DeclareQueue, 50, 10);
impl_method!(DeclareQueueOk, 50, 11);
impl_method!(BindQueue, 50, 20);
impl_method!(BindQueueOk, 50, 21);
impl_method!(PurgeQueue, 50, 30);
impl_method!(PurgeQueueOk, 50, 31);
impl_method!(DeleteQueue, 50, 40);
impl_method!(DeleteQueueOk, 50, 41);
impl_method!(UnbindQueue, 50, 50);
impl_method!(UnbindQueueOk, 50, 51);

mod bit_flag {
    pub mod declare {
        pub const PASSIVE: u8 = 0b0000_0001;
        pub const DURABLE: u8 = 0b0000_0010;
        pub const EXCLUSIVE: u8 = 0b0000_0100;
        pub const AUTO_DELETE: u8 = 0b0000_1000;
        pub const NO_WAIT: u8 = 0b0001_0000;
    }
    pub mod delete {
        pub const IF_UNUSED: u8 = 0b0000_0001;
        pub const IF_EMPTY: u8 = 0b0000_0010;
        pub const NO_WAIT: u8 = 0b0000_0100;
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DeclareQueue {
    pub ticket: ShortUint,
    pub queue: AmqpQueueName,
    bits: Octet,
    pub arguments: FieldTable,
}

impl DeclareQueue {
    pub fn new(queue: AmqpQueueName, arguments: FieldTable) -> Self {
        Self {
            ticket: 0,
            queue,
            bits: 0,
            arguments,
        }
    }

    pub fn set_passive(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::declare::PASSIVE;
        } else {
            self.bits &= !bit_flag::declare::PASSIVE;
        }
    }

    pub fn set_durable(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::declare::DURABLE;
        } else {
            self.bits &= !bit_flag::declare::DURABLE;
        }
    }

    pub fn set_exclusive(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::declare::EXCLUSIVE;
        } else {
            self.bits &= !bit_flag::declare::EXCLUSIVE;
        }
    }

    pub fn set_auto_delete(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::declare::AUTO_DELETE;
        } else {
            self.bits &= !bit_flag::declare::AUTO_DELETE;
        }
    }

    pub fn set_no_wait(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::declare::NO_WAIT;
        } else {
            self.bits &= !bit_flag::declare::NO_WAIT;
        }
    }

    pub fn durable(&self) -> bool {
        self.bits & bit_flag::declare::DURABLE != 0
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DeclareQueueOk {
    pub queue: AmqpQueueName,
    pub message_count: AmqpMessageCount,
    pub consumer_count: LongUint,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct BindQueue {
    pub ticket: ShortUint,
    pub queue: AmqpQueueName,
    pub exchange: AmqpExchangeName,
    pub routing_key: ShortStr,
    pub nowait: Boolean,
    pub arguments: FieldTable,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct BindQueueOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct UnbindQueue {
    pub ticket: ShortUint,
    pub queue: AmqpQueueName,
    pub exchange: AmqpExchangeName,
    pub routing_key: ShortStr,
    pub arguments: FieldTable,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct UnbindQueueOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct PurgeQueue {
    pub ticket: ShortUint,
    pub queue: AmqpQueueName,
    pub nowait: Boolean,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct PurgeQueueOk {
    pub message_count: AmqpMessageCount,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DeleteQueue {
    pub ticket: ShortUint,
    pub queue: AmqpQueueName,
    bits: Octet,
}

impl DeleteQueue {
    pub fn new(queue: AmqpQueueName) -> Self {
        Self {
            ticket: 0,
            queue,
            bits: 0,
        }
    }

    pub fn set_if_unused(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::delete::IF_UNUSED;
        } else {
            self.bits &= !bit_flag::delete::IF_UNUSED;
        }
    }

    pub fn set_if_empty(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::delete::IF_EMPTY;
        } else {
            self.bits &= !bit_flag::delete::IF_EMPTY;
        }
    }

    pub fn set_no_wait(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::delete::NO_WAIT;
        } else {
            self.bits &= !bit_flag::delete::NO_WAIT;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DeleteQueueOk {
    pub message_count: AmqpMessageCount,
}
