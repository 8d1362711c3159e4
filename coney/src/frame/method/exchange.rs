//! Exchange class (id 40).

use coney_wire::types::{
    AmqpExchangeName, Boolean, FieldTable, Octet, ShortStr, ShortUint,
};
use serde::{Deserialize, Serialize};

use super::impl_method;

impl_method!(Declare, 40, 10);
impl_method!(DeclareOk, 40, 11);
impl_method!(Delete, 40, 20);
impl_method!(DeleteOk, 40, 21);
impl_method!(Bind, 40, 30);
impl_method!(BindOk, 40, 31);
impl_method!(Unbind, 40, 40);
// per the RabbitMQ errata, unbind-ok is 51, not 41
impl_method!(UnbindOk, 40, 51);

mod bit_flag {
    pub mod declare {
        // consecutive bit fields pack into one octet, low bit first
        pub const PASSIVE: u8 = 0b0000_0001;
        pub const DURABLE: u8 = 0b0000_0010;
        pub const AUTO_DELETE: u8 = 0b0000_0100;
        pub const INTERNAL: u8 = 0b0000_1000;
        pub const NO_WAIT: u8 = 0b0001_0000;
    }
    pub mod delete {
        pub const IF_UNUSED: u8 = 0b0000_0001;
        pub const NO_WAIT: u8 = 0b0000_0010;
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Declare {
    pub ticket: ShortUint,
    pub exchange: AmqpExchangeName,
    pub typ: ShortStr,
    bits: Octet,
    pub arguments: FieldTable,
}

impl Declare {
    pub fn new(exchange: AmqpExchangeName, typ: ShortStr, arguments: FieldTable) -> Self {
        Self {
            ticket: 0,
            exchange,
            typ,
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

    pub fn set_auto_delete(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::declare::AUTO_DELETE;
        } else {
            self.bits &= !bit_flag::declare::AUTO_DELETE;
        }
    }

    pub fn set_internal(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::declare::INTERNAL;
        } else {
            self.bits &= !bit_flag::declare::INTERNAL;
        }
    }

    pub fn set_no_wait(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::declare::NO_WAIT;
        } else {
            self.bits &= !bit_flag::declare::NO_WAIT;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DeclareOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Delete {
    pub ticket: ShortUint,
    pub exchange: AmqpExchangeName,
    bits: Octet,
}

impl Delete {
    pub fn new(exchange: AmqpExchangeName) -> Self {
        Self {
            ticket: 0,
            exchange,
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

    pub fn set_no_wait(&mut self, value: bool) {
        if value {
            self.bits |= bit_flag::delete::NO_WAIT;
        } else {
            self.bits &= !bit_flag::delete::NO_WAIT;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DeleteOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Bind {
    pub ticket: ShortUint,
    pub destination: AmqpExchangeName,
    pub source: AmqpExchangeName,
    pub routing_key: ShortStr,
    pub nowait: Boolean,
    pub arguments: FieldTable,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct BindOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Unbind {
    pub ticket: ShortUint,
    pub destination: AmqpExchangeName,
    pub source: AmqpExchangeName,
    pub routing_key: ShortStr,
    pub nowait: Boolean,
    pub arguments: FieldTable,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct UnbindOk;
