//! Confirm class (id 85), RabbitMQ extension.

use coney_wire::types::Boolean;
use serde::{Deserialize, Serialize};

use super::impl_method;

impl_method!(Select, 85, 10);
impl_method!(SelectOk, 85, 11);

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Select {
    pub nowait: Boolean,
}

impl Select {
    pub fn new(nowait: bool) -> Self {
        Self {
            nowait: nowait as Boolean,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SelectOk;
