//! Protocol constants shared by the frame layer and its users.

use crate::types::{Octet, ShortUint};

pub const FRAME_METHOD: Octet = 1;
pub const FRAME_HEADER: Octet = 2;
pub const FRAME_BODY: Octet = 3;
pub const FRAME_HEARTBEAT: Octet = 8;

pub const FRAME_END: Octet = 206;

/// Envelope: type octet, channel short, payload-size long.
pub const FRAME_HEADER_SIZE: usize = 7;
/// Envelope plus the trailing frame-end octet.
pub const FRAME_OVERHEAD: usize = FRAME_HEADER_SIZE + 1;

pub const REPLY_SUCCESS: ShortUint = 200;

// soft errors (channel scope)
pub const CONTENT_TOO_LARGE: ShortUint = 311;
pub const NO_ROUTE: ShortUint = 312;
pub const NO_CONSUMERS: ShortUint = 313;
pub const ACCESS_REFUSED: ShortUint = 403;
pub const NOT_FOUND: ShortUint = 404;
pub const RESOURCE_LOCKED: ShortUint = 405;
pub const PRECONDITION_FAILED: ShortUint = 406;

// hard errors (connection scope)
pub const CONNECTION_FORCED: ShortUint = 320;
pub const INVALID_PATH: ShortUint = 402;
pub const FRAME_ERROR: ShortUint = 501;
pub const SYNTAX_ERROR: ShortUint = 502;
pub const COMMAND_INVALID: ShortUint = 503;
pub const CHANNEL_ERROR: ShortUint = 504;
pub const UNEXPECTED_FRAME: ShortUint = 505;
pub const RESOURCE_ERROR: ShortUint = 506;
pub const NOT_ALLOWED: ShortUint = 530;
pub const NOT_IMPLEMENTED: ShortUint = 540;
pub const INTERNAL_ERROR: ShortUint = 541;
