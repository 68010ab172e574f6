//! Protocol Module
//!
//! Wire codec for the store's text protocol (a RESP2 subset).
//!
//! ## Request Format
//! ```text
//! Inline:      PING\r\n
//! Multi-bulk:  *<argc>\r\n $<len>\r\n<arg0>\r\n $<len>\r\n<arg1>\r\n ...
//! ```
//! `argc` counts the command name plus every argument. Argument-free commands
//! (PING, INFO) go inline; everything else is multi-bulk so keys and values
//! may contain whitespace and line terminators.
//!
//! ## Reply Format
//! ```text
//! Status:      +<text>\r\n
//! Error:       -<message>\r\n
//! Bulk:        $<len>\r\n<body>\r\n        ($-1\r\n = absent)
//! Multi-bulk:  *<count>\r\n  followed by <count> bulk segments
//! ```
//!
//! The codec is pure: no I/O, no state.

mod command;
mod reply;
mod codec;

pub use command::Command;
pub use reply::Reply;
pub use codec::{
    decode_bulk, decode_multi_bulk, decode_reply, decode_status, encode_inline,
    encode_multi_bulk, frame_len, bulk_reply, error_reply, multi_bulk_reply, null_bulk_reply,
    status_reply, CRLF,
};
