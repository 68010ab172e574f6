//! Command definitions
//!
//! Typed requests for the supported protocol subset.

use super::codec::{encode_inline, encode_multi_bulk};

/// A request to send to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness check
    Ping,

    /// Server diagnostics
    Info,

    /// Get a value by key
    Get { key: Vec<u8> },

    /// Set a key-value pair
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Get several values, one reply element per key
    MGet { keys: Vec<Vec<u8>> },

    /// Set several key-value pairs at once
    MSet { pairs: Vec<(Vec<u8>, Vec<u8>)> },

    /// List keys matching a glob-style pattern
    Keys { pattern: Vec<u8> },
}

impl Command {
    /// Command name as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Info => "INFO",
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::MGet { .. } => "MGET",
            Command::MSet { .. } => "MSET",
            Command::Keys { .. } => "KEYS",
        }
    }

    /// Arguments following the command name, in wire order
    pub fn args(&self) -> Vec<&[u8]> {
        match self {
            Command::Ping | Command::Info => Vec::new(),
            Command::Get { key } => vec![key.as_slice()],
            Command::Set { key, value } => vec![key.as_slice(), value.as_slice()],
            Command::MGet { keys } => keys.iter().map(Vec::as_slice).collect(),
            Command::MSet { pairs } => pairs
                .iter()
                .flat_map(|(k, v)| [k.as_slice(), v.as_slice()])
                .collect(),
            Command::Keys { pattern } => vec![pattern.as_slice()],
        }
    }

    /// Encode to wire bytes.
    ///
    /// Argument-free commands use inline framing, the rest multi-bulk.
    pub fn encode(&self) -> Vec<u8> {
        let args = self.args();
        if args.is_empty() {
            encode_inline(self.name())
        } else {
            encode_multi_bulk(self.name(), &args)
        }
    }
}
