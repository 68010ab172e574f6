//! Reply definitions
//!
//! Tagged view of the reply shapes the supported commands produce.

use crate::error::{KvError, Result};

/// A decoded reply from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`, `+PONG`, ...
    Status(String),

    /// Single value; `None` when the store reports the key as absent
    Bulk(Option<Vec<u8>>),

    /// Ordered values; `None` elements mark absent keys
    MultiBulk(Vec<Option<Vec<u8>>>),
}

impl Reply {
    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Status(_) => "status",
            Reply::Bulk(_) => "bulk",
            Reply::MultiBulk(_) => "multi-bulk",
        }
    }

    pub fn into_status(self) -> Result<String> {
        match self {
            Reply::Status(text) => Ok(text),
            other => Err(mismatch("status", &other)),
        }
    }

    pub fn into_bulk(self) -> Result<Option<Vec<u8>>> {
        match self {
            Reply::Bulk(value) => Ok(value),
            other => Err(mismatch("bulk", &other)),
        }
    }

    pub fn into_multi_bulk(self) -> Result<Vec<Option<Vec<u8>>>> {
        match self {
            Reply::MultiBulk(values) => Ok(values),
            other => Err(mismatch("multi-bulk", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Reply) -> KvError {
    KvError::protocol(format!("expected {} reply, got {}", expected, got.kind()))
}
