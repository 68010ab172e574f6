//! # kvlink
//!
//! A minimal blocking client for a Redis-style key-value store:
//! - Inline and multi-bulk command encoding
//! - Bulk / multi-bulk / status reply decoding with explicit "absent" values
//! - One persistent connection per target, one request in flight at a time
//! - Typed operations: PING, GET, SET, MGET, MSET, KEYS, INFO
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Client                                  │
//! │        ping / get / set / mget / mset / keys / info          │
//! └──────────────┬──────────────────────────────▲───────────────┘
//!                │ Command::encode              │ decode_*
//!                ▼                              │
//! ┌─────────────────────────────────────────────┴───────────────┐
//! │                    Connection                                │
//! │   Closed / Opening / Open, send_and_await_reply(timeout)     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!                   TCP socket
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use kvlink::Client;
//!
//! let client = Client::connect_addr("127.0.0.1", 6379)?;
//! client.set("greeting", "hello world")?;
//! assert_eq!(client.get("greeting")?, Some(b"hello world".to_vec()));
//! # Ok::<(), kvlink::KvError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use client::{Client, KeyValueMap};
pub use network::{Connection, ConnectionState};
pub use protocol::{Command, Reply};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvlink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
