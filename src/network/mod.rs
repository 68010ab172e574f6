//! Network Module
//!
//! Socket ownership and the blocking request/reply primitive.
//!
//! ## State Machine
//! ```text
//!            connect (blocking, ok)
//!   Closed ─────────────────────────────▶ Open
//!     │                                   ▲  │
//!     │ connect (background)              │  │ disconnect / fatal I/O
//!     ▼                 handshake done    │  ▼
//!   Opening ──────────────────────────────┘ Closed
//! ```
//! Only one request is outstanding per connection; requests are serialized
//! by an internal lock.

mod connection;

pub use connection::{Connection, ConnectionState};
