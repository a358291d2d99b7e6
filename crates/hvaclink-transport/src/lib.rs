//! Non-blocking TCP transport for hvaclink.
//!
//! This is the lowest layer: host/port validation, a listener that never
//! blocks on accept, and per-session [`Connection`]s that track writable
//! readiness and keep a pending write buffer. Readiness itself is driven by
//! the server's `mio` poll; nothing here waits.

pub mod connection;
pub mod endpoint;
pub mod error;
pub mod listener;

pub use connection::{Connection, ReadOutcome, WriteOutcome};
pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::Listener;
