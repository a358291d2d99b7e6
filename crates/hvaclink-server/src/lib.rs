//! Connection multiplexer and command dispatch for hvaclink.
//!
//! A [`Server`] owns one listening socket and any number of client
//! sessions on a single thread. Each readiness wake-up is handled to
//! completion: accept new clients, read what arrived, frame it into
//! [`Packet`](hvaclink_frame::Packet)s, hand them to the
//! [`CommandProcessor`] in arrival order, and write each response back on
//! the session it came from.
//!
//! ```no_run
//! use hvaclink_server::{start, ServerStatus};
//!
//! let status = start("127.0.0.1", 62501, |command: &str, data: &str| match command {
//!     "GZ1" => format!("*GZ1|{data}|&"),
//!     _ => String::new(),
//! });
//! assert_eq!(status, ServerStatus::ExitFailure);
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod processor;
pub mod server;
pub mod status;

pub use client::Client;
pub use config::{
    ServerConfig, WritePolicy, DEFAULT_EVENTS_CAPACITY, DEFAULT_HOST, DEFAULT_MAX_PENDING_BYTES,
    DEFAULT_MAX_READS_PER_EVENT, DEFAULT_PORT, DEFAULT_READ_BUFFER_SIZE,
};
pub use dispatch::{ConnectionSink, DispatchQueue, DispatchReport, ResponseSink};
pub use error::{Result, ServerError};
pub use processor::{spawn_processor, CommandProcessor, ProcessorClient};
pub use server::{start, Server, ServerHandle};
pub use status::ServerStatus;
