//! Single-threaded TCP packet multiplexer for HVAC controller links.
//!
//! Remote controllers send `*COMMAND|DATA|&` packets over plain TCP. One
//! thread accepts every connection, reassembles and decodes packets, hands
//! them to a command processor in arrival order, and writes the processor's
//! response back on the connection the packet came from.
//!
//! # Crate Structure
//!
//! - [`transport`]: endpoint validation and non-blocking TCP sockets
//! - [`frame`]: the delimited packet format and per-connection reassembly
//! - [`server`]: the readiness loop, dispatch queue and processor contract
//! - [`zone`]: a thermostat zone processor for the two-zone simulator

/// Re-export transport types.
pub mod transport {
    pub use hvaclink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use hvaclink_frame::*;
}

/// Re-export server types.
pub mod server {
    pub use hvaclink_server::*;
}

pub mod zone;
