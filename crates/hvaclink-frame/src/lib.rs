//! Delimited text packet framing for hvaclink.
//!
//! Every packet on the wire looks like `*command|data|&`:
//! - a start byte (`*`)
//! - a short command token, then a field separator (`|`)
//! - optional data, then a second field separator
//! - an end byte (`&`)
//!
//! There is no length prefix and no escaping. The framer scans for the
//! delimiters, skips any noise between packets, and drops malformed ones.
//! [`FrameAssembler`] adds per-connection reassembly of packets that straddle
//! two reads.

pub mod assembler;
#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod config;
pub mod delimiters;
pub mod error;
pub mod packet;
pub mod reader;
pub mod writer;

pub use assembler::FrameAssembler;
#[cfg(feature = "async")]
pub use async_codec::PacketCodec;
pub use codec::{decode_into, decode_packets, encode_packet, encode_to_string, Scan};
pub use config::{FrameConfig, ReassemblyMode, DEFAULT_MAX_RESIDUAL};
pub use delimiters::{Delimiters, END_OF_PACKET, FIELD_SEPARATOR, START_OF_PACKET};
pub use error::{FrameError, Result};
pub use packet::Packet;
pub use reader::{PacketReader, READ_CHUNK_SIZE};
pub use writer::PacketWriter;
