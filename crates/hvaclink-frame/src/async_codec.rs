//! `tokio_util::codec` integration for async transports.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{decode_into, encode_packet};
use crate::config::FrameConfig;
use crate::error::FrameError;
use crate::packet::Packet;

/// Packet codec for `tokio_util::codec::Framed`.
///
/// Always reassembles across reads: the buffer is the stream. Noise before
/// the next `START` is dropped as soon as it is seen.
#[derive(Debug, Clone, Default)]
pub struct PacketCodec {
    config: FrameConfig,
}

impl PacketCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let delimiters = self.config.delimiters;
        loop {
            let Some(start) = src.iter().position(|&b| b == delimiters.start()) else {
                src.clear();
                return Ok(None);
            };
            src.advance(start);

            let Some(end) = src.iter().position(|&b| b == delimiters.end()) else {
                if src.len() > self.config.max_residual_size {
                    warn!(
                        bytes = src.len(),
                        max = self.config.max_residual_size,
                        "unterminated packet exceeds residual limit, discarding"
                    );
                    src.clear();
                }
                return Ok(None);
            };

            let frame = src.split_to(end + 1);
            let mut decoded = Vec::with_capacity(1);
            decode_into(&frame, &delimiters, &mut decoded);
            if let Some(packet) = decoded.pop() {
                return Ok(Some(packet));
            }
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_packet(item.command(), item.data(), &self.config.delimiters, dst);
        Ok(())
    }
}
