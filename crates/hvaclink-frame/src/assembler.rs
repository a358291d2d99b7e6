use bytes::BytesMut;
use tracing::{debug, warn};

use crate::codec::{decode_into, Scan};
use crate::config::{FrameConfig, ReassemblyMode};
use crate::packet::Packet;

/// Per-connection framing state.
///
/// Feeds each received chunk through the framer. In
/// [`ReassemblyMode::Strict`] an unterminated trailing packet is kept and
/// prepended to the next chunk; in [`ReassemblyMode::PerRead`] it is
/// discarded with the rest of the chunk's noise.
#[derive(Debug)]
pub struct FrameAssembler {
    config: FrameConfig,
    residual: BytesMut,
}

impl FrameAssembler {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            residual: BytesMut::new(),
        }
    }

    /// Frame one received chunk, appending complete packets to `out` in wire
    /// order. Returns the scan summary for the bytes examined.
    pub fn push<E>(&mut self, chunk: &[u8], out: &mut E) -> Scan
    where
        E: Extend<Packet>,
    {
        let delimiters = self.config.delimiters;

        if self.config.reassembly == ReassemblyMode::PerRead {
            let scan = decode_into(chunk, &delimiters, out);
            if let Some(offset) = scan.unterminated {
                debug!(
                    bytes = chunk.len() - offset,
                    "discarding unterminated packet at end of read"
                );
            }
            return scan;
        }

        if self.residual.is_empty() {
            let scan = decode_into(chunk, &delimiters, out);
            if let Some(offset) = scan.unterminated {
                self.keep_residual(&chunk[offset..]);
            }
            scan
        } else {
            self.residual.extend_from_slice(chunk);
            let buffered = self.residual.split();
            let scan = decode_into(&buffered, &delimiters, out);
            if let Some(offset) = scan.unterminated {
                self.keep_residual(&buffered[offset..]);
            }
            scan
        }
    }

    fn keep_residual(&mut self, fragment: &[u8]) {
        if fragment.len() > self.config.max_residual_size {
            warn!(
                bytes = fragment.len(),
                max = self.config.max_residual_size,
                "unterminated packet exceeds residual limit, discarding"
            );
            return;
        }
        debug!(bytes = fragment.len(), "holding unterminated packet for next read");
        self.residual.extend_from_slice(fragment);
    }

    /// Bytes of an unterminated packet waiting for more input.
    pub fn residual_len(&self) -> usize {
        self.residual.len()
    }

    /// Drop any held fragment.
    pub fn clear(&mut self) {
        self.residual.clear();
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
