use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::assembler::FrameAssembler;
use crate::config::FrameConfig;
use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Bytes requested from the stream per read.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete packets from any blocking `Read` stream.
///
/// Several packets decoded from one read are handed out one at a time, in
/// wire order.
pub struct PacketReader<T> {
    inner: T,
    assembler: FrameAssembler,
    ready: VecDeque<Packet>,
}

impl<T: Read> PacketReader<T> {
    /// Create a packet reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a packet reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            assembler: FrameAssembler::new(config),
            ready: VecDeque::new(),
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A read
    /// timeout on the stream surfaces as `FrameError::Io`.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.ready.pop_front() {
                return Ok(packet);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.assembler.push(&chunk[..read], &mut self.ready);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
