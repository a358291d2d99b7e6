use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::error::Result;

/// Result of one bounded read on a session connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were copied into the caller's buffer.
    Data(usize),
    /// The peer closed its side of the connection (zero-byte read).
    Closed,
    /// No more data is available until the next readable event.
    WouldBlock,
}

/// What happened to a response handed to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every byte reached the socket.
    Written,
    /// Some or all bytes are waiting in the pending write buffer.
    Queued,
    /// The connection was not writable and the bytes were discarded.
    Dropped,
}

/// One accepted client session.
///
/// Owns the non-blocking stream, the last known writable readiness, and a
/// buffer of response bytes the socket has not accepted yet.
pub struct Connection {
    stream: mio::net::TcpStream,
    peer: SocketAddr,
    writable: bool,
    pending: BytesMut,
}

impl Connection {
    pub(crate) fn new(stream: mio::net::TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            writable: false,
            pending: BytesMut::new(),
        }
    }

    /// Adopt a connected std stream, switching it to non-blocking mode.
    pub fn from_std(stream: std::net::TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nonblocking(true)?;
        Ok(Self::new(mio::net::TcpStream::from_std(stream), peer))
    }

    /// Remote address of the client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the socket was last reported writable.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Record writable readiness reported by the poller.
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Bytes queued but not yet written.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Read at most `buf.len()` bytes.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<ReadOutcome> {
        loop {
            match self.stream.read(buf) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => return Ok(ReadOutcome::Data(n)),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Ok(ReadOutcome::WouldBlock)
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Write now if the socket is writable, otherwise drop the bytes.
    ///
    /// A response the socket only partly accepts keeps its tail in the
    /// pending buffer so the byte stream never carries a truncated packet.
    pub fn send_best_effort(&mut self, bytes: &[u8]) -> std::io::Result<WriteOutcome> {
        if !self.writable || !self.pending.is_empty() {
            return Ok(WriteOutcome::Dropped);
        }
        self.write_or_queue(bytes)
    }

    /// Write now if possible and queue whatever the socket did not accept.
    ///
    /// Queued bytes keep their order relative to earlier responses.
    pub fn send_buffered(&mut self, bytes: &[u8]) -> std::io::Result<WriteOutcome> {
        if !self.writable || !self.pending.is_empty() {
            self.pending.extend_from_slice(bytes);
            return Ok(WriteOutcome::Queued);
        }
        self.write_or_queue(bytes)
    }

    /// Push pending bytes to the socket. Returns the number written.
    pub fn flush_pending(&mut self) -> std::io::Result<usize> {
        let mut total = 0usize;
        while !self.pending.is_empty() && self.writable {
            let n = write_some(&mut self.stream, &mut self.writable, &self.pending)?;
            self.pending.advance(n);
            total += n;
        }
        Ok(total)
    }

    fn write_or_queue(&mut self, bytes: &[u8]) -> std::io::Result<WriteOutcome> {
        let mut offset = 0usize;
        while offset < bytes.len() && self.writable {
            offset += write_some(&mut self.stream, &mut self.writable, &bytes[offset..])?;
        }
        if offset == bytes.len() {
            Ok(WriteOutcome::Written)
        } else {
            self.pending.extend_from_slice(&bytes[offset..]);
            Ok(WriteOutcome::Queued)
        }
    }

    /// The underlying mio source, for poll registration.
    pub fn source_mut(&mut self) -> &mut mio::net::TcpStream {
        &mut self.stream
    }

    /// Shut down both halves of the stream. Errors are ignored; the peer may
    /// already be gone.
    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("writable", &self.writable)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// One write attempt. A `WouldBlock` clears the writable flag and reports
/// zero bytes.
fn write_some(
    stream: &mut mio::net::TcpStream,
    writable: &mut bool,
    bytes: &[u8],
) -> std::io::Result<usize> {
    loop {
        match stream.write(bytes) {
            Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
            Ok(n) => {
                trace!(bytes = n, "wrote to socket");
                return Ok(n);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                *writable = false;
                return Ok(0);
            }
            Err(err) => return Err(err),
        }
    }
}
