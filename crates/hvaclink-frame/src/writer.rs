use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::encode_packet;
use crate::delimiters::Delimiters;
use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Writes complete packets to any blocking `Write` stream.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
    delimiters: Delimiters,
}

impl<T: Write> PacketWriter<T> {
    /// Create a packet writer using the default delimiters.
    pub fn new(inner: T) -> Self {
        Self::with_delimiters(inner, Delimiters::default())
    }

    pub fn with_delimiters(inner: T, delimiters: Delimiters) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(64),
            delimiters,
        }
    }

    /// Write a complete packet (blocking).
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.send(packet.command(), packet.data())
    }

    /// Encode and send a command with its data.
    pub fn send(&mut self, command: &str, data: &str) -> Result<()> {
        self.buf.clear();
        encode_packet(command, data, &self.delimiters, &mut self.buf);
        let encoded = self.buf.split().freeze();
        self.send_raw(&encoded)
    }

    /// Send bytes as they are, without framing.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_wire_format() {
        let mut writer = PacketWriter::new(Vec::new());
        writer.send("GZ1", "3").unwrap();
        writer.write_packet(&Packet::new("RS", "")).unwrap();
        assert_eq!(writer.into_inner(), b"*GZ1|3|&*RS||&");
    }

    #[test]
    fn writes_with_custom_delimiters() {
        let d: Delimiters = "<;>".parse().unwrap();
        let mut writer = PacketWriter::with_delimiters(Vec::new(), d);
        writer.send("SP", "22").unwrap();
        assert_eq!(writer.get_ref().as_slice(), b"<SP;22;>");
    }

    #[test]
    fn send_raw_is_unframed() {
        let mut writer = PacketWriter::new(Vec::new());
        writer.send_raw(b"junk*VS|x|&").unwrap();
        assert_eq!(writer.into_inner(), b"junk*VS|x|&");
    }

    #[test]
    fn zero_write_is_connection_closed() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = PacketWriter::new(Full);
        assert!(matches!(
            writer.send("GZ1", "3").unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = PacketWriter::new(left);
        let mut reader = crate::reader::PacketReader::new(right);

        writer.send("GZ1", "3").unwrap();
        writer.send("GZ2", "").unwrap();

        assert_eq!(reader.read_packet().unwrap(), Packet::new("GZ1", "3"));
        assert_eq!(reader.read_packet().unwrap(), Packet::new("GZ2", ""));
    }
}
