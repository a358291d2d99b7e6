use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use hvaclink_frame::{FrameConfig, FrameError, Packet, PacketReader, PacketWriter};
use hvaclink_transport::{Endpoint, TransportError};
use tracing::debug;

use crate::error::{Result, ServerError};

/// Blocking client speaking the packet protocol to a server.
///
/// Responses are framed with the same rules the server applies to requests,
/// including reassembly across reads.
pub struct Client {
    reader: PacketReader<TcpStream>,
    writer: PacketWriter<TcpStream>,
    peer: SocketAddr,
}

impl Client {
    /// Resolve `endpoint` and connect.
    pub fn connect(endpoint: &Endpoint, config: FrameConfig) -> Result<Self> {
        let addr = endpoint.resolve()?;
        Self::connect_addr(addr, config)
    }

    /// Connect to an already resolved address.
    pub fn connect_addr(addr: SocketAddr, config: FrameConfig) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|source| TransportError::Connect { addr, source })?;
        stream.set_nodelay(true)?;
        let reader_stream = stream.try_clone()?;
        debug!(%addr, "connected to server");

        Ok(Self {
            writer: PacketWriter::with_delimiters(stream, config.delimiters),
            reader: PacketReader::with_config(reader_stream, config),
            peer: addr,
        })
    }

    /// Send one packet.
    pub fn send(&mut self, command: &str, data: &str) -> Result<()> {
        self.writer.send(command, data)?;
        Ok(())
    }

    pub fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        self.writer.write_packet(packet)?;
        Ok(())
    }

    /// Send bytes without framing them.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.send_raw(bytes)?;
        Ok(())
    }

    /// Wait for the next response packet.
    ///
    /// `None` waits indefinitely.
    pub fn recv(&mut self, timeout: Option<Duration>) -> Result<Packet> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        match self.reader.read_packet() {
            Ok(packet) => Ok(packet),
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Err(ServerError::Timeout(timeout.unwrap_or_default()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Close the sending half. The server treats this as the end of the
    /// session.
    pub fn shutdown_write(&self) -> Result<()> {
        self.writer.get_ref().shutdown(std::net::Shutdown::Write)?;
        Ok(())
    }

    /// Address of the server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("peer", &self.peer).finish()
    }
}
