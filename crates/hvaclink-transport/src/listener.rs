use std::io::ErrorKind;
use std::net::SocketAddr;

use tracing::{debug, info};

use crate::connection::Connection;
use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// Non-blocking TCP listener that hands out session [`Connection`]s.
pub struct Listener {
    inner: mio::net::TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Resolve `endpoint` and bind a non-blocking listener on it.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let addr = endpoint.resolve()?;
        Self::bind_addr(addr)
    }

    /// Bind a non-blocking listener on an already resolved address.
    pub fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let inner = mio::net::TcpListener::bind(addr)
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = inner.local_addr()?;
        info!(%local_addr, "listening for connections");
        Ok(Self { inner, local_addr })
    }

    /// Adopt a listener bound elsewhere, switching it to non-blocking mode.
    pub fn from_std(listener: std::net::TcpListener) -> Result<Self> {
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "adopted listening socket");
        Ok(Self {
            inner: mio::net::TcpListener::from_std(listener),
            local_addr,
        })
    }

    /// Accept one pending connection.
    ///
    /// Returns `Ok(None)` once the accept backlog is empty.
    pub fn accept(&self) -> Result<Option<Connection>> {
        loop {
            match self.inner.accept() {
                Ok((stream, peer)) => {
                    // Small command packets; do not wait to coalesce them.
                    if let Err(err) = stream.set_nodelay(true) {
                        debug!(%peer, error = %err, "failed to set TCP_NODELAY");
                    }
                    return Ok(Some(Connection::new(stream, peer)));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(TransportError::Accept(err)),
            }
        }
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The underlying mio source, for poll registration.
    pub fn source_mut(&mut self) -> &mut mio::net::TcpListener {
        &mut self.inner
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}
