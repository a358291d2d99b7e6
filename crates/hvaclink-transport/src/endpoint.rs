use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};

use tracing::debug;

use crate::error::{Result, TransportError};

/// A validated `host:port` pair that a server listens on or a client
/// connects to.
///
/// The host may be a literal address (`127.0.0.1`, `::1`) or a name that
/// the system resolver understands (`localhost`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Validate a host and port.
    ///
    /// An empty host is rejected with [`TransportError::InvalidHostName`] and
    /// port zero with [`TransportError::InvalidListenerPort`]. The host check
    /// runs first.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_port_number(host, i64::from(port))
    }

    /// Like [`Endpoint::new`] for a port number that has not been narrowed
    /// to `u16` yet, such as a command-line argument. Anything outside
    /// `1..=65535` is [`TransportError::InvalidListenerPort`].
    pub fn with_port_number(host: impl Into<String>, port: i64) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(TransportError::InvalidHostName);
        }
        let port = u16::try_from(port)
            .ok()
            .filter(|&port| port != 0)
            .ok_or(TransportError::InvalidListenerPort(port))?;
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to the first socket address the resolver returns.
    pub fn resolve(&self) -> Result<SocketAddr> {
        let resolve_err = |source| TransportError::Resolve {
            host: self.host.clone(),
            port: self.port,
            source,
        };

        let mut addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(resolve_err)?;

        let addr = addrs.next().ok_or_else(|| {
            resolve_err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "resolver returned no addresses",
            ))
        })?;
        debug!(host = %self.host, %addr, "resolved endpoint");
        Ok(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
