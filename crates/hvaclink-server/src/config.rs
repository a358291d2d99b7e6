use std::fmt;
use std::str::FromStr;

use hvaclink_frame::FrameConfig;
use hvaclink_transport::Endpoint;

/// Host the simulator listens on by default.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the simulator advertises to controller clients.
pub const DEFAULT_PORT: u16 = 62501;

/// Bytes requested per read on a session connection.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Readiness events collected per poll.
pub const DEFAULT_EVENTS_CAPACITY: usize = 128;

/// Reads a session gets per readiness cycle before others are served.
pub const DEFAULT_MAX_READS_PER_EVENT: usize = 16;

/// Unsent response bytes a session may hold before its reads pause.
pub const DEFAULT_MAX_PENDING_BYTES: usize = 256 * 1024;

/// What the dispatch step does with a response the socket cannot take
/// right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Queue unsent bytes on the connection and flush them, in order, on the
    /// next writable readiness.
    #[default]
    Buffered,
    /// Write only if the connection is writable at dispatch time; otherwise
    /// drop the response. At most once, never retried.
    BestEffort,
}

impl WritePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            WritePolicy::Buffered => "buffered",
            WritePolicy::BestEffort => "best-effort",
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buffered" => Ok(Self::Buffered),
            "best-effort" | "besteffort" => Ok(Self::BestEffort),
            other => Err(format!(
                "unknown write policy {other:?} (expected buffered|best-effort)"
            )),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listening host: a literal address or a resolvable name.
    pub host: String,
    /// Listening TCP port. Zero is rejected.
    pub port: u16,
    /// Bytes requested per read. Default: 1024.
    pub read_buffer_size: usize,
    /// Handling of responses the socket cannot take immediately.
    pub write_policy: WritePolicy,
    /// Framing applied to every session.
    pub frame: FrameConfig,
    /// Cap on concurrently open sessions. `None` means unbounded.
    pub max_connections: Option<usize>,
    /// Readiness events collected per poll.
    pub events_capacity: usize,
    /// Chunks read from one session per cycle. A session with more input
    /// waiting is read again on the next cycle.
    pub max_reads_per_event: usize,
    /// Reading from a session stops while it has at least this many
    /// response bytes waiting to be written, and resumes once they flush.
    pub max_pending_bytes: usize,
}

impl ServerConfig {
    /// Default configuration listening on `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Validate host and port.
    pub fn endpoint(&self) -> hvaclink_transport::Result<Endpoint> {
        Endpoint::new(self.host.clone(), self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_policy: WritePolicy::default(),
            frame: FrameConfig::default(),
            max_connections: None,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            max_reads_per_event: DEFAULT_MAX_READS_PER_EVENT,
            max_pending_bytes: DEFAULT_MAX_PENDING_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use hvaclink_transport::TransportError;

    use super::*;

    #[test]
    fn defaults_match_simulator() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 62501);
        assert_eq!(cfg.read_buffer_size, 1024);
        assert_eq!(cfg.write_policy, WritePolicy::Buffered);
        assert!(cfg.max_connections.is_none());
        assert_eq!(cfg.max_reads_per_event, DEFAULT_MAX_READS_PER_EVENT);
        assert_eq!(cfg.max_pending_bytes, DEFAULT_MAX_PENDING_BYTES);
    }

    #[test]
    fn endpoint_validates_host_and_port() {
        assert!(ServerConfig::new("localhost", 4000).endpoint().is_ok());
        assert!(matches!(
            ServerConfig::new("", 4000).endpoint(),
            Err(TransportError::InvalidHostName)
        ));
        assert!(matches!(
            ServerConfig::new("localhost", 0).endpoint(),
            Err(TransportError::InvalidListenerPort(0))
        ));
    }

    #[test]
    fn write_policy_parses() {
        assert_eq!("buffered".parse(), Ok(WritePolicy::Buffered));
        assert_eq!("best-effort".parse(), Ok(WritePolicy::BestEffort));
        assert!("eventually".parse::<WritePolicy>().is_err());
    }
}
