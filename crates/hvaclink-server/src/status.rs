//! Server status codes.
//!
//! A status is set once at startup and again when the server stops. It is
//! never used for per-connection errors.

use std::fmt;

/// Outcome of starting (and eventually stopping) a server.
///
/// The numeric codes match the ones the controller-side clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServerStatus {
    /// Not started yet.
    #[default]
    Undefined,
    /// Listening, or stopped cleanly.
    ExitSuccess,
    /// Setup or the readiness loop failed.
    ExitFailure,
    /// The listening host was empty.
    InvalidHostName,
    /// The listening port was not positive.
    InvalidListenerPort,
}

impl ServerStatus {
    /// Numeric status code.
    pub fn code(self) -> i32 {
        match self {
            ServerStatus::Undefined => 0,
            ServerStatus::ExitSuccess => 1,
            ServerStatus::ExitFailure => -1,
            ServerStatus::InvalidHostName => 100,
            ServerStatus::InvalidListenerPort => 101,
        }
    }

    /// Look up a status by numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ServerStatus::Undefined),
            1 => Some(ServerStatus::ExitSuccess),
            -1 => Some(ServerStatus::ExitFailure),
            100 => Some(ServerStatus::InvalidHostName),
            101 => Some(ServerStatus::InvalidListenerPort),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerStatus::Undefined => "UNDEFINED",
            ServerStatus::ExitSuccess => "EXIT_SUCCESS",
            ServerStatus::ExitFailure => "EXIT_FAILURE",
            ServerStatus::InvalidHostName => "INVALID_HOST_NAME",
            ServerStatus::InvalidListenerPort => "INVALID_LISTENER_PORT",
        }
    }

    /// True for the two argument-validation failures.
    pub fn is_invalid_argument(self) -> bool {
        matches!(
            self,
            ServerStatus::InvalidHostName | ServerStatus::InvalidListenerPort
        )
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}
