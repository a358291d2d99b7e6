use std::fmt;
use std::io;

use hvaclink::frame::FrameError;
use hvaclink::server::{ServerError, ServerStatus};
use hvaclink::transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Process exit code for the status a server finished with.
pub fn status_code(status: ServerStatus) -> i32 {
    match status {
        ServerStatus::ExitSuccess => SUCCESS,
        ServerStatus::InvalidHostName | ServerStatus::InvalidListenerPort => USAGE,
        ServerStatus::ExitFailure | ServerStatus::Undefined => FAILURE,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidHostName | TransportError::InvalidListenerPort(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidDelimiters(_) => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn server_error(context: &str, err: ServerError) -> CliError {
    match err {
        ServerError::Transport(err) => transport_error(context, err),
        ServerError::Frame(err) => frame_error(context, err),
        ServerError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ServerError::Poll(source) | ServerError::Io(source) => io_error(context, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_arguments_are_usage_errors() {
        assert_eq!(status_code(ServerStatus::InvalidHostName), USAGE);
        assert_eq!(status_code(ServerStatus::InvalidListenerPort), USAGE);
        let err = server_error(
            "bind failed",
            ServerError::from(TransportError::InvalidListenerPort(0)),
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn receive_timeout_maps_to_timeout() {
        let err = server_error(
            "receive failed",
            ServerError::Timeout(std::time::Duration::from_secs(1)),
        );
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("receive failed: "));
    }

    #[test]
    fn closed_connection_is_plain_failure() {
        let err = server_error(
            "receive failed",
            ServerError::Frame(FrameError::ConnectionClosed),
        );
        assert_eq!(err.code, FAILURE);
    }
}
