use hvaclink_transport::TransportError;

use crate::status::ServerStatus;

/// Errors that can occur in server and client operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Transport-level error (validation, resolve, bind, connect).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] hvaclink_frame::FrameError),

    /// The readiness poll itself failed.
    #[error("readiness poll failed: {0}")]
    Poll(std::io::Error),

    /// An I/O error occurred while setting up the server.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No packet arrived within the allotted time.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ServerError {
    /// The status code this error reports when it ends the server.
    pub fn status(&self) -> ServerStatus {
        match self {
            ServerError::Transport(TransportError::InvalidHostName) => {
                ServerStatus::InvalidHostName
            }
            ServerError::Transport(TransportError::InvalidListenerPort(_)) => {
                ServerStatus::InvalidListenerPort
            }
            _ => ServerStatus::ExitFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
