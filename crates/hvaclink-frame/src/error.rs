/// Errors that can occur during packet framing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The delimiter set cannot frame packets unambiguously.
    #[error("invalid delimiters: {0}")]
    InvalidDelimiters(String),

    /// An I/O error occurred while reading or writing packets.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete packet was received.
    #[error("connection closed (no complete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
