/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The declared payload length exceeds the configured maximum.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A single field exceeds the configured maximum.
    #[error("field too large ({size} bytes, max {max})")]
    FieldTooLarge { size: usize, max: usize },

    /// Fewer bytes were available than a length prefix declared.
    #[error("truncated frame (expected {expected} bytes, got {available})")]
    Truncated { expected: usize, available: usize },

    /// A field was not valid UTF-8 JSON, or a value could not be encoded.
    #[error("field encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred while reading or writing frames.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a frame started.
    #[error("connection closed")]
    ConnectionClosed,
}

impl WireError {
    /// Whether this error is a framing failure rather than a transport failure.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            WireError::FrameTooLarge { .. }
                | WireError::FieldTooLarge { .. }
                | WireError::Truncated { .. }
                | WireError::Json(_)
                | WireError::ConnectionClosed
        )
    }

    /// Whether the underlying stream reported it would block.
    pub fn is_would_block(&self) -> bool {
        matches!(self, WireError::Io(err) if err.kind() == std::io::ErrorKind::WouldBlock)
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
