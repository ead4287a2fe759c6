/// Errors that can occur in client and server operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] simplenet_transport::TransportError),

    /// Wire-level error.
    #[error("wire error: {0}")]
    Wire(#[from] simplenet_wire::WireError),

    /// Socket-level I/O error outside framing.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A frame carried a different number of fields than the operation expects.
    #[error("expected {expected} field(s), got {actual}")]
    UnexpectedFieldCount { expected: usize, actual: usize },

    /// The client has no active connection.
    #[error("client is not connected")]
    NotConnected,

    /// The server has not been started (or has been stopped).
    #[error("server is not running")]
    NotRunning,

    /// `start` was called on a running server.
    #[error("server is already running")]
    AlreadyRunning,

    /// The worker thread is gone.
    #[error("server worker stopped: {0}")]
    WorkerStopped(String),
}

pub type Result<T> = std::result::Result<T, PeerError>;
