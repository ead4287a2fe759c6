use std::time::Duration;

use simplenet_wire::WireConfig;

/// Default host for clients and servers.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port for clients and servers.
pub const DEFAULT_PORT: u16 = 2131;

/// Default bound on bytes queued for one client that is not reading (32 MiB).
pub const DEFAULT_MAX_PENDING_OUTPUT: usize = 32 * 1024 * 1024;

/// Configuration for a [`crate::Server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to listen on.
    pub host: String,
    /// Port to listen on. `0` picks an ephemeral port.
    pub port: u16,
    /// Codec limits for client connections.
    pub wire: WireConfig,
    /// Bytes that may wait in one client's outbound queue. A client whose
    /// queue grows past this is disconnected.
    pub max_pending_output: usize,
}

impl ServerConfig {
    /// Configuration for `host:port` with default limits.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            wire: WireConfig::default(),
            max_pending_output: DEFAULT_MAX_PENDING_OUTPUT,
        }
    }

    /// Override codec limits.
    pub fn with_wire_config(mut self, wire: WireConfig) -> Self {
        self.wire = wire;
        self
    }

    /// Override the per-client outbound queue bound.
    pub fn with_max_pending_output(mut self, bytes: usize) -> Self {
        self.max_pending_output = bytes;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

/// Configuration for a [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Host to connect to.
    pub host: String,
    /// Port to connect to.
    pub port: u16,
    /// Codec limits for the connection.
    pub wire: WireConfig,
    /// Per-candidate connect timeout. Default: none (OS default).
    pub connect_timeout: Option<Duration>,
    /// Read timeout applied to the socket. Default: none (block forever).
    pub read_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Configuration for `host:port` with defaults for everything else.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            wire: WireConfig::default(),
            connect_timeout: None,
            read_timeout: None,
        }
    }

    /// Override codec limits.
    pub fn with_wire_config(mut self, wire: WireConfig) -> Self {
        self.wire = wire;
        self
    }

    /// Bound each connect attempt.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Bound each blocking read.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}
