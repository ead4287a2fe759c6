use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use simplenet_transport::TcpTransport;
use simplenet_wire::Wire;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{PeerError, Result};

/// A connection to one simplenet server.
///
/// Every message is a frame holding exactly one field. Dropping a client
/// closes its connection.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    wire: Option<Wire<TcpStream>>,
    owns_connection: bool,
}

impl Client {
    /// Create an unconnected client for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_config(ClientConfig::new(host, port))
    }

    /// Create an unconnected client with explicit configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        info!(host = %config.host, port = config.port, "creating client");
        Self {
            config,
            wire: None,
            owns_connection: true,
        }
    }

    /// Create a client and connect it.
    pub fn connect_to(host: impl Into<String>, port: u16) -> Result<Self> {
        let mut client = Self::new(host, port);
        client.connect()?;
        Ok(client)
    }

    /// Resolve the configured address and connect to the first candidate that
    /// accepts. An existing connection is closed first.
    pub fn connect(&mut self) -> Result<()> {
        self.close()?;

        let stream =
            TcpTransport::connect(&self.config.host, self.config.port, self.config.connect_timeout)?;
        stream.set_read_timeout(self.config.read_timeout)?;

        let wire = Wire::tcp(stream, self.config.wire.clone())?;
        debug!(peer = ?wire.peer_addr().ok(), "client connected");
        self.wire = Some(wire);
        self.owns_connection = true;
        Ok(())
    }

    /// Send one value as a single-field frame.
    pub fn send<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.wire_mut()?.send(&[value])?;
        Ok(())
    }

    /// Block until the server sends a frame and return its only field.
    pub fn read(&mut self) -> Result<Value> {
        let mut fields = self.wire_mut()?.read()?;
        if fields.len() != 1 {
            return Err(PeerError::UnexpectedFieldCount {
                expected: 1,
                actual: fields.len(),
            });
        }
        Ok(fields.remove(0))
    }

    /// Read one value and deserialize it.
    pub fn read_as<T: DeserializeOwned>(&mut self) -> Result<T> {
        let value = self.read()?;
        Ok(serde_json::from_value(value)?)
    }

    /// Create a second handle to the same connection.
    ///
    /// Use one handle for reading and the other for writing. Dropping the
    /// clone leaves the connection open; calling [`Client::close`] on either
    /// handle shuts it down for both.
    pub fn try_clone(&self) -> Result<Self> {
        let wire = self.wire_ref()?.try_clone()?;
        Ok(Self {
            config: self.config.clone(),
            wire: Some(wire),
            owns_connection: false,
        })
    }

    /// Whether the client currently holds a connection.
    pub fn is_connected(&self) -> bool {
        self.wire.is_some()
    }

    /// Address of the server end.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.wire_ref()?.peer_addr()?)
    }

    /// Address of the local end.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.wire_ref()?.local_addr()?)
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shut down both directions and close the socket.
    ///
    /// Closing an unconnected client is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(wire) = self.wire.take() else {
            return Ok(());
        };

        info!("closing connection");
        match wire.shutdown() {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotConnected => {
                debug!("socket already disconnected");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn wire_ref(&self) -> Result<&Wire<TcpStream>> {
        self.wire.as_ref().ok_or(PeerError::NotConnected)
    }

    fn wire_mut(&mut self) -> Result<&mut Wire<TcpStream>> {
        self.wire.as_mut().ok_or(PeerError::NotConnected)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if !self.owns_connection {
            return;
        }
        if let Err(err) = self.close() {
            debug!(error = %err, "error closing client on drop");
        }
    }
}
