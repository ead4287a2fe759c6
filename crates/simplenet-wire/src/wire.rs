use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use serde_json::Value;

use crate::codec::WireConfig;
use crate::error::Result;
use crate::reader::WireReader;
use crate::writer::WireWriter;

/// The framing codec bound to one connected stream.
///
/// Holds a reader and a writer over two handles to the same socket, so one
/// thread may read while another writes. No two readers and no two writers
/// may be active at the same time.
pub struct Wire<S> {
    reader: WireReader<S>,
    writer: WireWriter<S>,
}

impl<S> Wire<S> {
    /// Build a wire from separate read and write handles of one stream.
    pub fn from_parts(read_half: S, write_half: S, config: WireConfig) -> Self {
        Self {
            reader: WireReader::with_config(read_half, config.clone()),
            writer: WireWriter::with_config(write_half, config),
        }
    }

    /// Borrow the stream used for writing.
    pub fn get_ref(&self) -> &S {
        self.writer.get_ref()
    }

    /// Codec configuration.
    pub fn config(&self) -> &WireConfig {
        self.reader.config()
    }

    /// Split into the reader and writer halves.
    pub fn into_parts(self) -> (WireReader<S>, WireWriter<S>) {
        (self.reader, self.writer)
    }
}

impl<S: Read + Write> Wire<S> {
    /// Block until a complete frame arrives and return its fields.
    pub fn read(&mut self) -> Result<Vec<Value>> {
        self.reader.read_fields()
    }

    /// Return the next complete frame if one can be read without blocking.
    pub fn try_read(&mut self) -> Result<Option<Vec<Value>>> {
        self.reader.try_read_fields()
    }

    /// Encode the fields as one frame and write it.
    pub fn send(&mut self, fields: &[Value]) -> Result<()> {
        self.writer.send(fields)
    }
}

impl Wire<TcpStream> {
    /// Wrap a connected TCP stream.
    pub fn tcp(stream: TcpStream, config: WireConfig) -> std::io::Result<Self> {
        let read_half = stream.try_clone()?;
        Ok(Self::from_parts(read_half, stream, config))
    }

    /// Address of the remote end.
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.get_ref().peer_addr()
    }

    /// Address of the local end.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.get_ref().local_addr()
    }

    /// Shut down both directions of the socket.
    pub fn shutdown(&self) -> std::io::Result<()> {
        self.get_ref().shutdown(Shutdown::Both)
    }

    /// Create a second wire over new handles to the same socket.
    ///
    /// Buffered but unread bytes stay with `self`.
    pub fn try_clone(&self) -> std::io::Result<Self> {
        let stream = self.get_ref().try_clone()?;
        Self::tcp(stream, self.config().clone())
    }
}

#[cfg(unix)]
impl<S: std::os::fd::AsRawFd> std::os::fd::AsRawFd for Wire<S> {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.writer.get_ref().as_raw_fd()
    }
}

impl<S> std::fmt::Debug for Wire<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wire").finish_non_exhaustive()
    }
}
