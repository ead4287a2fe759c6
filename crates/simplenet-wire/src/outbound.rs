use std::io::{ErrorKind, Write};

use bytes::{Buf, BytesMut};
use serde_json::Value;
use tracing::trace;

use crate::codec::{encode_frame, WireConfig};
use crate::error::{Result, WireError};

/// Encoded frames waiting for a non-blocking stream to accept them.
///
/// Frames are appended whole by [`OutboundBuffer::push`] and drained by
/// [`OutboundBuffer::flush_to`], which writes as much as the stream takes
/// and stops at `WouldBlock`. The unwritten tail stays queued in order, so
/// a frame is never interleaved with another or sent twice.
#[derive(Debug)]
pub struct OutboundBuffer {
    buf: BytesMut,
    config: WireConfig,
}

impl OutboundBuffer {
    pub fn new() -> Self {
        Self::with_config(WireConfig::default())
    }

    pub fn with_config(config: WireConfig) -> Self {
        Self {
            buf: BytesMut::new(),
            config,
        }
    }

    /// Encode the fields as one frame and queue it behind any pending bytes.
    ///
    /// On error nothing is queued.
    pub fn push(&mut self, fields: &[Value]) -> Result<()> {
        encode_frame(fields, &mut self.buf, &self.config)
    }

    /// Write queued bytes until the buffer is empty or `dst` would block.
    ///
    /// Returns the number of bytes written by this call. `WouldBlock` is not
    /// an error; check [`OutboundBuffer::is_empty`] to see whether anything
    /// is left.
    pub fn flush_to<W: Write>(&mut self, mut dst: W) -> Result<usize> {
        let mut written = 0usize;
        while !self.buf.is_empty() {
            match dst.write(&self.buf) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => {
                    self.buf.advance(n);
                    written += n;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
        trace!(written, pending = self.buf.len(), "flushed outbound bytes");
        Ok(written)
    }

    /// Bytes queued and not yet written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl Default for OutboundBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::decode_frame;

    /// Accepts at most `room` bytes, then reports `WouldBlock`.
    struct FullSocket {
        data: Vec<u8>,
        room: usize,
    }

    impl Write for FullSocket {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.room == 0 {
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = buf.len().min(self.room);
            self.data.extend_from_slice(&buf[..n]);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stops_at_would_block_and_resumes_in_order() {
        let mut outbound = OutboundBuffer::new();
        outbound.push(&[json!("first")]).unwrap();
        outbound.push(&[json!({"second": [1, 2]})]).unwrap();
        let total = outbound.len();

        let mut socket = FullSocket {
            data: Vec::new(),
            room: 6,
        };
        assert_eq!(outbound.flush_to(&mut socket).unwrap(), 6);
        assert_eq!(outbound.len(), total - 6);
        assert_eq!(outbound.flush_to(&mut socket).unwrap(), 0);

        socket.room = usize::MAX;
        assert_eq!(outbound.flush_to(&mut socket).unwrap(), total - 6);
        assert!(outbound.is_empty());

        let mut wire = BytesMut::from(socket.data.as_slice());
        let cfg = WireConfig::default();
        assert_eq!(
            decode_frame(&mut wire, &cfg).unwrap().unwrap(),
            vec![json!("first")]
        );
        assert_eq!(
            decode_frame(&mut wire, &cfg).unwrap().unwrap(),
            vec![json!({"second": [1, 2]})]
        );
        assert!(wire.is_empty());
    }

    #[test]
    fn oversized_frame_queues_nothing() {
        let mut outbound = OutboundBuffer::with_config(WireConfig {
            max_frame_size: 8,
            ..WireConfig::default()
        });
        outbound.push(&[json!(1)]).unwrap();
        let before = outbound.len();

        let err = outbound.push(&[json!("far too long for the limit")]).unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
        assert_eq!(outbound.len(), before);
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut outbound = OutboundBuffer::new();
        outbound.push(&[json!("x")]).unwrap();
        assert!(matches!(
            outbound.flush_to(Closed),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn empty_buffer_writes_nothing() {
        let mut outbound = OutboundBuffer::default();
        let mut socket = FullSocket {
            data: Vec::new(),
            room: 0,
        };
        assert_eq!(outbound.flush_to(&mut socket).unwrap(), 0);
    }
}
