use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use serde_json::Value;
use tracing::debug;

use crate::codec::{decode_frame, WireConfig, LENGTH_PREFIX_SIZE};
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete field lists.
pub struct WireReader<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Read> WireReader<T> {
    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(WireError::ConnectionClosed)` when EOF is reached between
    /// frames and `Err(WireError::Truncated)` when EOF cuts a frame short.
    /// A read timeout on the stream surfaces as `WireError::Io`.
    pub fn read_fields(&mut self) -> Result<Vec<Value>> {
        loop {
            if let Some(fields) = self.decode_buffered()? {
                return Ok(fields);
            }
            self.fill()?;
        }
    }

    /// Read the next complete frame without waiting on a non-blocking stream.
    ///
    /// Returns `Ok(None)` once the stream reports `WouldBlock` with no complete
    /// frame buffered. Data already received stays buffered for the next call.
    pub fn try_read_fields(&mut self) -> Result<Option<Vec<Value>>> {
        loop {
            if let Some(fields) = self.decode_buffered()? {
                return Ok(Some(fields));
            }
            match self.fill() {
                Ok(()) => {}
                Err(err) if err.is_would_block() => return Ok(None),
                Err(err) => return Err(err),
            }
        }
    }

    fn decode_buffered(&mut self) -> Result<Option<Vec<Value>>> {
        let decoded = decode_frame(&mut self.buf, &self.config)?;
        if let Some(fields) = &decoded {
            debug!(fields = fields.len(), "read frame");
        }
        Ok(decoded)
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                return Err(self.eof_error());
            }

            self.buf.extend_from_slice(&chunk[..read]);
            return Ok(());
        }
    }

    fn eof_error(&self) -> WireError {
        if self.buf.is_empty() {
            return WireError::ConnectionClosed;
        }

        let expected = if self.buf.len() < LENGTH_PREFIX_SIZE {
            LENGTH_PREFIX_SIZE
        } else {
            let mut header = [0u8; LENGTH_PREFIX_SIZE];
            header.copy_from_slice(&self.buf[..LENGTH_PREFIX_SIZE]);
            LENGTH_PREFIX_SIZE + u32::from_be_bytes(header) as usize
        };

        WireError::Truncated {
            expected,
            available: self.buf.len(),
        }
    }

}

impl<T> WireReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Number of received bytes not yet consumed as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};
    use serde_json::json;

    use super::*;
    use crate::codec::encode_frame;

    fn wire_bytes(frames: &[&[Value]]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        for fields in frames {
            encode_frame(fields, &mut wire, &WireConfig::default()).unwrap();
        }
        wire.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let bytes = wire_bytes(&[&[json!("hello")]]);
        let mut reader = WireReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_fields().unwrap(), vec![json!("hello")]);
    }

    #[test]
    fn read_multiple_frames() {
        let bytes = wire_bytes(&[
            &[json!("msg"), json!(1), json!("one")],
            &[json!("disconnect"), json!(2)],
        ]);
        let mut reader = WireReader::new(Cursor::new(bytes));

        assert_eq!(
            reader.read_fields().unwrap(),
            vec![json!("msg"), json!(1), json!("one")]
        );
        assert_eq!(
            reader.read_fields().unwrap(),
            vec![json!("disconnect"), json!(2)]
        );
    }

    #[test]
    fn read_frame_with_large_field() {
        let big = "x".repeat(64 * 1024);
        let bytes = wire_bytes(&[&[json!(big.clone())]]);
        let mut reader = WireReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_fields().unwrap(), vec![json!(big)]);
    }

    #[test]
    fn partial_read_handling() {
        let bytes = wire_bytes(&[&[json!("slow"), json!({"a": 1})]]);
        let mut reader = WireReader::new(ByteByByteReader { bytes, pos: 0 });

        assert_eq!(
            reader.read_fields().unwrap(),
            vec![json!("slow"), json!({"a": 1})]
        );
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = WireReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_fields().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_header() {
        let mut reader = WireReader::new(Cursor::new(vec![0u8, 0]));
        let err = reader.read_fields().unwrap_err();
        assert!(matches!(
            err,
            WireError::Truncated {
                expected: 4,
                available: 2
            }
        ));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_u32(16);
        partial.put_u32(12);
        partial.put_slice(b"\"only");

        let mut reader = WireReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_fields().unwrap_err();
        assert!(matches!(
            err,
            WireError::Truncated {
                expected: 20,
                available: 13
            }
        ));
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut wire = BytesMut::new();
        wire.put_u32(1024);

        let cfg = WireConfig {
            max_frame_size: 16,
            ..WireConfig::default()
        };
        let mut reader = WireReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_fields().unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
    }

    #[test]
    fn try_read_returns_none_on_would_block_and_keeps_partial_data() {
        let bytes = wire_bytes(&[&[json!("ok")]]);
        let (head, tail) = bytes.split_at(5);
        let mut reader = WireReader::new(ScriptedReader {
            steps: vec![
                Step::Data(head.to_vec()),
                Step::WouldBlock,
                Step::Data(tail.to_vec()),
                Step::WouldBlock,
            ],
        });

        assert!(reader.try_read_fields().unwrap().is_none());
        assert_eq!(reader.buffered(), 5);
        assert_eq!(reader.try_read_fields().unwrap(), Some(vec![json!("ok")]));
        assert!(reader.try_read_fields().unwrap().is_none());
    }

    #[test]
    fn try_read_drains_every_buffered_frame_before_eof() {
        let bytes = wire_bytes(&[&[json!("a")], &[json!("b")]]);
        let mut reader = WireReader::new(Cursor::new(bytes));

        assert_eq!(reader.try_read_fields().unwrap(), Some(vec![json!("a")]));
        assert_eq!(reader.try_read_fields().unwrap(), Some(vec![json!("b")]));
        assert!(matches!(
            reader.try_read_fields(),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn blocking_read_propagates_would_block() {
        let mut reader = WireReader::new(ScriptedReader {
            steps: vec![Step::WouldBlock],
        });

        let err = reader.read_fields().unwrap_err();
        assert!(err.is_would_block());
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = wire_bytes(&[&[json!(8)]]);
        let mut reader = WireReader::new(ScriptedReader {
            steps: vec![Step::Interrupted, Step::Data(bytes)],
        });

        assert_eq!(reader.read_fields().unwrap(), vec![json!(8)]);
    }

    #[test]
    fn other_io_errors_propagate() {
        let mut reader = WireReader::new(ScriptedReader {
            steps: vec![Step::Fail(ErrorKind::ConnectionReset)],
        });

        let err = reader.read_fields().unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
        assert!(!WireError::Io(std::io::Error::from(ErrorKind::ConnectionReset)).is_framing());
    }

    #[test]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::WireWriter::new(left);
        let mut reader = WireReader::new(right);

        writer.send(&[json!("ping"), json!(1)]).unwrap();
        assert_eq!(reader.read_fields().unwrap(), vec![json!("ping"), json!(1)]);
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = WireReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config(), &WireConfig::default());
        let _inner = reader.into_inner();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    enum Step {
        Data(Vec<u8>),
        WouldBlock,
        Interrupted,
        Fail(ErrorKind),
    }

    struct ScriptedReader {
        steps: Vec<Step>,
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.steps.is_empty() {
                return Ok(0);
            }
            match self.steps.remove(0) {
                Step::Data(mut data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        data.drain(..n);
                        self.steps.insert(0, Step::Data(data));
                    }
                    Ok(n)
                }
                Step::WouldBlock => Err(std::io::Error::from(ErrorKind::WouldBlock)),
                Step::Interrupted => Err(std::io::Error::from(ErrorKind::Interrupted)),
                Step::Fail(kind) => Err(std::io::Error::from(kind)),
            }
        }
    }
}
