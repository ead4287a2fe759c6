use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;

use crate::error::{Result, WireError};

/// Size of every length prefix (frame and field): a u32, big-endian.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

/// Default maximum single-field size: 16 MiB.
pub const DEFAULT_MAX_FIELD: usize = 16 * 1024 * 1024;

/// Size limits enforced by the codec.
///
/// Limits are checked against declared lengths before any payload is
/// buffered, so a hostile length prefix cannot force a large allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireConfig {
    /// Maximum total payload size in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Maximum encoded size of one field in bytes. Default: 16 MiB.
    pub max_field_size: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
            max_field_size: DEFAULT_MAX_FIELD,
        }
    }
}

/// Encode an ordered sequence of fields as one frame.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬────────────────┬──────────────┬─────
/// │ Total (4B BE)│ Len1 (4B BE) │ Field1 (JSON)  │ Len2 (4B BE) │ ...
/// └──────────────┴──────────────┴────────────────┴──────────────┴─────
/// ```
///
/// On error nothing is left appended to `dst`.
pub fn encode_frame(fields: &[Value], dst: &mut BytesMut, config: &WireConfig) -> Result<()> {
    let start = dst.len();
    dst.put_u32(0);

    for field in fields {
        if let Err(err) = encode_field(field, dst, config) {
            dst.truncate(start);
            return Err(err);
        }
    }

    let payload_len = dst.len() - start - LENGTH_PREFIX_SIZE;
    let max = config.max_frame_size.min(u32::MAX as usize);
    if payload_len > max {
        dst.truncate(start);
        return Err(WireError::FrameTooLarge {
            size: payload_len,
            max,
        });
    }

    dst[start..start + LENGTH_PREFIX_SIZE].copy_from_slice(&(payload_len as u32).to_be_bytes());
    Ok(())
}

fn encode_field(field: &Value, dst: &mut BytesMut, config: &WireConfig) -> Result<()> {
    let bytes = serde_json::to_vec(field)?;
    let max = config.max_field_size.min(u32::MAX as usize);
    if bytes.len() > max {
        return Err(WireError::FieldTooLarge {
            size: bytes.len(),
            max,
        });
    }

    dst.reserve(LENGTH_PREFIX_SIZE + bytes.len());
    dst.put_u32(bytes.len() as u32);
    dst.put_slice(&bytes);
    Ok(())
}

/// Decode one frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly the frame's bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, config: &WireConfig) -> Result<Option<Vec<Value>>> {
    if src.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let payload_len = (&src[..LENGTH_PREFIX_SIZE]).get_u32() as usize;
    if payload_len > config.max_frame_size {
        return Err(WireError::FrameTooLarge {
            size: payload_len,
            max: config.max_frame_size,
        });
    }

    if src.len() < LENGTH_PREFIX_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(LENGTH_PREFIX_SIZE);
    let payload = src.split_to(payload_len);
    decode_payload(&payload, config).map(Some)
}

/// Decode the field entries of a complete payload.
///
/// A field header or body that runs past the end of the payload is a
/// [`WireError::Truncated`]; no partial field list is ever returned.
pub fn decode_payload(payload: &[u8], config: &WireConfig) -> Result<Vec<Value>> {
    let mut rest = payload;
    let mut fields = Vec::new();

    while !rest.is_empty() {
        if rest.len() < LENGTH_PREFIX_SIZE {
            return Err(WireError::Truncated {
                expected: LENGTH_PREFIX_SIZE,
                available: rest.len(),
            });
        }

        let field_len = rest.get_u32() as usize;
        if field_len > config.max_field_size {
            return Err(WireError::FieldTooLarge {
                size: field_len,
                max: config.max_field_size,
            });
        }
        if rest.len() < field_len {
            return Err(WireError::Truncated {
                expected: field_len,
                available: rest.len(),
            });
        }

        fields.push(serde_json::from_slice(&rest[..field_len])?);
        rest.advance(field_len);
    }

    Ok(fields)
}
