//! Length-prefixed multi-field message framing.
//!
//! Every message on every simplenet connection is one frame:
//! - A 4-byte big-endian total payload length
//! - The payload: zero or more field entries, each a 4-byte big-endian
//!   field length followed by that many bytes of UTF-8 JSON
//!
//! No padding, no terminator. Readers only ever hand out complete frames.

pub mod codec;
pub mod error;
pub mod outbound;
pub mod reader;
pub mod wire;
pub mod writer;

pub use codec::{
    decode_frame, decode_payload, encode_frame, WireConfig, DEFAULT_MAX_FIELD, DEFAULT_MAX_FRAME,
    LENGTH_PREFIX_SIZE,
};
pub use error::{Result, WireError};
pub use outbound::OutboundBuffer;
pub use reader::WireReader;
pub use wire::Wire;
pub use writer::WireWriter;

/// A single field value carried in a frame.
pub type Field = serde_json::Value;
