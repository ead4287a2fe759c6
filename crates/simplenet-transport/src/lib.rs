//! TCP transport for simplenet.
//!
//! Provides the OS-facing piece everything else builds on: [`TcpTransport`]
//! resolves addresses, binds a non-blocking listener that can be registered
//! with a `mio::Poll`, and does first-success connects for clients.
//!
//! This is the lowest layer of simplenet. Framing lives in `simplenet-wire`.

pub mod error;
pub mod tcp;

pub use error::{Result, TransportError};
pub use tcp::TcpTransport;
