//! Length-prefixed JSON messaging over TCP.
//!
//! simplenet moves JSON values between a multiplexing server and any number
//! of clients. Every message is one frame of length-prefixed JSON fields; the
//! server reports connects, disconnects and messages as a single ordered
//! event stream.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP bind/accept/connect and the readiness wait
//! - [`wire`]: the frame codec (readers, writers, limits)
//! - [`peer`]: [`peer::Client`], [`peer::Server`] and [`peer::Event`]

/// Re-export transport types.
pub mod transport {
    pub use simplenet_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use simplenet_wire::*;
}

/// Re-export client and server types.
pub mod peer {
    pub use simplenet_peer::*;
}

pub use simplenet_peer::{Client, ClientId, Event, PeerError, Server};
