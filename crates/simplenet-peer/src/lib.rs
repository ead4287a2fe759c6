//! Clients and the multiplexing server for simplenet.
//!
//! This is the "just works" layer. A [`Client`] sends and reads single JSON
//! values over one connection. A [`Server`] accepts any number of clients on
//! a background worker and reports what happens to them as [`Event`]s:
//! - [`Event::NewConnection`] when a client connects and gets its id
//! - [`Event::Message`] for every value a client sends
//! - [`Event::Disconnection`] when a client goes away or the server stops
//!
//! Replies go back through [`Server::send`] addressed by client id.

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod server;

mod command;
mod registry;
mod worker;

pub use client::Client;
pub use config::{
    ClientConfig, ServerConfig, DEFAULT_HOST, DEFAULT_MAX_PENDING_OUTPUT, DEFAULT_PORT,
};
pub use error::{PeerError, Result};
pub use event::{ClientId, Event, EVENT_CONNECT, EVENT_DISCONNECT, EVENT_MESSAGE};
pub use server::Server;
