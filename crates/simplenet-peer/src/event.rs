use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity the worker assigns to each accepted connection.
///
/// Ids start at 1, increase strictly for the lifetime of a server and are
/// never reused.
pub type ClientId = u64;

/// Event tag: a client connected.
pub const EVENT_CONNECT: &str = "connect";
/// Event tag: a client disconnected.
pub const EVENT_DISCONNECT: &str = "disconnect";
/// Event tag: a client sent a message.
pub const EVENT_MESSAGE: &str = "msg";

/// A connection lifecycle or data notification delivered by [`crate::Server::read`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A client connected and was assigned `client_id`.
    #[serde(rename = "connect")]
    NewConnection {
        client_id: ClientId,
        host: String,
        port: u16,
    },

    /// A client's connection ended, either by the peer or by server shutdown.
    #[serde(rename = "disconnect")]
    Disconnection { client_id: ClientId },

    /// A client sent one value.
    #[serde(rename = "msg")]
    Message { from_client_id: ClientId, data: Value },
}

impl Event {
    /// The client this event concerns.
    pub fn client_id(&self) -> ClientId {
        match self {
            Event::NewConnection { client_id, .. } | Event::Disconnection { client_id } => {
                *client_id
            }
            Event::Message { from_client_id, .. } => *from_client_id,
        }
    }

    /// The tag naming this event kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Event::NewConnection { .. } => EVENT_CONNECT,
            Event::Disconnection { .. } => EVENT_DISCONNECT,
            Event::Message { .. } => EVENT_MESSAGE,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::NewConnection {
                client_id,
                host,
                port,
            } => write!(f, "connection from {host}:{port} - assigned id {client_id}"),
            Event::Disconnection { client_id } => write!(f, "disconnection from {client_id}"),
            Event::Message {
                from_client_id,
                data,
            } => match data {
                Value::String(text) => write!(f, "message from {from_client_id}: {text}"),
                other => write!(f, "message from {from_client_id}: {other}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn display_matches_log_format() {
        let connect = Event::NewConnection {
            client_id: 3,
            host: "127.0.0.1".to_string(),
            port: 50123,
        };
        assert_eq!(
            connect.to_string(),
            "connection from 127.0.0.1:50123 - assigned id 3"
        );
        assert_eq!(
            Event::Disconnection { client_id: 3 }.to_string(),
            "disconnection from 3"
        );
        assert_eq!(
            Event::Message {
                from_client_id: 1,
                data: json!("hello"),
            }
            .to_string(),
            "message from 1: hello"
        );
        assert_eq!(
            Event::Message {
                from_client_id: 1,
                data: json!({"n": 1}),
            }
            .to_string(),
            "message from 1: {\"n\":1}"
        );
    }

    #[test]
    fn serializes_with_tag() {
        let value = serde_json::to_value(Event::Message {
            from_client_id: 2,
            data: json!([1, 2]),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "msg", "from_client_id": 2, "data": [1, 2]})
        );

        let value = serde_json::to_value(Event::Disconnection { client_id: 9 }).unwrap();
        assert_eq!(value, json!({"type": "disconnect", "client_id": 9}));
    }

    #[test]
    fn unknown_tag_is_rejected_at_decode() {
        let result = serde_json::from_value::<Event>(json!({"type": "quit"}));
        assert!(result.is_err());
    }

    #[test]
    fn accessors() {
        let event = Event::NewConnection {
            client_id: 4,
            host: "::1".to_string(),
            port: 1,
        };
        assert_eq!(event.client_id(), 4);
        assert_eq!(event.tag(), EVENT_CONNECT);
        assert_eq!(Event::Disconnection { client_id: 5 }.tag(), EVENT_DISCONNECT);
    }
}
