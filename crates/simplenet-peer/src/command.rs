use serde_json::Value;

use crate::event::ClientId;

/// Instructions sent from the server facade to its worker.
///
/// `Shutdown` is the only shutdown signal; both sides match on this variant.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// Forward `value` to `client_id` if it is still connected.
    Send { client_id: ClientId, value: Value },
    /// Disconnect every client, close all sockets and terminate the worker.
    Shutdown,
}
