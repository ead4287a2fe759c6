use std::collections::BTreeMap;

use mio::Token;

use crate::event::ClientId;

/// Bidirectional client-id ↔ poll token mapping.
///
/// A client's token is its id, and ids are never reused, so a token seen in
/// a readiness event can only ever name the client it was registered for.
/// Tokens at the top of the range are left for the worker's own sources.
pub(crate) struct Registry<C> {
    clients: BTreeMap<ClientId, C>,
    last_id: ClientId,
}

/// Poll token for a client id.
pub(crate) fn token(id: ClientId) -> Token {
    Token(id as usize)
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self {
            clients: BTreeMap::new(),
            last_id: 0,
        }
    }

    /// Assign the next client-id and register the connection under it.
    pub fn register(&mut self, connection: C) -> ClientId {
        let id = self.last_id + 1;
        self.last_id = id;
        self.clients.insert(id, connection);
        id
    }

    /// Remove a client, handing back its connection.
    pub fn unregister(&mut self, id: ClientId) -> Option<C> {
        self.clients.remove(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut C> {
        self.clients.get_mut(&id)
    }

    /// The registered client a readiness token belongs to, if any.
    pub fn id_for_token(&self, token: Token) -> Option<ClientId> {
        let id = token.0 as ClientId;
        self.clients.contains_key(&id).then_some(id)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
