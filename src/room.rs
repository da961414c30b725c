//! Room struct definition
//!
//! Represents one named broadcast domain: its code and its members.
//! A `Room` is owned by its hub task and never shared.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::client::ClientHandle;
use crate::message::ChatMessage;
use crate::types::{ClientId, RoomCode};

/// Chat room membership
///
/// Members are keyed by client id; enumeration order is unspecified.
#[derive(Debug)]
pub struct Room {
    /// Room code for identification
    pub code: RoomCode,
    /// Joined clients: ClientId -> ClientHandle
    members: HashMap<ClientId, ClientHandle>,
}

impl Room {
    /// Create an empty room with the given code
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            members: HashMap::new(),
        }
    }

    /// Add a client to the room
    ///
    /// Joining twice with the same id is a caller error; the newer handle
    /// replaces the older one, whose queue is closed.
    pub fn join(&mut self, client: ClientHandle) {
        if let Some(previous) = self.members.insert(client.id, client) {
            warn!(
                "Client {} joined room {} twice, replacing handle",
                previous.id, self.code
            );
        }
    }

    /// Remove a client from the room
    ///
    /// The returned handle is dropped by the caller, which closes the client's
    /// outbound queue. Returns None for non-members, so a repeated leave is a no-op.
    pub fn leave(&mut self, client_id: ClientId) -> Option<ClientHandle> {
        self.members.remove(&client_id)
    }

    /// Deliver a message to every member's outbound queue
    ///
    /// Members whose outbound pump has already gone away are removed.
    /// Returns the number of members the message was queued for.
    pub fn broadcast(&mut self, msg: &ChatMessage) -> usize {
        let mut delivered = 0;
        let mut gone = Vec::new();

        for (id, client) in &self.members {
            match client.deliver(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => gone.push(*id),
            }
        }

        for id in gone {
            self.members.remove(&id);
            debug!("Client {} dropped from room {} (queue closed)", id, self.code);
        }

        delivered
    }

    #[cfg(test)]
    fn contains(&self, client_id: ClientId) -> bool {
        self.members.contains_key(&client_id)
    }

    /// Ids of all current members
    pub fn member_ids(&self) -> Vec<ClientId> {
        self.members.keys().copied().collect()
    }

    /// Get the number of members in the room
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
