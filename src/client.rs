//! Client handle definition
//!
//! Represents one connected participant and its outbound delivery queue.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ChatMessage;
use crate::types::ClientId;

/// Connected client as seen by a room hub
///
/// The handle owns the only sender of the client's outbound queue, so the
/// queue closes exactly when the handle is dropped. Once joined, the handle
/// lives inside the room hub; the hub drops it on leave.
#[derive(Debug)]
pub struct ClientHandle {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Display name derived from the id
    pub nickname: String,
    /// Hub → outbound pump queue
    sender: mpsc::UnboundedSender<ChatMessage>,
}

impl ClientHandle {
    /// Create a handle and the receiving end of its outbound queue
    ///
    /// The receiver belongs to the outbound pump.
    pub fn new(id: ClientId) -> (Self, mpsc::UnboundedReceiver<ChatMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            id,
            nickname: format!("User_{}", id),
            sender,
        };
        (handle, receiver)
    }

    /// Queue a message for this client
    ///
    /// Never waits. Returns an error if the outbound pump has gone away.
    pub fn deliver(&self, msg: ChatMessage) -> Result<(), SendError> {
        self.sender.send(msg).map_err(|_| SendError::ChannelClosed)
    }

    /// Check whether the outbound pump has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
