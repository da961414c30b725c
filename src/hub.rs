//! RoomHub actor implementation
//!
//! One hub task per room. The hub owns the room's membership and is the
//! only code that mutates it or broadcasts into member queues. Connections
//! talk to it through a cloneable `RoomHandle`.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::client::ClientHandle;
use crate::error::SendError;
use crate::message::ChatMessage;
use crate::room::Room;
use crate::types::{ClientId, RoomCode};

/// Channel buffer size for room commands
pub const ROOM_COMMAND_BUFFER: usize = 256;

/// Commands sent from connections to a RoomHub
#[derive(Debug)]
pub enum RoomCommand {
    /// Client joins the room; the hub takes ownership of the handle
    Join { client: ClientHandle },
    /// Client leaves the room; its outbound queue is closed
    Leave { client_id: ClientId },
    /// Deliver a message to every member
    Broadcast { message: ChatMessage },
    /// Snapshot of current member ids
    Members {
        reply: oneshot::Sender<Vec<ClientId>>,
    },
}

/// The per-room actor
///
/// Processes one command at a time to completion, so membership changes
/// and fan-out never race with each other.
pub struct RoomHub {
    room: Room,
    /// Command receiver channel
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomHub {
    /// Create a hub for `code` and the handle used to reach it
    pub fn new(code: RoomCode) -> (Self, RoomHandle) {
        let (sender, receiver) = mpsc::channel(ROOM_COMMAND_BUFFER);
        let hub = Self {
            room: Room::new(code.clone()),
            receiver,
        };
        (hub, RoomHandle { code, sender })
    }

    /// Run the hub event loop
    ///
    /// Continuously receives and processes commands until all handles are dropped.
    pub async fn run(mut self) {
        info!("Room {} hub started", self.room.code);

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Room {} hub shutting down", self.room.code);
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { client } => self.handle_join(client),
            RoomCommand::Leave { client_id } => self.handle_leave(client_id),
            RoomCommand::Broadcast { message } => self.handle_broadcast(message),
            RoomCommand::Members { reply } => {
                let _ = reply.send(self.room.member_ids());
            }
        }
    }

    fn handle_join(&mut self, client: ClientHandle) {
        info!("{} joined room {}", client.nickname, self.room.code);
        self.room.join(client);
        debug!("Room {} members: {}", self.room.code, self.room.member_count());
    }

    fn handle_leave(&mut self, client_id: ClientId) {
        // Dropping the handle closes the client's outbound queue
        let Some(client) = self.room.leave(client_id) else {
            debug!("Client {} not in room {}, ignoring leave", client_id, self.room.code);
            return;
        };

        info!("{} left room {}", client.nickname, self.room.code);
        drop(client);
        debug!("Room {} members: {}", self.room.code, self.room.member_count());
    }

    fn handle_broadcast(&mut self, message: ChatMessage) {
        let delivered = self.room.broadcast(&message);
        debug!(
            "Room {} message from {} delivered to {} members",
            self.room.code, message.author, delivered
        );
    }
}

/// Sender side of a RoomHub
///
/// Cheap to clone; every clone addresses the same hub.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Code of the room this handle addresses
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Check whether two handles address the same hub
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    pub async fn join(&self, client: ClientHandle) -> Result<(), SendError> {
        self.send(RoomCommand::Join { client }).await
    }

    pub async fn leave(&self, client_id: ClientId) -> Result<(), SendError> {
        self.send(RoomCommand::Leave { client_id }).await
    }

    pub async fn broadcast(&self, message: ChatMessage) -> Result<(), SendError> {
        self.send(RoomCommand::Broadcast { message }).await
    }

    /// Ask the hub for its current members
    ///
    /// The answer reflects every command this handle sent before the call.
    pub async fn members(&self) -> Result<Vec<ClientId>, SendError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Members { reply }).await?;
        rx.await.map_err(|_| SendError::ChannelClosed)
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), SendError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}
