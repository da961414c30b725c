//! Room registry
//!
//! Maps room codes to running hubs. Rooms are created lazily the first time
//! a code is resolved and live until the registry is shut down.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::hub::{RoomHandle, RoomHub};
use crate::types::RoomCode;

/// A running hub and the task driving it
#[derive(Debug)]
struct RoomEntry {
    handle: RoomHandle,
    task: JoinHandle<()>,
}

/// Process-wide table of rooms
///
/// Constructed once by the server and shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, RoomEntry>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the hub for `code`, starting one if the room does not exist yet
    ///
    /// Concurrent callers with the same new code all get the same hub.
    /// Must be called from within a tokio runtime.
    pub async fn resolve(&self, code: &RoomCode) -> RoomHandle {
        {
            let rooms = self.rooms.read().await;
            if let Some(entry) = rooms.get(code) {
                return entry.handle.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        // Another caller may have created it between the two locks
        if let Some(entry) = rooms.get(code) {
            return entry.handle.clone();
        }

        let (hub, handle) = RoomHub::new(code.clone());
        let task = tokio::spawn(hub.run());
        rooms.insert(
            code.clone(),
            RoomEntry {
                handle: handle.clone(),
                task,
            },
        );

        info!("Room {} created", code);
        debug!("Total rooms: {}", rooms.len());

        handle
    }

    /// Check whether a room with this code has been created
    ///
    /// Inspection only; connections always go through `resolve`.
    pub async fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.read().await.contains_key(code)
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Stop every hub and forget all rooms
    ///
    /// Dropping a hub closes the outbound queues of its remaining members.
    pub async fn shutdown(&self) {
        let mut rooms = self.rooms.write().await;
        let count = rooms.len();

        for (code, entry) in rooms.drain() {
            entry.task.abort();
            debug!("Room {} hub aborted", code);
        }

        info!("Registry shut down ({} rooms)", count);
    }
}
