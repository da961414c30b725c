//! Multi-room WebSocket Chat Relay Library
//!
//! Clients connect over WebSocket with a `roomCode` query parameter and
//! receive every message sent to that room, their own included.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `RoomHub` is one actor per room, the only owner of its membership
//! - `RoomRegistry` creates hubs lazily and maps room codes to them
//! - Each connection runs an inbound and an outbound pump talking to its hub
//! - Per-client outbound queues are unbounded, so a slow client never stalls its room
//!
//! # Example
//! ```ignore
//! use chat_relay::{Config, RelayServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = RelayServer::bind(Config::default()).await.unwrap();
//!     server.run_until_ctrl_c().await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::ClientHandle;
pub use config::Config;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use hub::{RoomCommand, RoomHandle, RoomHub};
pub use message::ChatMessage;
pub use registry::RoomRegistry;
pub use room::Room;
pub use server::RelayServer;
pub use types::{ClientId, RoomCode};
