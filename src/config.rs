//! Server configuration
//!
//! Parsed from command-line flags, with environment variable fallbacks.

use clap::Parser;

/// Default server address (all interfaces)
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Default WebSocket route
pub const DEFAULT_PATH: &str = "/ws";

/// Query parameter carrying the room code
pub const ROOM_CODE_PARAM: &str = "roomCode";

/// Chat relay configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "chat_relay", version, about = "Multi-room WebSocket chat relay")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CHAT_RELAY_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Request path accepted for WebSocket upgrades
    #[arg(long, env = "CHAT_RELAY_PATH", default_value = DEFAULT_PATH)]
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            path: DEFAULT_PATH.to_string(),
        }
    }
}
