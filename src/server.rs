//! Relay server
//!
//! Owns the listener and the room registry, and spawns a handler task for
//! every accepted connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::RoomRegistry;

pub struct RelayServer {
    listener: TcpListener,
    registry: Arc<RoomRegistry>,
    config: Arc<Config>,
}

impl RelayServer {
    /// Bind the listener on `config.addr`
    pub async fn bind(config: Config) -> Result<Self, AppError> {
        let listener = TcpListener::bind(&config.addr).await?;
        Ok(Self {
            listener,
            registry: Arc::new(RoomRegistry::new()),
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Registry shared by all connections of this server
    ///
    /// Lets embedders and tests inspect live rooms.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections until `shutdown` completes, then stop every room
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let RelayServer {
            listener,
            registry,
            config,
        } = self;
        tokio::pin!(shutdown);

        info!(
            "Chat relay accepting WebSocket connections on {}",
            config.path
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Chat relay shutting down");
                    break;
                }
                accept_result = listener.accept() => match accept_result {
                    Ok((stream, addr)) => spawn_connection(stream, addr, &registry, &config),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }

        registry.shutdown().await;
    }

    pub async fn run_until_ctrl_c(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install ctrl-c handler: {}", e);
            }
        })
        .await
    }
}

/// Spawn a handler task for an accepted connection
fn spawn_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: &Arc<RoomRegistry>,
    config: &Arc<Config>,
) {
    info!("New connection from {}", addr);
    let registry = Arc::clone(registry);
    let config = Arc::clone(config);

    tokio::spawn(async move {
        if let Err(e) = handle_connection(stream, registry, config).await {
            error!("Connection handler error: {}", e);
        }
    });
}
