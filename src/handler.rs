//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, joining the
//! requested room, and the two pumps moving messages between the socket and
//! the room hub.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::client::ClientHandle;
use crate::config::{Config, ROOM_CODE_PARAM};
use crate::error::AppError;
use crate::hub::RoomHandle;
use crate::message::ChatMessage;
use crate::registry::RoomRegistry;
use crate::types::{ClientId, RoomCode};

type WsSender = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsReceiver = SplitStream<WebSocketStream<TcpStream>>;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, joins the client to its room and runs
/// both pumps. Whichever pump stops first, the client leaves the room once.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Arc<RoomRegistry>,
    config: Arc<Config>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake, capturing the room code from the request
    let mut room_code = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            room_code = Some(room_code_from_request(req, &config.path)?);
            Ok(resp)
        },
    )
    .await?;
    let room_code = room_code.unwrap_or_default();

    let (ws_sender, ws_receiver) = ws_stream.split();

    let client_id = ClientId::new();
    let (client, outbound) = ClientHandle::new(client_id);
    info!(
        "Client {} connected from {} to room {}",
        client_id, peer_addr, room_code
    );

    let room = registry.resolve(&room_code).await;
    if room.join(client).await.is_err() {
        error!("Failed to join client {} - room {} closed", client_id, room_code);
        return Err(AppError::ChannelSend);
    }

    let mut read_task = tokio::spawn(inbound_pump(client_id, ws_receiver, room.clone()));
    let mut write_task = tokio::spawn(outbound_pump(client_id, outbound, ws_sender));

    let write_ended_first = tokio::select! {
        result = &mut read_task => {
            report_task_end("Read", client_id, result);
            false
        }
        result = &mut write_task => {
            report_task_end("Write", client_id, result);
            true
        }
    };

    if write_ended_first {
        // Nobody is listening anymore; stop reading and release the socket
        read_task.abort();
    }

    if room.leave(client_id).await.is_err() {
        debug!("Room {} gone before client {} left", room_code, client_id);
    }

    if !write_ended_first {
        // Leave closed the queue; the pump drains what is left and closes the socket
        report_task_end("Write", client_id, write_task.await);
    }

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Read frames from the socket and broadcast them to the room
async fn inbound_pump(client_id: ClientId, mut ws_receiver: WsReceiver, room: RoomHandle) {
    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match ChatMessage::from_json(&text) {
                Ok(message) => {
                    if room.broadcast(message).await.is_err() {
                        debug!("Room closed, ending read task for {}", client_id);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Invalid message from {}: {}", client_id, e);
                }
            },
            Ok(Message::Close(_)) => {
                debug!("Client {} sent close frame", client_id);
                break;
            }
            Ok(_) => {
                // Ping/Pong are answered by tungstenite, binary frames are ignored
            }
            Err(e) => {
                debug!("WebSocket read error for {}: {}", client_id, e);
                break;
            }
        }
    }
    debug!("Read task ended for {}", client_id);
}

/// Drain the client's outbound queue into the socket
async fn outbound_pump(
    client_id: ClientId,
    mut outbound: mpsc::UnboundedReceiver<ChatMessage>,
    mut ws_sender: WsSender,
) {
    while let Some(msg) = outbound.recv().await {
        match msg.to_json() {
            Ok(json) => {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    debug!("WebSocket send failed, ending write task for {}", client_id);
                    break;
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }
    debug!("Write task ended for {}", client_id);

    let _ = ws_sender.close().await;
}

/// Log how a pump task ended
///
/// Returns false if the task panicked or was cancelled.
fn report_task_end(task: &str, client_id: ClientId, result: Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!("{} task for {} failed: {}", task, client_id, e);
            false
        }
    }
}

/// Validate the upgrade request and extract its room code
///
/// Requests for any other path are refused with 404, and unparsable
/// query strings with 400. A missing `roomCode` parameter selects the
/// room with the empty code.
fn room_code_from_request(req: &Request, path: &str) -> Result<RoomCode, ErrorResponse> {
    let uri = req.uri();
    if uri.path() != path {
        warn!("Rejected upgrade for unknown path {}", uri.path());
        return Err(error_response(StatusCode::NOT_FOUND, "Not Found"));
    }
    room_code_from_query(uri.query()).map_err(|e| {
        warn!("Rejected upgrade with bad query {:?}: {}", uri.query(), e);
        error_response(StatusCode::BAD_REQUEST, "Bad Request")
    })
}

/// Find the `roomCode` parameter in a URL query string
///
/// Percent-escapes and `+` are decoded. When the parameter is repeated the
/// first value wins.
fn room_code_from_query(query: Option<&str>) -> Result<RoomCode, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.unwrap_or(""))?;
    Ok(pairs
        .into_iter()
        .find(|(key, _)| key == ROOM_CODE_PARAM)
        .map(|(_, value)| RoomCode(value))
        .unwrap_or_default())
}

fn error_response(status: StatusCode, body: &str) -> ErrorResponse {
    let mut resp = ErrorResponse::new(Some(body.to_string()));
    *resp.status_mut() = status;
    resp
}
