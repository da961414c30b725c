use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chat_relay::{ChatMessage, Config, RelayServer, RoomCode, RoomRegistry};

const READ_TIMEOUT: Duration = Duration::from_secs(3);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    registry: Arc<RoomRegistry>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let config = Config {
            addr: "127.0.0.1:0".to_string(),
            ..Config::default()
        };
        let server = RelayServer::bind(config).await.expect("bind relay");
        let addr = server.local_addr().expect("local addr");
        let registry = server.registry();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        Self {
            addr,
            registry,
            shutdown: Some(tx),
        }
    }

    async fn connect(&self, room: &str) -> WsClient {
        let url = format!("ws://{}/ws?roomCode={}", self.addr, room);
        let (ws, _) = connect_async(url).await.expect("websocket connect");
        ws
    }

    /// Wait until the hub for `room` reports exactly `count` members
    async fn wait_for_members(&self, room: &str, count: usize) {
        let handle = self.registry.resolve(&RoomCode::from(room)).await;
        timeout(READ_TIMEOUT, async {
            loop {
                if handle.members().await.expect("hub alive").len() == count {
                    break;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("room {room:?} never reached {count} members"));
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn send(ws: &mut WsClient, author: &str, content: &str) {
    let json = ChatMessage::new(author, content).to_json().unwrap();
    ws.send(Message::Text(json.into())).await.expect("send frame");
}

async fn recv(ws: &mut WsClient) -> ChatMessage {
    timeout(READ_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return ChatMessage::from_json(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended while waiting for message: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

#[tokio::test]
async fn message_reaches_every_member_including_sender() {
    let server = TestServer::start().await;
    let mut alice = server.connect("r1").await;
    let mut bob = server.connect("r1").await;
    server.wait_for_members("r1", 2).await;

    send(&mut alice, "A", "hi").await;

    assert_eq!(recv(&mut alice).await, ChatMessage::new("A", "hi"));
    assert_eq!(recv(&mut bob).await, ChatMessage::new("A", "hi"));
}

#[tokio::test]
async fn rooms_are_isolated() {
    let server = TestServer::start().await;
    let mut alice = server.connect("r1").await;
    let mut bob = server.connect("r2").await;
    server.wait_for_members("r1", 1).await;
    server.wait_for_members("r2", 1).await;

    send(&mut alice, "A", "only r1").await;
    assert_eq!(recv(&mut alice).await.content, "only r1");

    assert!(timeout(QUIET_PERIOD, bob.next()).await.is_err());
}

#[tokio::test]
async fn disconnected_member_stops_receiving() {
    let server = TestServer::start().await;
    let alice = server.connect("r1").await;
    let mut bob = server.connect("r1").await;
    server.wait_for_members("r1", 2).await;

    // Drop without a close handshake; the server sees a broken read
    drop(alice);
    server.wait_for_members("r1", 1).await;

    send(&mut bob, "B", "anyone?").await;
    assert_eq!(recv(&mut bob).await, ChatMessage::new("B", "anyone?"));
    server.wait_for_members("r1", 1).await;
}

#[tokio::test]
async fn messages_arrive_in_send_order() {
    let server = TestServer::start().await;
    let mut alice = server.connect("ordered").await;
    let mut bob = server.connect("ordered").await;
    server.wait_for_members("ordered", 2).await;

    for i in 0..20 {
        send(&mut alice, "A", &i.to_string()).await;
    }

    for i in 0..20 {
        assert_eq!(recv(&mut bob).await.content, i.to_string());
    }
}

#[tokio::test]
async fn invalid_frames_are_skipped() {
    let server = TestServer::start().await;
    let mut alice = server.connect("r1").await;
    server.wait_for_members("r1", 1).await;

    alice
        .send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();
    send(&mut alice, "A", "valid").await;

    assert_eq!(recv(&mut alice).await.content, "valid");
}

#[tokio::test]
async fn encoded_room_codes_share_a_room() {
    let server = TestServer::start().await;
    let mut alice = server.connect("a%20b").await;
    let mut bob = server.connect("a+b").await;
    server.wait_for_members("a b", 2).await;

    send(&mut alice, "A", "same room").await;
    assert_eq!(recv(&mut bob).await.content, "same room");
}

#[tokio::test]
async fn capitalised_message_keys_are_relayed() {
    let server = TestServer::start().await;
    let mut alice = server.connect("r1").await;
    server.wait_for_members("r1", 1).await;

    let frame = r#"{"Author":"A","Content":"hi"}"#.to_string();
    alice.send(Message::Text(frame.into())).await.unwrap();

    assert_eq!(recv(&mut alice).await, ChatMessage::new("A", "hi"));
}

#[tokio::test]
async fn missing_room_code_joins_empty_room() {
    let server = TestServer::start().await;
    let url = format!("ws://{}/ws", server.addr);
    let (_ws, _) = connect_async(url).await.unwrap();

    server.wait_for_members("", 1).await;
    assert!(server.registry.contains(&RoomCode::default()).await);
}

#[tokio::test]
async fn unknown_path_is_rejected() {
    let server = TestServer::start().await;
    let url = format!("ws://{}/elsewhere?roomCode=r1", server.addr);

    assert!(connect_async(url).await.is_err());
    assert!(!server.registry.contains(&RoomCode::from("r1")).await);
}

#[tokio::test]
async fn shutdown_closes_client_connections() {
    let mut server = TestServer::start().await;
    let mut alice = server.connect("r1").await;
    server.wait_for_members("r1", 1).await;

    server.stop();

    let ended = timeout(READ_TIMEOUT, async {
        loop {
            match alice.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}
