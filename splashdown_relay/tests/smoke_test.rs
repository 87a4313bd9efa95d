// Integration smoke tests for the relay server.
//
// Each test starts a relay on a free localhost port and drives it with raw
// tungstenite clients that speak the protocol crate's codec. No simulation
// code is involved, so these exercise the relay end-to-end: handshake,
// admission and the player cap, fan-out with self-exclusion, disconnect,
// idle eviction, and tolerance of malformed frames.

use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use splashdown_protocol::codec::{Decoded, decode_server, encode};
use splashdown_protocol::message::{ClientMessage, ServerMessage};
use splashdown_protocol::types::{PlayerId, Vec3};
use splashdown_relay::config::RelayConfig;
use splashdown_relay::registry::SERVER_FULL_MESSAGE;
use splashdown_relay::server::{RelayHandle, start_relay};
use tungstenite::{Error as WsError, Message, WebSocket};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn start(max_players: usize, inactive_timeout: Duration) -> (RelayHandle, SocketAddr) {
    let config = RelayConfig {
        bind_addr: "127.0.0.1".into(),
        port: 0,
        max_players,
        inactive_timeout,
    };
    start_relay(config).unwrap()
}

/// A bare WebSocket client.
struct RawClient {
    ws: WebSocket<TcpStream>,
}

impl RawClient {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(RECV_TIMEOUT)).unwrap();
        let (ws, _) = tungstenite::client::client(format!("ws://{addr}/"), stream).unwrap();
        Self { ws }
    }

    /// Connect and consume the `init` frame.
    fn join(addr: SocketAddr) -> (Self, PlayerId, Vec<PlayerId>) {
        let mut client = Self::connect(addr);
        match client.recv() {
            ServerMessage::Init { id, players } => {
                let others = players.into_iter().map(|p| p.id).collect();
                (client, id, others)
            }
            other => panic!("expected init, got {other:?}"),
        }
    }

    fn send(&mut self, msg: &ClientMessage) {
        self.send_text(&encode(msg).unwrap());
    }

    fn send_text(&mut self, text: &str) {
        self.ws.send(Message::Text(text.into())).unwrap();
    }

    fn recv(&mut self) -> ServerMessage {
        self.try_recv(RECV_TIMEOUT)
            .unwrap_or_else(|| panic!("no frame within {RECV_TIMEOUT:?}"))
    }

    /// Next server frame, or `None` if nothing arrives within `wait`.
    fn try_recv(&mut self, wait: Duration) -> Option<ServerMessage> {
        self.ws.get_ref().set_read_timeout(Some(wait)).unwrap();
        let result = loop {
            match self.ws.read() {
                Ok(Message::Text(text)) => match decode_server(&text).unwrap() {
                    Decoded::Message(msg) => break Some(msg),
                    Decoded::Unknown(kind) => panic!("unknown frame type {kind}"),
                },
                Ok(_) => continue,
                Err(WsError::Io(e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    break None;
                }
                Err(e) => panic!("read failed: {e}"),
            }
        };
        self.ws.get_ref().set_read_timeout(Some(RECV_TIMEOUT)).unwrap();
        result
    }

    fn expect_silence(&mut self, wait: Duration) {
        if let Some(msg) = self.try_recv(wait) {
            panic!("expected no frame, got {msg:?}");
        }
    }

    /// Read until the relay closes the channel, returning any text frames
    /// that arrived first.
    fn read_until_closed(&mut self) -> Vec<ServerMessage> {
        let mut frames = Vec::new();
        loop {
            match self.ws.read() {
                Ok(Message::Text(text)) => {
                    if let Ok(Decoded::Message(msg)) = decode_server(&text) {
                        frames.push(msg);
                    }
                }
                Ok(_) => continue,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return frames,
                Err(WsError::Io(e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    panic!("relay did not close the channel")
                }
                // A reset after the close frame also counts as closed.
                Err(_) => return frames,
            }
        }
    }

    fn close(mut self) {
        let _ = self.ws.close(None);
        let _ = self.read_until_closed();
    }
}

fn update_at(x: f64) -> ClientMessage {
    ClientMessage::Update {
        position: Vec3::new(x, 0.0, 0.0),
        rotation: Vec3::new(0.0, 0.5, 0.0),
        is_in_plane: false,
    }
}

#[test]
fn three_player_session_lifecycle() {
    let (handle, addr) = start(50, Duration::from_secs(60));

    let (mut a, id_a, others) = RawClient::join(addr);
    assert!(others.is_empty());

    let (mut b, id_b, others) = RawClient::join(addr);
    assert_eq!(others, vec![id_a.clone()]);
    assert_eq!(a.recv(), ServerMessage::PlayerJoined { id: id_b.clone() });

    let (mut c, id_c, mut others) = RawClient::join(addr);
    others.sort();
    let mut expected = vec![id_a.clone(), id_b.clone()];
    expected.sort();
    assert_eq!(others, expected);
    assert_eq!(a.recv(), ServerMessage::PlayerJoined { id: id_c.clone() });
    assert_eq!(b.recv(), ServerMessage::PlayerJoined { id: id_c.clone() });

    a.send(&update_at(4.0));
    let relayed = ServerMessage::PlayerUpdate {
        id: id_a.clone(),
        position: Vec3::new(4.0, 0.0, 0.0),
        rotation: Vec3::new(0.0, 0.5, 0.0),
        is_in_plane: false,
    };
    assert_eq!(b.recv(), relayed);
    assert_eq!(c.recv(), relayed);
    a.expect_silence(Duration::from_millis(200));

    a.close();
    assert_eq!(b.recv(), ServerMessage::PlayerLeft { id: id_a.clone() });
    assert_eq!(c.recv(), ServerMessage::PlayerLeft { id: id_a });
    b.expect_silence(Duration::from_millis(300));
    c.expect_silence(Duration::from_millis(300));

    handle.stop();
}

#[test]
fn capacity_one_rejects_second_client() {
    let (handle, addr) = start(1, Duration::from_secs(60));

    let (mut a, _id_a, _) = RawClient::join(addr);

    let mut b = RawClient::connect(addr);
    let frames = b.read_until_closed();
    assert_eq!(
        frames,
        vec![ServerMessage::Error {
            message: SERVER_FULL_MESSAGE.into()
        }]
    );

    a.expect_silence(Duration::from_millis(300));

    // The slot is still A's; a third attempt is refused too.
    let mut c = RawClient::connect(addr);
    assert!(matches!(
        c.read_until_closed().as_slice(),
        [ServerMessage::Error { .. }]
    ));

    handle.stop();
}

#[test]
fn idle_client_is_evicted() {
    let (handle, addr) = start(10, Duration::from_millis(200));

    let (mut idle, id_idle, _) = RawClient::join(addr);
    let (mut active, _id_active, _) = RawClient::join(addr);
    assert!(matches!(idle.recv(), ServerMessage::PlayerJoined { .. }));

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut saw_left = false;
    while Instant::now() < deadline {
        active.send(&update_at(1.0));
        if let Some(msg) = active.try_recv(Duration::from_millis(50)) {
            assert_eq!(msg, ServerMessage::PlayerLeft { id: id_idle.clone() });
            saw_left = true;
            break;
        }
    }
    assert!(saw_left, "idle client was never evicted");

    // The idle client sees the active one's updates, then a close.
    let frames = idle.read_until_closed();
    assert!(
        frames
            .iter()
            .all(|m| matches!(m, ServerMessage::PlayerUpdate { .. }))
    );

    active.expect_silence(Duration::from_millis(300));
    handle.stop();
}

#[test]
fn malformed_frames_keep_the_channel_open() {
    let (handle, addr) = start(10, Duration::from_secs(60));

    let (mut a, id_a, _) = RawClient::join(addr);
    let (mut b, _id_b, _) = RawClient::join(addr);
    a.recv();

    a.send_text("this is not json");
    a.send_text(r#"{"type":"chat","text":"hi"}"#);
    a.send_text(r#"{"type":"update","position":{"x":1}}"#);
    a.send(&update_at(9.0));

    match b.recv() {
        ServerMessage::PlayerUpdate { id, position, .. } => {
            assert_eq!(id, id_a);
            assert_eq!(position.x, 9.0);
        }
        other => panic!("expected playerUpdate, got {other:?}"),
    }
    b.expect_silence(Duration::from_millis(200));

    handle.stop();
}

#[test]
fn water_balloon_skips_thrower() {
    let (handle, addr) = start(10, Duration::from_secs(60));

    let (mut a, id_a, _) = RawClient::join(addr);
    let (mut b, _id_b, _) = RawClient::join(addr);
    a.recv();

    let position = Vec3::new(0.0, 2.0, 0.0);
    let velocity = Vec3::new(0.0, 50.0, -340.0);
    a.send(&ClientMessage::WaterBalloon { position, velocity });

    assert_eq!(
        b.recv(),
        ServerMessage::WaterBalloon {
            id: id_a,
            position,
            velocity
        }
    );
    a.expect_silence(Duration::from_millis(200));

    handle.stop();
}
