// Session registry for the relay.
//
// `Registry` is the central data structure that `server.rs` drives. It owns
// one `Session` per connected client: the client's outbox, its last
// reported transform, and the time of its last inbound frame. All mutation
// happens through methods called from the server's single dispatch thread,
// so there is no internal locking.
//
// Key responsibilities:
// - Admission: enforce the player cap, mint ids, send `init` to the new
//   client and `playerJoined` to everyone else.
// - Relaying: `update` and `waterBalloon` frames are stamped with the
//   sender's id and fanned out to every other session. The relay keeps only
//   the latest transform per session (last write wins) and never validates
//   what clients report.
// - Departure: explicit disconnects and idle-timeout evictions both remove
//   the session and broadcast `playerLeft` exactly once.
//
// Writing to clients: each `Session` holds the `mpsc::Sender` side of its
// connection thread's outbox. A push never blocks. A push that fails (the
// connection thread is already gone) is logged and skipped; the connection
// thread reports its own `Disconnected` event, which removes the session.
//
// Time is passed in as `Instant` so tests can drive the idle sweep without
// sleeping.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rand::Rng;
use splashdown_protocol::codec::encode;
use splashdown_protocol::message::{ClientMessage, ServerMessage};
use splashdown_protocol::types::{PlayerId, PlayerSnapshot, Vec3};
use tracing::{debug, info, warn};

use crate::transport::Outbound;

/// Sent to a client refused at capacity, just before the channel closes.
pub const SERVER_FULL_MESSAGE: &str = "Server is full. Please try again later.";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_RANDOM_LEN: usize = 5;

/// A connection refused at capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rejected;

/// Relay-side state for one connected client.
struct Session {
    outbox: Sender<Outbound>,
    peer: SocketAddr,
    position: Vec3,
    rotation: Vec3,
    is_in_plane: bool,
    last_activity: Instant,
}

impl Session {
    fn snapshot(&self, id: &PlayerId) -> PlayerSnapshot {
        PlayerSnapshot {
            id: id.clone(),
            position: self.position,
            rotation: self.rotation,
            is_in_plane: self.is_in_plane,
        }
    }
}

/// All live sessions on one relay.
pub struct Registry {
    sessions: BTreeMap<PlayerId, Session>,
    max_players: usize,
    idle_timeout: Duration,
    next_sequence: u64,
}

impl Registry {
    pub fn new(max_players: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: BTreeMap::new(),
            max_players,
            idle_timeout,
            next_sequence: 0,
        }
    }

    /// Admit a new connection. On success the client has been sent `init`
    /// (listing every other session) and the others have been sent
    /// `playerJoined`. At capacity the client is sent an `error` frame and a
    /// close, and nothing is registered.
    pub fn connect(
        &mut self,
        outbox: Sender<Outbound>,
        peer: SocketAddr,
        now: Instant,
    ) -> Result<PlayerId, Rejected> {
        if self.sessions.len() >= self.max_players {
            info!(%peer, max_players = self.max_players, "rejecting connection: server full");
            let error = ServerMessage::Error {
                message: SERVER_FULL_MESSAGE.into(),
            };
            if let Ok(text) = encode(&error) {
                let _ = outbox.send(Outbound::Frame(text));
            }
            let _ = outbox.send(Outbound::Close);
            return Err(Rejected);
        }

        let id = self.mint_id();
        let players: Vec<PlayerSnapshot> = self
            .sessions
            .iter()
            .map(|(other_id, session)| session.snapshot(other_id))
            .collect();

        self.sessions.insert(
            id.clone(),
            Session {
                outbox,
                peer,
                position: Vec3::ZERO,
                rotation: Vec3::ZERO,
                is_in_plane: false,
                last_activity: now,
            },
        );
        info!(%id, %peer, players = self.sessions.len(), "player connected");

        self.send_to(
            &id,
            &ServerMessage::Init {
                id: id.clone(),
                players,
            },
        );
        self.broadcast(&ServerMessage::PlayerJoined { id: id.clone() }, Some(&id));
        Ok(id)
    }

    /// Apply one decoded frame from `id`'s channel.
    pub fn handle_message(&mut self, id: &PlayerId, message: ClientMessage, now: Instant) {
        let Some(session) = self.sessions.get_mut(id) else {
            debug!(%id, kind = message.kind(), "frame from unregistered player");
            return;
        };
        session.last_activity = now;

        let relayed = match message {
            ClientMessage::Update {
                position,
                rotation,
                is_in_plane,
            } => {
                session.position = position;
                session.rotation = rotation;
                session.is_in_plane = is_in_plane;
                ServerMessage::PlayerUpdate {
                    id: id.clone(),
                    position,
                    rotation,
                    is_in_plane,
                }
            }
            ClientMessage::WaterBalloon { position, velocity } => ServerMessage::WaterBalloon {
                id: id.clone(),
                position,
                velocity,
            },
        };
        self.broadcast(&relayed, Some(id));
    }

    /// Refresh `id`'s activity without relaying anything. Used for frames
    /// that failed to decode or had an unknown type.
    pub fn touch(&mut self, id: &PlayerId, now: Instant) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.last_activity = now;
        }
    }

    /// Remove `id` and tell everyone else. Returns false (and broadcasts
    /// nothing) if `id` was already gone.
    pub fn disconnect(&mut self, id: &PlayerId) -> bool {
        let Some(session) = self.sessions.remove(id) else {
            return false;
        };
        info!(%id, peer = %session.peer, players = self.sessions.len(), "player disconnected");
        self.broadcast(&ServerMessage::PlayerLeft { id: id.clone() }, None);
        true
    }

    /// Evict every session idle for longer than the timeout. Each evicted
    /// channel is told to close, and `playerLeft` is broadcast for it.
    pub fn sweep(&mut self, now: Instant) -> Vec<PlayerId> {
        let idle: Vec<PlayerId> = self
            .sessions
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.last_activity) > self.idle_timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &idle {
            if let Some(session) = self.sessions.remove(id) {
                info!(%id, peer = %session.peer, "evicting idle player");
                let _ = session.outbox.send(Outbound::Close);
            }
            self.broadcast(&ServerMessage::PlayerLeft { id: id.clone() }, None);
        }
        idle
    }

    /// Send `msg` to every session except `exclude`. Serializes once.
    pub fn broadcast(&self, msg: &ServerMessage, exclude: Option<&PlayerId>) {
        let text = match encode(msg) {
            Ok(text) => text,
            Err(e) => {
                warn!(kind = msg.kind(), error = %e, "failed to encode broadcast");
                return;
            }
        };
        for (id, session) in &self.sessions {
            if Some(id) == exclude {
                continue;
            }
            if session.outbox.send(Outbound::Frame(text.clone())).is_err() {
                warn!(%id, kind = msg.kind(), "send failed, channel already closed");
            }
        }
    }

    /// Returns the number of connected players.
    pub fn player_count(&self) -> usize {
        self.sessions.len()
    }

    /// Ids of all connected players, in id order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.sessions.keys().cloned().collect()
    }

    fn send_to(&self, id: &PlayerId, msg: &ServerMessage) {
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        match encode(msg) {
            Ok(text) => {
                if session.outbox.send(Outbound::Frame(text)).is_err() {
                    warn!(%id, kind = msg.kind(), "send failed, channel already closed");
                }
            }
            Err(e) => warn!(kind = msg.kind(), error = %e, "failed to encode frame"),
        }
    }

    /// `<unix millis>-<5 random base36 chars>-<sequence>`. The sequence
    /// alone makes ids unique within this process.
    fn mint_id(&mut self) -> PlayerId {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_RANDOM_LEN)
            .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
            .collect();
        let id = PlayerId(format!("{millis}-{suffix}-{}", self.next_sequence));
        self.next_sequence += 1;
        id
    }
}
