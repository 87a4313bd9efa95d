// Remote entity mirror.
//
// A pure cache of the other players, fed by relay frames. There is no
// interpolation or extrapolation: each `playerUpdate` overwrites the stored
// transform wholesale, so applying the same update twice is the same as
// applying it once. The mirror never stores the local player: the own id
// learned from `init` is filtered out of every frame.
//
// `waterBalloon` frames are not stored here; `apply` hands them back to the
// caller as a `MirrorEffect` to spawn a decorative remote projectile.

use std::collections::BTreeMap;

use glam::DVec3;
use splashdown_protocol::message::ServerMessage;
use splashdown_protocol::types::{PlayerId, PlayerSnapshot};
use tracing::{debug, info, warn};

/// Last known state of another player.
#[derive(Clone, Debug, PartialEq)]
pub struct RemotePlayer {
    pub position: DVec3,
    pub rotation: DVec3,
    pub is_in_plane: bool,
}

impl RemotePlayer {
    fn from_snapshot(snap: &PlayerSnapshot) -> Self {
        Self {
            position: snap.position.into(),
            rotation: snap.rotation.into(),
            is_in_plane: snap.is_in_plane,
        }
    }

    fn placeholder() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DVec3::ZERO,
            is_in_plane: false,
        }
    }
}

/// Something the caller must act on after a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum MirrorEffect {
    None,
    SpawnBalloon { position: DVec3, velocity: DVec3 },
    /// The relay reported an error (e.g. it is full).
    Status(String),
}

#[derive(Clone, Debug, Default)]
pub struct RemoteMirror {
    own_id: Option<PlayerId>,
    players: BTreeMap<PlayerId, RemotePlayer>,
}

impl RemoteMirror {
    pub fn own_id(&self) -> Option<&PlayerId> {
        self.own_id.as_ref()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&RemotePlayer> {
        self.players.get(id)
    }

    pub fn players(&self) -> impl Iterator<Item = (&PlayerId, &RemotePlayer)> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Forget every remote player and the own id (new connection).
    pub fn clear(&mut self) {
        self.players.clear();
        self.own_id = None;
    }

    fn is_self(&self, id: &PlayerId) -> bool {
        self.own_id.as_ref() == Some(id)
    }

    /// Apply one relay frame.
    pub fn apply(&mut self, msg: ServerMessage) -> MirrorEffect {
        match msg {
            ServerMessage::Init { id, players } => {
                info!(%id, others = players.len(), "joined relay");
                for snap in &players {
                    if snap.id != id && !self.players.contains_key(&snap.id) {
                        self.players
                            .insert(snap.id.clone(), RemotePlayer::from_snapshot(snap));
                    }
                }
                self.players.remove(&id);
                self.own_id = Some(id);
            }
            ServerMessage::PlayerJoined { id } => {
                if !self.is_self(&id) {
                    debug!(%id, "player joined");
                    self.players.entry(id).or_insert_with(RemotePlayer::placeholder);
                }
            }
            ServerMessage::PlayerUpdate {
                id,
                position,
                rotation,
                is_in_plane,
            } => {
                if let Some(player) = self.players.get_mut(&id) {
                    *player = RemotePlayer {
                        position: position.into(),
                        rotation: rotation.into(),
                        is_in_plane,
                    };
                }
            }
            ServerMessage::PlayerLeft { id } => {
                if self.players.remove(&id).is_some() {
                    debug!(%id, "player left");
                }
            }
            ServerMessage::WaterBalloon {
                id,
                position,
                velocity,
            } => {
                if !self.is_self(&id) {
                    return MirrorEffect::SpawnBalloon {
                        position: position.into(),
                        velocity: velocity.into(),
                    };
                }
            }
            ServerMessage::Error { message } => {
                warn!(%message, "relay error");
                return MirrorEffect::Status(message);
            }
        }
        MirrorEffect::None
    }
}
