// Protocol messages for client-relay communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by game clients to the relay.
// - `ServerMessage`: sent by the relay to game clients.
//
// On the wire every frame is a JSON object tagged by a `type` string with
// camelCase field names, e.g. `{"type":"playerUpdate","id":"..","position":
// {..},"rotation":{..},"isInPlane":false}`. serde's internal tagging maps
// each variant to exactly one `type` value, so adding a frame type is a
// compile-checked change at every `match`.
//
// Decoding goes through `codec.rs`, which distinguishes unknown frame types
// (ignored) from malformed frames (rejected). Do not call
// `serde_json::from_str::<ServerMessage>` directly on untrusted input, since
// that folds both cases into one error.

use serde::{Deserialize, Serialize};

use crate::types::{PlayerId, PlayerSnapshot, Vec3};

/// Messages sent by a client to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Latest transform of the sender's player (or plane, when piloting).
    Update {
        position: Vec3,
        rotation: Vec3,
        is_in_plane: bool,
    },
    /// The sender threw a water balloon. Relayed verbatim, unvalidated.
    WaterBalloon { position: Vec3, velocity: Vec3 },
}

/// Messages sent by the relay to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First frame on an accepted connection: the client's own id plus every
    /// other connected player.
    Init {
        id: PlayerId,
        players: Vec<PlayerSnapshot>,
    },
    /// Another player connected.
    PlayerJoined { id: PlayerId },
    /// Another player's latest transform.
    PlayerUpdate {
        id: PlayerId,
        position: Vec3,
        rotation: Vec3,
        is_in_plane: bool,
    },
    /// Another player disconnected or was evicted.
    PlayerLeft { id: PlayerId },
    /// A balloon thrown by player `id`.
    WaterBalloon {
        id: PlayerId,
        position: Vec3,
        velocity: Vec3,
    },
    /// Connection refused; the relay closes the channel after sending this.
    Error { message: String },
}

impl ClientMessage {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::WaterBalloon { .. } => "waterBalloon",
        }
    }
}

impl ServerMessage {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::PlayerJoined { .. } => "playerJoined",
            Self::PlayerUpdate { .. } => "playerUpdate",
            Self::PlayerLeft { .. } => "playerLeft",
            Self::WaterBalloon { .. } => "waterBalloon",
            Self::Error { .. } => "error",
        }
    }

    /// The player this frame is about, if any.
    pub fn subject(&self) -> Option<&PlayerId> {
        match self {
            Self::Init { id, .. }
            | Self::PlayerJoined { id }
            | Self::PlayerUpdate { id, .. }
            | Self::PlayerLeft { id }
            | Self::WaterBalloon { id, .. } => Some(id),
            Self::Error { .. } => None,
        }
    }
}
