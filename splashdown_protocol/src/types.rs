// Core value types for the multiplayer protocol.
//
// These are shared by `message.rs` (wire frames), the relay's session
// registry (`splashdown_relay::registry`), and the client simulation
// (`splashdown_sim`). `Vec3` is the wire shape only; the sim does its math
// in `glam::DVec3` and converts at the message boundary.
//
// All floating-point values are `f64`: browser clients speak JSON numbers,
// which are doubles, and the sim integrates in the same precision.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Relay-assigned player identity. Opaque to clients; unique per connection
/// and never reused by a running relay.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Vec3
// ---------------------------------------------------------------------------

/// A 3-component vector, serialized as `{"x":..,"y":..,"z":..}`.
///
/// Y is up. Forward for an unrotated entity is -Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<DVec3> for Vec3 {
    fn from(v: DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for DVec3 {
    fn from(v: Vec3) -> Self {
        DVec3::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Player snapshot
// ---------------------------------------------------------------------------

/// Last-known transform of one player, as listed in `init`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub position: Vec3,
    /// Euler angles (x = pitch, y = yaw, z = roll), radians.
    pub rotation: Vec3,
    pub is_in_plane: bool,
}
