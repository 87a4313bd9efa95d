// Data-driven client simulation configuration.
//
// Every tunable simulation parameter lives here in `SimConfig`. The sim
// never uses magic numbers; it reads from the config. The defaults match
// the tuning of the shipped browser client, so a `SimConfig::default()`
// client interoperates with browser peers.
//
// Parameters are grouped into nested structs: `MovementParams`,
// `JumpParams`, `FlightParams`, `ProjectileParams`, `LookParams`,
// `CameraParams`, `CollisionParams`, and `SyncParams`. Every group is
// `#[serde(default)]`, so an override file only needs the fields it changes:
//
//     {"flight": {"max_speed": 650.0}, "sync": {"publish_interval_ms": 33.0}}
//
// See also: `player.rs` (movement, jump, look), `flight.rs`, `projectile.rs`,
// `camera.rs`, `world.rs` (collision margins), and `sync.rs`.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_3};

use glam::DVec3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// On-foot locomotion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementParams {
    /// Walking speed, units per second.
    pub base_speed: f64,
    /// Speed multiplier while boost is held.
    pub boost_multiplier: f64,
    /// Radius of the player's collision circle in the XZ plane.
    pub player_radius: f64,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            base_speed: 50.0,
            boost_multiplier: 2.5,
            player_radius: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpParams {
    /// Upward velocity applied at takeoff.
    pub velocity: f64,
    /// Downward acceleration while airborne.
    pub gravity: f64,
    /// Height of the walkable ground plane.
    pub ground_y: f64,
}

impl Default for JumpParams {
    fn default() -> Self {
        Self {
            velocity: 20.0,
            gravity: 25.0,
            ground_y: 0.0,
        }
    }
}

/// Plane handling. Angles are radians, rates are per second.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightParams {
    pub min_speed: f64,
    pub max_speed: f64,
    /// Speed change per second while forward/backward is held.
    pub acceleration: f64,
    /// Target pitch is `-vertical_aim * pitch_sensitivity`.
    pub pitch_sensitivity: f64,
    /// Exponential tracking rate of pitch toward its target.
    pub pitch_tracking: f64,
    /// Yaw change per second per radian of accumulated look yaw.
    pub turn_sensitivity: f64,
    /// Target roll is `-turn_rate * banking_sensitivity`.
    pub banking_sensitivity: f64,
    /// Exponential tracking rate of roll toward its target.
    pub roll_tracking: f64,
    /// Below this turn rate the roll is decayed toward level.
    pub auto_level_threshold: f64,
    /// Per-tick roll multiplier while auto-leveling.
    pub auto_level_decay: f64,
    pub max_roll: f64,
    pub max_pitch: f64,
    /// Scales the pitch-driven climb rate.
    pub climb_factor: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    /// Where the parked plane starts.
    pub spawn_position: DVec3,
    /// Orientation (pitch, yaw, roll) the plane snaps to on boarding.
    pub entry_orientation: DVec3,
}

impl Default for FlightParams {
    fn default() -> Self {
        Self {
            min_speed: 100.0,
            max_speed: 500.0,
            acceleration: 300.0,
            pitch_sensitivity: 2.0,
            pitch_tracking: 10.0,
            turn_sensitivity: 3.0,
            banking_sensitivity: 1.5,
            roll_tracking: 5.0,
            auto_level_threshold: 0.01,
            auto_level_decay: 0.95,
            max_roll: FRAC_PI_2,
            max_pitch: FRAC_PI_3,
            climb_factor: 1.2,
            min_altitude: 10.0,
            max_altitude: 2000.0,
            spawn_position: DVec3::new(0.0, 0.0, -50.0),
            entry_orientation: DVec3::new(0.0, FRAC_PI_2, 0.0),
        }
    }
}

/// Water balloons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileParams {
    /// Launch speed along the camera's forward vector.
    pub throw_speed: f64,
    pub gravity: f64,
    /// Lifetime on the client clock, milliseconds.
    pub ttl_ms: f64,
    /// A balloon below this height splashes on the ground.
    pub splash_height: f64,
}

impl Default for ProjectileParams {
    fn default() -> Self {
        Self {
            throw_speed: 350.0,
            gravity: 3.0,
            ttl_ms: 8000.0,
            splash_height: -2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookParams {
    /// Radians per pointer unit, both axes.
    pub sensitivity: f64,
    /// Vertical aim is clamped to `[-max_vertical_aim, max_vertical_aim]`.
    pub max_vertical_aim: f64,
}

impl Default for LookParams {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            max_vertical_aim: FRAC_PI_3,
        }
    }
}

/// Third-person camera rig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// Offset behind the player on foot, before yaw rotation.
    pub on_foot_offset: DVec3,
    /// Offset behind the plane, in the plane's frame.
    pub plane_offset: DVec3,
    /// Offset Z while aiming (closer to the shoulder).
    pub aim_offset_z: f64,
    pub shoulder_offset: DVec3,
    /// Shoulder X while aiming.
    pub aim_shoulder_x: f64,
    /// Point above the player's feet the camera looks past.
    pub look_target: DVec3,
    /// How far along the aim direction the look target is pushed.
    pub look_ahead: f64,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            on_foot_offset: DVec3::new(0.0, 2.0, 6.0),
            plane_offset: DVec3::new(0.0, 5.0, 20.0),
            aim_offset_z: 4.0,
            shoulder_offset: DVec3::new(0.5, 0.0, 0.0),
            aim_shoulder_x: 0.8,
            look_target: DVec3::new(0.0, 2.0, 0.0),
            look_ahead: 8.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionParams {
    /// Building walls are this thick, measured inward from the footprint.
    pub wall_thickness: f64,
    /// Buildings are only tested when the candidate is within this distance
    /// of the footprint.
    pub building_margin: f64,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            wall_thickness: 0.5,
            building_margin: 1.0,
        }
    }
}

/// Network publish cadence and reconnect policy, milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncParams {
    pub publish_interval_ms: f64,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for SyncParams {
    fn default() -> Self {
        Self {
            publish_interval_ms: 50.0,
            reconnect_base_ms: 1000,
            reconnect_max_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Complete client simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Integration step cap in seconds. Longer frames are integrated as one
    /// step of this length.
    pub max_dt: f64,
    pub movement: MovementParams,
    pub jump: JumpParams,
    pub flight: FlightParams,
    pub projectile: ProjectileParams,
    pub look: LookParams,
    pub camera: CameraParams,
    pub collision: CollisionParams,
    pub sync: SyncParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_dt: 1.0 / 30.0,
            movement: MovementParams::default(),
            jump: JumpParams::default(),
            flight: FlightParams::default(),
            projectile: ProjectileParams::default(),
            look: LookParams::default(),
            camera: CameraParams::default(),
            collision: CollisionParams::default(),
            sync: SyncParams::default(),
        }
    }
}

impl SimConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
