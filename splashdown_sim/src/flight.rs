// Plane flight model.
//
// While piloting, each tick:
// - speed ramps by `acceleration` toward max (forward held) or min
//   (backward held), and is always kept within [min_speed, max_speed];
// - pitch tracks `-vertical_aim * pitch_sensitivity` exponentially;
// - yaw turns by the player's accumulated look yaw times
//   `turn_sensitivity`. The caller writes the plane's yaw back into the
//   player's yaw after the tick, so with no pointer input the heading
//   decays back toward zero;
// - roll banks against the turn rate, smoothed, and auto-levels when the
//   turn rate is near zero;
// - the plane advances along its Euler-XYZ forward vector, and altitude
//   integrates the pitch-driven climb rate within [min, max] altitude,
//   overriding the forward vector's vertical component.
//
// Altitude persists between flights; the plane stays wherever it was left.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::config::FlightParams;
use crate::input::{Action, InputState};
use crate::math::euler_xyz;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub position: DVec3,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub speed: f64,
    pub altitude: f64,
}

impl Plane {
    /// A parked plane at `params.spawn_position`.
    pub fn parked(params: &FlightParams) -> Self {
        Self {
            position: params.spawn_position,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            speed: 0.0,
            altitude: params.spawn_position.y,
        }
    }

    /// Orientation as an Euler triple (pitch, yaw, roll).
    pub fn orientation(&self) -> DVec3 {
        DVec3::new(self.pitch, self.yaw, self.roll)
    }

    /// Unit vector the nose points along.
    pub fn forward(&self) -> DVec3 {
        euler_xyz(self.orientation()) * DVec3::NEG_Z
    }

    /// Reset for boarding: minimum speed, wings level, canonical heading.
    pub fn board(&mut self, params: &FlightParams) {
        self.speed = params.min_speed;
        self.pitch = params.entry_orientation.x;
        self.yaw = params.entry_orientation.y;
        self.roll = params.entry_orientation.z;
    }

    /// One flight tick. `look_yaw` and `vertical_aim` are the player's
    /// current look angles.
    pub fn step(
        &mut self,
        input: &InputState,
        look_yaw: f64,
        vertical_aim: f64,
        params: &FlightParams,
        dt: f64,
    ) {
        if dt <= 0.0 {
            return;
        }

        if input.is_held(Action::Forward) {
            self.speed += params.acceleration * dt;
        } else if input.is_held(Action::Backward) {
            self.speed -= params.acceleration * dt;
        }
        self.speed = self.speed.clamp(params.min_speed, params.max_speed);

        let target_pitch = -vertical_aim * params.pitch_sensitivity;
        self.pitch += (target_pitch - self.pitch) * params.pitch_tracking * dt;

        let previous_yaw = self.yaw;
        self.yaw -= look_yaw * params.turn_sensitivity * dt;
        let turn_rate = (self.yaw - previous_yaw) / dt;

        let target_roll = -turn_rate * params.banking_sensitivity;
        self.roll += (target_roll - self.roll) * params.roll_tracking * dt;
        if turn_rate.abs() < params.auto_level_threshold {
            self.roll *= params.auto_level_decay;
        }

        self.roll = self.roll.clamp(-params.max_roll, params.max_roll);
        self.pitch = self.pitch.clamp(-params.max_pitch, params.max_pitch);

        self.position += self.forward() * (self.speed * dt);

        let climb = self.speed * self.pitch.sin() * dt * params.climb_factor;
        self.altitude = (self.altitude + climb).clamp(params.min_altitude, params.max_altitude);
        self.position.y = self.altitude;
    }
}
