// The local player: on-foot locomotion, jumping, and look.
//
// The player's state is two orthogonal axes: `JumpState` {Grounded,
// Jumping} and `Mode` {OnFoot, Piloting}. Jumping only happens on foot.
// While piloting, the plane (`flight.rs`) drives the player's position and
// yaw each tick and nothing here integrates.
//
// Locomotion composes up to four directional intents in the yaw frame,
// scales by base speed (times the boost multiplier), and tests the
// candidate against `World::movement_blocked`. A blocked move discards the
// whole horizontal step; there is no sliding. Vertical motion is
// independent and only runs while Jumping, with a hard clamp at the ground.

use glam::DVec3;

use crate::config::{JumpParams, LookParams, MovementParams, SimConfig};
use crate::input::{Action, InputState};
use crate::math::{yaw_forward, yaw_right};
use crate::world::World;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpState {
    Grounded,
    Jumping,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    OnFoot,
    Piloting,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub position: DVec3,
    /// Heading in radians. Also the plane's steering input while piloting.
    pub yaw: f64,
    /// Look pitch in radians, clamped by `LookParams::max_vertical_aim`.
    pub vertical_aim: f64,
    pub velocity: DVec3,
    pub jump: JumpState,
    pub mode: Mode,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            yaw: 0.0,
            vertical_aim: 0.0,
            velocity: DVec3::ZERO,
            jump: JumpState::Grounded,
            mode: Mode::OnFoot,
        }
    }
}

impl Player {
    pub fn is_piloting(&self) -> bool {
        self.mode == Mode::Piloting
    }

    /// Start a jump if grounded and on foot. Returns whether it started.
    pub fn try_jump(&mut self, params: &JumpParams) -> bool {
        if self.mode != Mode::OnFoot || self.jump != JumpState::Grounded {
            return false;
        }
        self.velocity.y = params.velocity;
        self.jump = JumpState::Jumping;
        true
    }

    /// Apply a pointer delta to yaw and vertical aim.
    pub fn look(&mut self, dx: f64, dy: f64, params: &LookParams) {
        self.yaw -= dx * params.sensitivity;
        self.vertical_aim = (self.vertical_aim - dy * params.sensitivity)
            .clamp(-params.max_vertical_aim, params.max_vertical_aim);
    }

    /// The horizontal displacement the held directions ask for this tick.
    pub fn desired_movement(&self, input: &InputState, params: &MovementParams, dt: f64) -> DVec3 {
        let boost = if input.is_held(Action::Boost) {
            params.boost_multiplier
        } else {
            1.0
        };
        let step = params.base_speed * boost * dt;
        let forward = input.axis(Action::Forward, Action::Backward);
        let strafe = input.axis(Action::Right, Action::Left);
        (yaw_forward(self.yaw) * forward + yaw_right(self.yaw) * strafe) * step
    }

    /// One on-foot tick: horizontal move with collision, then the jump arc.
    pub fn step_on_foot(&mut self, input: &InputState, world: &World, config: &SimConfig, dt: f64) {
        let movement = self.desired_movement(input, &config.movement, dt);
        if movement != DVec3::ZERO {
            let candidate = self.position + movement;
            let blocked = world.movement_blocked(
                self.position,
                candidate,
                &config.movement,
                &config.collision,
            );
            if !blocked {
                self.position = candidate;
            }
        }
        self.step_jump(&config.jump, dt);
    }

    fn step_jump(&mut self, params: &JumpParams, dt: f64) {
        if self.jump != JumpState::Jumping {
            return;
        }
        self.velocity.y -= params.gravity * dt;
        self.position.y += self.velocity.y * dt;
        if self.position.y <= params.ground_y {
            self.position.y = params.ground_y;
            self.velocity.y = 0.0;
            self.jump = JumpState::Grounded;
        }
    }
}
