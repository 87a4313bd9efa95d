// Water balloon ballistics.
//
// Every balloon falls under `ProjectileParams::gravity` and lives at most
// `ttl_ms` on the client clock. Balloons come in two provenances:
// - `Local`: thrown by this client. Each tick sweeps a ray from the old to
//   the new position against targets and trees; the nearest hit within the
//   tick's travel destroys the balloon with a big splash at the hit point
//   and, for a target, removes the target.
// - `Remote`: mirrored from another player's `waterBalloon`. Decorative
//   only: gravity, ground splash, TTL. Remote balloons never collide, so
//   they can never destroy this client's targets.
//
// A balloon that falls below `splash_height` without hitting anything is
// destroyed with a small splash on the ground. Destruction is terminal; a
// balloon yields at most one outcome.

use glam::DVec3;

use crate::config::ProjectileParams;
use crate::world::{HitKind, Target, TargetId, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provenance {
    Local,
    Remote,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub position: DVec3,
    pub velocity: DVec3,
    /// Client clock time of the throw, milliseconds.
    pub spawned_at_ms: f64,
    pub provenance: Provenance,
}

/// A splash effect for the render collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Splash {
    pub position: DVec3,
    /// Big splashes mark a hit on a target or tree.
    pub big: bool,
}

/// What happened to a balloon this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    Flying,
    /// Hit something; `destroyed` is set if it was a target.
    Hit {
        splash: Splash,
        destroyed: Option<TargetId>,
    },
    /// Fell below the ground threshold.
    Landed(Splash),
    /// Outlived its TTL.
    Expired,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Flying)
    }

    pub fn splash(&self) -> Option<Splash> {
        match *self {
            Outcome::Hit { splash, .. } | Outcome::Landed(splash) => Some(splash),
            Outcome::Flying | Outcome::Expired => None,
        }
    }
}

impl Projectile {
    pub fn new(position: DVec3, velocity: DVec3, now_ms: f64, provenance: Provenance) -> Self {
        Self {
            position,
            velocity,
            spawned_at_ms: now_ms,
            provenance,
        }
    }

    /// Advance one tick. `dt` is the clamped integration step in seconds;
    /// `now_ms` is the client clock after this frame.
    pub fn step(
        &mut self,
        world: &World,
        targets: &[Target],
        params: &ProjectileParams,
        dt: f64,
        now_ms: f64,
    ) -> Outcome {
        self.velocity.y -= params.gravity * dt;
        let movement = self.velocity * dt;

        if self.provenance == Provenance::Local {
            let travel = movement.length();
            if travel > 0.0 {
                if let Some(hit) = world.raycast(targets, self.position, movement) {
                    if hit.distance <= travel {
                        let destroyed = match hit.kind {
                            HitKind::Target(id) => Some(id),
                            HitKind::Tree(_) => None,
                        };
                        return Outcome::Hit {
                            splash: Splash {
                                position: hit.point,
                                big: true,
                            },
                            destroyed,
                        };
                    }
                }
            }
        }

        self.position += movement;
        if self.position.y < params.splash_height {
            return Outcome::Landed(Splash {
                position: DVec3::new(self.position.x, params.splash_height, self.position.z),
                big: false,
            });
        }
        if now_ms - self.spawned_at_ms > params.ttl_ms {
            return Outcome::Expired;
        }
        Outcome::Flying
    }
}
