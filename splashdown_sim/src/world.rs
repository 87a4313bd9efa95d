// Static world geometry and collision queries.
//
// The world holds the immutable collidable proxies the client sim tests
// against: trees (vertical cylinders) and buildings (rotated rectangular
// footprints with walls of a fixed thickness). Destructible `Target`s share
// the ray queries here but are owned by `ClientGame`, since they are the
// only world objects a balloon can remove.
//
// Placement of trees, buildings, and targets is up to whoever builds the
// scene; the sim only consumes the resulting geometry. A `World` is
// serde-(de)serializable so layouts can be shipped as JSON.
//
// Two query families:
// - `movement_blocked`: the on-foot move test. Trees block by a radius-sum
//   circle test on the candidate position. Buildings block only a move that
//   crosses a wall, i.e. exactly one of {current, candidate} lies inside
//   the inner footprint. Walking around inside or outside is always allowed.
// - `raycast`: the nearest intersection of a ray with targets (spheres) and
//   trees (finite cylinders), used by the balloon sweep and the crosshair.
//
// All queries are pure functions of their arguments.

use glam::{DQuat, DVec3, dvec2};
use serde::{Deserialize, Serialize};

use crate::config::{CollisionParams, MovementParams};

const EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A tree: a vertical cylinder standing on `position`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub position: DVec3,
    pub radius: f64,
    pub height: f64,
}

impl Tree {
    /// Distance along `dir` (unit length) at which a ray from `origin`
    /// first touches the cylinder. A ray starting inside hits at 0.
    pub fn ray_distance(&self, origin: DVec3, dir: DVec3) -> Option<f64> {
        let bottom = self.position.y;
        let top = self.position.y + self.height;
        let ox = origin.x - self.position.x;
        let oz = origin.z - self.position.z;
        let r2 = self.radius * self.radius;
        let within_height = |y: f64| y >= bottom && y <= top;
        let within_radius = |t: f64| {
            let x = ox + dir.x * t;
            let z = oz + dir.z * t;
            x * x + z * z <= r2
        };

        if ox * ox + oz * oz <= r2 && within_height(origin.y) {
            return Some(0.0);
        }

        let mut best: Option<f64> = None;
        let mut consider = |t: f64| {
            if t >= 0.0 && best.is_none_or(|b| t < b) {
                best = Some(t);
            }
        };

        // Side wall.
        let a = dir.x * dir.x + dir.z * dir.z;
        if a > EPSILON {
            let b = 2.0 * (ox * dir.x + oz * dir.z);
            let c = ox * ox + oz * oz - r2;
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let t = (-b - disc.sqrt()) / (2.0 * a);
                if within_height(origin.y + dir.y * t) {
                    consider(t);
                }
            }
        }

        // Caps.
        if dir.y.abs() > EPSILON {
            for plane in [top, bottom] {
                let t = (plane - origin.y) / dir.y;
                if within_radius(t) {
                    consider(t);
                }
            }
        }

        best
    }
}

/// A building: a rectangular footprint centered on `position`, rotated by
/// `rotation` radians about Y.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub position: DVec3,
    pub rotation: f64,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Building {
    /// `p` in the building's frame, as `(x, z)`: translate to the center,
    /// then rotate by `-rotation`.
    pub fn to_local(&self, p: DVec3) -> (f64, f64) {
        let local = DQuat::from_rotation_y(-self.rotation) * (p - self.position);
        (local.x, local.z)
    }

    fn is_near(&self, local: (f64, f64), margin: f64) -> bool {
        local.0.abs() < self.width / 2.0 + margin && local.1.abs() < self.depth / 2.0 + margin
    }

    fn is_inside(&self, local: (f64, f64), wall: f64) -> bool {
        local.0.abs() < self.width / 2.0 - wall && local.1.abs() < self.depth / 2.0 - wall
    }

    /// Whether moving from `current` to `candidate` passes through a wall.
    pub fn blocks(&self, current: DVec3, candidate: DVec3, collision: &CollisionParams) -> bool {
        let next = self.to_local(candidate);
        if !self.is_near(next, collision.building_margin) {
            return false;
        }
        let was_inside = self.is_inside(self.to_local(current), collision.wall_thickness);
        let is_inside = self.is_inside(next, collision.wall_thickness);
        was_inside != is_inside
    }
}

/// Identity of a destructible target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u32);

/// A destructible target, collided as its bounding sphere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub center: DVec3,
    pub radius: f64,
}

impl Target {
    pub fn ray_distance(&self, origin: DVec3, dir: DVec3) -> Option<f64> {
        ray_sphere(origin, dir, self.center, self.radius)
    }
}

/// Distance along `dir` (unit length) to the first intersection with the
/// sphere. A ray starting inside hits at 0.
pub fn ray_sphere(origin: DVec3, dir: DVec3, center: DVec3, radius: f64) -> Option<f64> {
    let oc = origin - center;
    let c = oc.dot(oc) - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = oc.dot(dir);
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// What a ray hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitKind {
    Target(TargetId),
    /// Index into `World::trees`.
    Tree(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub kind: HitKind,
    pub distance: f64,
    pub point: DVec3,
}

/// The immutable collidable scene.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub trees: Vec<Tree>,
    pub buildings: Vec<Building>,
}

impl World {
    pub fn new(trees: Vec<Tree>, buildings: Vec<Building>) -> Self {
        Self { trees, buildings }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether an on-foot move from `current` to `candidate` is blocked by
    /// any tree or building.
    pub fn movement_blocked(
        &self,
        current: DVec3,
        candidate: DVec3,
        movement: &MovementParams,
        collision: &CollisionParams,
    ) -> bool {
        let at = dvec2(candidate.x, candidate.z);
        let hits_tree = self.trees.iter().any(|tree| {
            at.distance(dvec2(tree.position.x, tree.position.z))
                < tree.radius + movement.player_radius
        });
        hits_tree
            || self
                .buildings
                .iter()
                .any(|b| b.blocks(current, candidate, collision))
    }

    /// Nearest hit of a ray from `origin` along `dir` against `targets` and
    /// trees. `dir` need not be normalized; a zero direction hits nothing.
    pub fn raycast(&self, targets: &[Target], origin: DVec3, dir: DVec3) -> Option<Hit> {
        let dir = dir.normalize_or_zero();
        if dir == DVec3::ZERO {
            return None;
        }
        let target_hits = targets
            .iter()
            .filter_map(|t| t.ray_distance(origin, dir).map(|d| (HitKind::Target(t.id), d)));
        let tree_hits = self
            .trees
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.ray_distance(origin, dir).map(|d| (HitKind::Tree(i), d)));

        target_hits
            .chain(tree_hits)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(kind, distance)| Hit {
                kind,
                distance,
                point: origin + dir * distance,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_4;

    use super::*;

    fn params() -> (MovementParams, CollisionParams) {
        (MovementParams::default(), CollisionParams::default())
    }

    fn tree_at(x: f64, z: f64) -> Tree {
        Tree {
            position: DVec3::new(x, 0.0, z),
            radius: 2.0,
            height: 10.0,
        }
    }

    fn house() -> Building {
        Building {
            position: DVec3::new(100.0, 0.0, 0.0),
            rotation: 0.0,
            width: 20.0,
            depth: 10.0,
            height: 15.0,
        }
    }

    #[test]
    fn tree_blocks_within_radius_sum() {
        let world = World::new(vec![tree_at(10.0, 0.0)], vec![]);
        let (m, c) = params();
        let here = DVec3::new(0.0, 0.0, 0.0);
        // 3 = tree radius 2 + player radius 1; strictly inside blocks.
        assert!(world.movement_blocked(here, DVec3::new(7.5, 0.0, 0.0), &m, &c));
        assert!(!world.movement_blocked(here, DVec3::new(7.0, 0.0, 0.0), &m, &c));
        // Height is ignored.
        assert!(world.movement_blocked(here, DVec3::new(8.0, 50.0, 0.0), &m, &c));
    }

    #[test]
    fn building_blocks_only_wall_crossings() {
        let world = World::new(vec![], vec![house()]);
        let (m, c) = params();
        let outside = DVec3::new(85.0, 0.0, 0.0);
        let outside_near = DVec3::new(89.6, 0.0, 0.0);
        let inside = DVec3::new(95.0, 0.0, 0.0);
        let inside_too = DVec3::new(96.0, 0.0, 1.0);

        // Entering or leaving crosses a wall.
        assert!(world.movement_blocked(outside_near, DVec3::new(90.6, 0.0, 0.0), &m, &c));
        assert!(world.movement_blocked(inside, DVec3::new(89.4, 0.0, 0.0), &m, &c));
        // Moving around inside, or outside, is fine.
        assert!(!world.movement_blocked(inside, inside_too, &m, &c));
        assert!(!world.movement_blocked(outside, outside_near, &m, &c));
        // Far away the building is not even considered.
        assert!(!world.movement_blocked(inside, DVec3::new(0.0, 0.0, 0.0), &m, &c));
    }

    #[test]
    fn building_rotation_is_respected() {
        let mut rotated = house();
        rotated.rotation = FRAC_PI_4;
        let (_, c) = params();
        let (s, co) = FRAC_PI_4.sin_cos();
        let on_long_axis = |d: f64| DVec3::new(100.0 + d * co, 0.0, -d * s);

        let local = rotated.to_local(on_long_axis(8.0));
        assert!((local.0 - 8.0).abs() < 1e-9);
        assert!(local.1.abs() < 1e-9);

        // Walking in along the rotated long axis crosses the end wall.
        let from = on_long_axis(10.6);
        let to = on_long_axis(9.0);
        assert!(rotated.blocks(from, to, &c));
        // The unrotated house is nowhere near those points.
        assert!(!house().blocks(from, to, &c));
    }

    #[test]
    fn collision_is_a_pure_function() {
        let world = World::new(vec![tree_at(5.0, 5.0)], vec![house()]);
        let (m, c) = params();
        let from = DVec3::new(89.0, 0.0, 0.0);
        let to = DVec3::new(91.0, 0.0, 0.0);
        let first = world.movement_blocked(from, to, &m, &c);
        for _ in 0..10 {
            assert_eq!(world.movement_blocked(from, to, &m, &c), first);
        }
    }

    #[test]
    fn sphere_raycast() {
        let origin = DVec3::new(0.0, 0.0, 0.0);
        let dir = DVec3::new(0.0, 0.0, -1.0);
        let t = ray_sphere(origin, dir, DVec3::new(0.0, 0.0, -10.0), 2.0).unwrap();
        assert!((t - 8.0).abs() < 1e-9);
        assert_eq!(ray_sphere(origin, -dir, DVec3::new(0.0, 0.0, -10.0), 2.0), None);
        assert_eq!(ray_sphere(origin, dir, DVec3::new(0.0, 0.5, 0.0), 2.0), Some(0.0));
    }

    #[test]
    fn cylinder_raycast_side_and_cap() {
        let tree = tree_at(0.0, -10.0);
        // Horizontal ray at trunk height hits the side wall.
        let t = tree
            .ray_distance(DVec3::new(0.0, 5.0, 0.0), DVec3::new(0.0, 0.0, -1.0))
            .unwrap();
        assert!((t - 8.0).abs() < 1e-9);
        // The same ray above the tree misses.
        assert_eq!(
            tree.ray_distance(DVec3::new(0.0, 12.0, 0.0), DVec3::new(0.0, 0.0, -1.0)),
            None
        );
        // Falling straight down onto it hits the top cap.
        let t = tree
            .ray_distance(DVec3::new(0.5, 30.0, -10.0), DVec3::new(0.0, -1.0, 0.0))
            .unwrap();
        assert!((t - 20.0).abs() < 1e-9);
    }

    #[test]
    fn raycast_picks_nearest() {
        let world = World::new(vec![tree_at(0.0, -30.0)], vec![]);
        let targets = vec![
            Target {
                id: TargetId(1),
                center: DVec3::new(0.0, 5.0, -50.0),
                radius: 1.0,
            },
            Target {
                id: TargetId(2),
                center: DVec3::new(0.0, 5.0, -20.0),
                radius: 1.0,
            },
        ];
        let hit = world
            .raycast(&targets, DVec3::new(0.0, 5.0, 0.0), DVec3::new(0.0, 0.0, -3.0))
            .unwrap();
        assert_eq!(hit.kind, HitKind::Target(TargetId(2)));
        assert!((hit.distance - 19.0).abs() < 1e-9);
        assert!((hit.point.z + 19.0).abs() < 1e-9);

        let hit = world
            .raycast(&targets[..1], DVec3::new(0.0, 5.0, 0.0), DVec3::new(0.0, 0.0, -1.0))
            .unwrap();
        assert_eq!(hit.kind, HitKind::Tree(0));

        assert_eq!(world.raycast(&targets, DVec3::ZERO, DVec3::ZERO), None);
    }

    #[test]
    fn world_loads_from_json() {
        let world = World::from_json(
            r#"{"trees":[{"position":[1,0,2],"radius":1.5,"height":8}],
                "buildings":[]}"#,
        )
        .unwrap();
        assert_eq!(world.trees.len(), 1);
        assert_eq!(world.trees[0].radius, 1.5);
    }
}
