// Rotation helpers on top of glam.
//
// Conventions: right-handed, Y up, an unrotated entity faces -Z. Euler
// triples are `(x = pitch, y = yaw, z = roll)` applied in XYZ order, i.e. a
// vector is rotated by Z first, then Y, then X: `v' = Rx(Ry(Rz(v)))`. This
// is the order browser peers use when they interpret our `rotation` field.

use glam::{DQuat, DVec3};

/// Quaternion for the Euler triple `euler` in XYZ order.
pub fn euler_xyz(euler: DVec3) -> DQuat {
    DQuat::from_rotation_x(euler.x)
        * DQuat::from_rotation_y(euler.y)
        * DQuat::from_rotation_z(euler.z)
}

/// Horizontal forward vector for a yaw: `(-sin yaw, 0, -cos yaw)`.
pub fn yaw_forward(yaw: f64) -> DVec3 {
    DQuat::from_rotation_y(yaw) * DVec3::NEG_Z
}

/// Horizontal right vector for a yaw: `(cos yaw, 0, -sin yaw)`.
pub fn yaw_right(yaw: f64) -> DVec3 {
    DQuat::from_rotation_y(yaw) * DVec3::X
}
