// Third-person camera rig.
//
// The camera pose matters to the sim, not just to rendering: balloons
// launch from the camera position along the camera's forward vector, and
// the crosshair ray is cast the same way.
//
// On foot the camera sits behind an over-the-shoulder offset rotated by the
// player's yaw, looking at a point ahead along the aim direction (yaw then
// vertical aim). Aiming moves the camera closer and further over the
// shoulder. In the plane the camera sits at the plane offset rotated by the
// plane's full orientation and looks at the plane.

use glam::{DQuat, DVec3};

use crate::config::CameraParams;
use crate::flight::Plane;
use crate::math::euler_xyz;
use crate::player::Player;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: DVec3,
    pub look_at: DVec3,
}

impl CameraPose {
    /// Unit view direction. Falls back to -Z if the pose is degenerate.
    pub fn forward(&self) -> DVec3 {
        (self.look_at - self.position)
            .try_normalize()
            .unwrap_or(DVec3::NEG_Z)
    }

    pub fn on_foot(player: &Player, aiming: bool, params: &CameraParams) -> Self {
        let mut offset = params.on_foot_offset;
        let mut shoulder = params.shoulder_offset;
        if aiming {
            offset.z = params.aim_offset_z;
            shoulder.x = params.aim_shoulder_x;
        }
        let turn = DQuat::from_rotation_y(player.yaw);
        let shoulder = turn * shoulder;
        let offset = turn * offset;
        let aim_dir = aim_direction(player);

        Self {
            position: player.position + shoulder + offset,
            look_at: player.position + params.look_target + shoulder + aim_dir * params.look_ahead,
        }
    }

    pub fn chase(plane: &Plane, params: &CameraParams) -> Self {
        Self {
            position: plane.position + euler_xyz(plane.orientation()) * params.plane_offset,
            look_at: plane.position,
        }
    }
}

/// The player's aim: -Z pitched by vertical aim, then turned by yaw.
pub fn aim_direction(player: &Player) -> DVec3 {
    DQuat::from_rotation_y(player.yaw) * DQuat::from_rotation_x(player.vertical_aim) * DVec3::NEG_Z
}
