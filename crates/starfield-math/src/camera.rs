//! Camera pose consumed once per tick by culling, streaming, and prediction.

use glam::{Mat4, Quat, Vec3};

/// Position, orientation, and projection parameters of the viewer.
///
/// Projection uses reverse-Z: the near plane maps to depth 1 and the far plane to 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// World-space position.
    pub position: Vec3,
    /// Rotation as a unit quaternion. Looks down -Z when identity.
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y: std::f32::consts::FRAC_PI_3,
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 100_000.0,
        }
    }
}

impl CameraPose {
    /// A pose at `position` oriented toward `target` with +Y up.
    ///
    /// Falls back to +Z as the up hint when the view direction is vertical.
    pub fn look_at(position: Vec3, target: Vec3, fov_y: f32) -> Self {
        let forward = (target - position).try_normalize().unwrap_or(Vec3::NEG_Z);
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-8 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_to_rh(position, forward, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        Self {
            position,
            rotation,
            fov_y,
            ..Self::default()
        }
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// The up direction vector (+Y in camera space).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// View matrix: inverse of the camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    /// Reverse-Z perspective projection (near and far swapped).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }

    /// Combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_negative_z() {
        let cam = CameraPose::default();
        assert!((cam.forward() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_look_at_points_at_target() {
        let cam = CameraPose::look_at(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO, 1.0);
        assert!((cam.forward() - Vec3::NEG_X).length() < 1e-5);
        assert_eq!(cam.fov_y, 1.0);
    }

    #[test]
    fn test_look_at_straight_up_is_finite() {
        let cam = CameraPose::look_at(Vec3::ZERO, Vec3::new(0.0, 50.0, 0.0), 1.0);
        assert!(cam.forward().is_finite());
        assert!((cam.forward() - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_near_plane_maps_to_depth_one() {
        let cam = CameraPose::default();
        let clip = cam.view_projection_matrix() * glam::Vec4::new(0.0, 0.0, -cam.near, 1.0);
        assert!((clip.z / clip.w - 1.0).abs() < 1e-4);
    }
}
