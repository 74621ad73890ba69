//! Perspective camera with a cached reverse-Z projection.

use crate::pipeline::CameraUniform;
use glam::{Mat4, Quat, Vec3};

/// A perspective camera. The projection matrix is cached and only rebuilt
/// by [`update_projection_matrix`](Self::update_projection_matrix), so
/// changing `aspect_ratio` or the clip planes has no effect until then.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
    projection: Mat4,
}

impl Camera {
    /// Camera at `position` looking down -Z.
    pub fn perspective(
        position: Vec3,
        fov_y_degrees: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut camera = Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            aspect_ratio,
            near,
            far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Rebuild the cached projection from the current parameters.
    /// Reverse-Z: near maps to depth 1, far to depth 0.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near);
    }

    /// Set the aspect ratio and rebuild the projection.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.update_projection_matrix();
    }

    /// Inverse of the camera's world transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    /// The cached projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            camera_pos: self.position.extend(1.0).to_array(),
        }
    }
}

impl Default for Camera {
    /// 75 degree field of view at (0, 0, 5), clipping at 0.1 and 1000.
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 5.0), 75.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}
