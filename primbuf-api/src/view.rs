//! Camera, projection and per-frame view data handed to the renderer by the host.
//!
//! World space is right-handed with y up; the device works in a left-handed space obtained by
//! negating z. The same flip is applied to packed vertex data, so both sides agree.

use std::f32::consts::{FRAC_PI_4, TAU};

use glam::{Mat4, Vec3};

/// Map a world-space point or direction into device space.
pub fn to_device_space(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
}

impl Camera {
    pub fn new(position: Vec3, look_at: Vec3) -> Self {
        Self { position, look_at, up: Vec3::Y }
    }

    pub fn view_direction(&self) -> Vec3 {
        (self.look_at - self.position).normalize_or_zero()
    }

    /// Angle of the view direction projected onto the ground plane, clockwise from north (+z),
    /// in `[0, 2π)`. A vertical view direction yields 0.
    pub fn ground_angle(&self) -> f32 {
        let dir = self.view_direction();
        let angle = dir.x.atan2(dir.z);
        if angle < 0.0 {
            angle + TAU
        } else {
            angle
        }
    }

    pub fn device_view_matrix(&self) -> Mat4 {
        Mat4::look_at_lh(
            to_device_space(self.position),
            to_device_space(self.look_at),
            to_device_space(self.up),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub orthographic: bool,
    /// Width / height.
    pub aspect_ratio: f32,
    /// Vertical field of view in radians (perspective only).
    pub vertical_fov: f32,
    /// Height of the view volume in world units (orthographic only).
    pub volume_height: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn perspective(aspect_ratio: f32, vertical_fov: f32, near: f32, far: f32) -> Self {
        Self {
            orthographic: false,
            aspect_ratio,
            vertical_fov,
            volume_height: 0.0,
            near,
            far,
        }
    }

    pub fn orthographic(aspect_ratio: f32, volume_height: f32, near: f32, far: f32) -> Self {
        Self {
            orthographic: true,
            aspect_ratio,
            vertical_fov: 0.0,
            volume_height,
            near,
            far,
        }
    }

    pub fn device_matrix(&self) -> Mat4 {
        if self.orthographic {
            let half_h = self.volume_height / 2.0;
            let half_w = half_h * self.aspect_ratio;
            Mat4::orthographic_lh(-half_w, half_w, -half_h, half_h, self.near, self.far)
        } else {
            Mat4::perspective_lh(self.vertical_fov, self.aspect_ratio, self.near, self.far)
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::perspective(4.0 / 3.0, FRAC_PI_4, 0.5, 1000.0)
    }
}

/// View data for the current frame.
#[derive(Clone, Debug)]
pub struct FrameView {
    pub camera: Camera,
    pub projection: Projection,
    pub viewport_size: (u32, u32),
    /// Optional main directional light (direction: unit vector, color: RGB). A default is used if None.
    pub directional_light: Option<([f32; 3], [f32; 3])>,
}

impl FrameView {
    pub fn new(camera: Camera, projection: Projection) -> Self {
        Self {
            camera,
            projection,
            viewport_size: (800, 600),
            directional_light: None,
        }
    }

    /// Column-major view-projection matrix in device space (WGSL/wgpu convention).
    pub fn view_proj(&self) -> [f32; 16] {
        (self.projection.device_matrix() * self.camera.device_view_matrix()).to_cols_array()
    }
}

impl Default for FrameView {
    fn default() -> Self {
        Self::new(Camera::new(Vec3::new(0.0, 10.0, -10.0), Vec3::ZERO), Projection::default())
    }
}
