//! Orbit camera rig and directional light
//!
//! Only the reset operations the asset manager drives are modelled here.
//! Input handling and smoothing belong to the host.

use glam::{EulerRot, Quat, Vec3};

/// Camera operations consumed by the asset manager
pub trait CameraRig {
    /// Viewport width / height
    fn aspect_ratio(&self) -> f32;

    /// Move the orbit focus point
    fn reset_position(&mut self, position: Vec3);

    /// Set the orbit distance
    fn reset_zoom(&mut self, zoom: f32);

    /// Set yaw (theta) and elevation (lambda), in radians
    fn reset_orbit(&mut self, theta: f32, lambda: f32);

    /// Restore the construction-time focus, zoom and angles
    fn reset_to_init(&mut self);
}

/// Pose snapshot of an [`OrbitCamera`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitPose {
    pub focus: Vec3,
    pub zoom: f32,
    pub theta: f32,
    pub lambda: f32,
}

/// Camera orbiting a focus point at a given distance
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pose: OrbitPose,
    init: OrbitPose,
    aspect_ratio: f32,
    near_plane: f32,
    far_plane: f32,
}

impl OrbitCamera {
    pub fn new(init: OrbitPose, aspect_ratio: f32) -> Self {
        let mut camera = Self {
            pose: init,
            init,
            aspect_ratio,
            near_plane: 0.0,
            far_plane: 0.0,
        };
        camera.reset_zoom(init.zoom);
        camera
    }

    pub fn pose(&self) -> OrbitPose {
        self.pose
    }

    pub fn init_pose(&self) -> OrbitPose {
        self.init
    }

    pub fn near_plane(&self) -> f32 {
        self.near_plane
    }

    pub fn far_plane(&self) -> f32 {
        self.far_plane
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Orientation of the orbit arm
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, -self.pose.theta, -self.pose.lambda, 0.0)
    }

    /// World-space eye position
    pub fn eye(&self) -> Vec3 {
        self.pose.focus + self.orientation() * Vec3::new(0.0, 0.0, self.pose.zoom)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(
            OrbitPose {
                focus: Vec3::ZERO,
                zoom: 5.0,
                theta: 0.0,
                lambda: 0.0,
            },
            16.0 / 9.0,
        )
    }
}

impl CameraRig for OrbitCamera {
    fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    fn reset_position(&mut self, position: Vec3) {
        self.pose.focus = position;
    }

    fn reset_zoom(&mut self, zoom: f32) {
        self.pose.zoom = zoom;
        self.near_plane = zoom / 500.0;
        self.far_plane = zoom * 10.0;
    }

    fn reset_orbit(&mut self, theta: f32, lambda: f32) {
        self.pose.theta = theta;
        self.pose.lambda = lambda;
    }

    fn reset_to_init(&mut self) {
        let init = self.init;
        self.reset_zoom(init.zoom);
        self.reset_position(init.focus);
        self.reset_orbit(init.theta, init.lambda);
    }
}

/// Key light; its shadow distance follows the framed asset size
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub shadow_distance: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.3).normalize(),
            shadow_distance: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_zoom_updates_planes() {
        let mut camera = OrbitCamera::default();
        camera.reset_zoom(50.0);

        assert_eq!(camera.pose().zoom, 50.0);
        assert_eq!(camera.near_plane(), 0.1);
        assert_eq!(camera.far_plane(), 500.0);
    }

    #[test]
    fn test_reset_to_init() {
        let mut camera = OrbitCamera::default();
        let init = camera.init_pose();

        camera.reset_position(Vec3::new(3.0, 4.0, 5.0));
        camera.reset_zoom(12.0);
        camera.reset_orbit(1.0, -0.5);
        camera.reset_to_init();

        assert_eq!(camera.pose(), init);
        assert_eq!(camera.far_plane(), init.zoom * 10.0);
    }

    #[test]
    fn test_eye_at_zero_angles() {
        let camera = OrbitCamera::default();
        assert!((camera.eye() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }
}
