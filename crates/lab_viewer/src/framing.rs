//! Camera framing around a world-space bounding box

use lab_scene::{BoundingBox, CameraRig, DirectionalLight};

use crate::config::CameraConfig;

/// Smallest orbit distance framing will produce, for zero-extent assets
const MIN_ZOOM: f32 = 1e-3;

/// Orbit distance that fits `bounds` on screen.
///
/// `half-diagonal * reset_zoom * max(1 / camera_aspect, min_aspect_guard)`.
/// The guard keeps wide viewports from pulling the camera in too close.
pub fn compute_zoom(
    bounds: &BoundingBox,
    reset_zoom: f32,
    camera_aspect: f32,
    min_aspect_guard: f32,
) -> f32 {
    let inverse_aspect = if camera_aspect > 0.0 {
        1.0 / camera_aspect
    } else {
        min_aspect_guard
    };
    let zoom = bounds.half_extents().length() * reset_zoom * inverse_aspect.max(min_aspect_guard);
    zoom.max(MIN_ZOOM)
}

/// Framing parameters, angles in radians
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFraming {
    pub reset_zoom: f32,
    pub theta: f32,
    pub lambda: f32,
    pub min_aspect_guard: f32,
    pub shadow_distance_factor: f32,
}

impl CameraFraming {
    /// Point the camera at `bounds` and return the chosen zoom
    pub fn frame(
        &self,
        bounds: &BoundingBox,
        camera: &mut dyn CameraRig,
        light: Option<&mut DirectionalLight>,
    ) -> f32 {
        let zoom = compute_zoom(
            bounds,
            self.reset_zoom,
            camera.aspect_ratio(),
            self.min_aspect_guard,
        );

        camera.reset_position(bounds.center());
        camera.reset_zoom(zoom);
        camera.reset_orbit(self.theta, self.lambda);

        if let Some(light) = light {
            light.shadow_distance = zoom * self.shadow_distance_factor;
        }

        zoom
    }
}

impl From<&CameraConfig> for CameraFraming {
    fn from(config: &CameraConfig) -> Self {
        Self {
            reset_zoom: config.reset_zoom,
            theta: config.reset_theta_deg.to_radians(),
            lambda: config.reset_lambda_deg.to_radians(),
            min_aspect_guard: config.min_aspect_guard,
            shadow_distance_factor: config.shadow_distance_factor,
        }
    }
}

impl Default for CameraFraming {
    fn default() -> Self {
        Self::from(&CameraConfig::default())
    }
}
