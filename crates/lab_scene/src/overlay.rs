//! "Drop a file here" help overlay and debug line drawing

use glam::Vec3;

use crate::bounds::BoundingBox;

/// Informational overlay shown while nothing is loaded
pub trait DropOverlay {
    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;

    /// Supported extensions grouped under a human readable heading
    fn set_supported_files(&mut self, groups: &[(String, Vec<String>)]);
}

/// Text overlay listing the droppable file types
#[derive(Clone, Debug, Default)]
pub struct HelpOverlay {
    visible: bool,
    text: String,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl DropOverlay for HelpOverlay {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_supported_files(&mut self, groups: &[(String, Vec<String>)]) {
        let mut text = String::from("Drag and drop the following files:\n");
        for (heading, extensions) in groups {
            text.push_str(&format!("· {}: {}\n", heading, extensions.join(", ")));
        }
        self.text = text;
    }
}

/// RGBA colour for debug primitives
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const RED: Self = Self([1.0, 0.0, 0.0, 1.0]);
    pub const BLUE: Self = Self([0.0, 0.0, 1.0, 1.0]);
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);
}

/// Immediate-mode debug line sink
pub trait DebugDraw {
    fn draw_line(&mut self, a: Vec3, b: Vec3, color: Color);

    fn draw_bounding_box(&mut self, bounds: &BoundingBox, color: Color) {
        for (a, b) in bounds.edges() {
            self.draw_line(a, b, color);
        }
    }

    /// Three axis-aligned crossing lines of length `size`
    fn draw_point(&mut self, point: Vec3, size: f32, color: Color) {
        let h = size * 0.5;
        self.draw_line(point - Vec3::X * h, point + Vec3::X * h, color);
        self.draw_line(point - Vec3::Y * h, point + Vec3::Y * h, color);
        self.draw_line(point - Vec3::Z * h, point + Vec3::Z * h, color);
    }
}

/// Debug sink that records lines for the current frame
#[derive(Clone, Debug, Default)]
pub struct DebugLines {
    pub lines: Vec<(Vec3, Vec3, Color)>,
}

impl DebugLines {
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl DebugDraw for DebugLines {
    fn draw_line(&mut self, a: Vec3, b: Vec3, color: Color) {
        self.lines.push((a, b, color));
    }
}
