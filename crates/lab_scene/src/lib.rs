//! # lab_scene - Viewer Collaborators
//!
//! The pieces of the viewer the runtime asset subsystem talks to:
//! - Scene nodes, components and an in-memory scene graph
//! - Axis-aligned bounding boxes
//! - Orbit camera rig and directional light
//! - "Drop a file" help overlay and debug line drawing
//!
//! Rendering, windowing and input live elsewhere; this crate only models
//! their interfaces.

pub mod bounds;
pub mod camera;
pub mod node;
pub mod overlay;
pub mod scene;

pub use bounds::BoundingBox;
pub use camera::{CameraRig, DirectionalLight, OrbitCamera, OrbitPose};
pub use node::{
    AlphaMode, AnimationClip, AnimationPlayer, Component, LineBatch, MaterialSlot, Mesh,
    MeshPrimitive, NodeComponent, PbrMaterial, PlaneMesh, PointBatch, Sampler, SceneNode,
    SharedMaterial, SurfaceMaterial, Texture, Transform, Vertex,
};
pub use overlay::{Color, DebugDraw, DebugLines, DropOverlay, HelpOverlay};
pub use scene::{NodeId, Scene, SceneGraph};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::bounds::BoundingBox;
    pub use crate::camera::{CameraRig, OrbitCamera};
    pub use crate::node::{Component, NodeComponent, SceneNode, Transform};
    pub use crate::scene::{NodeId, Scene, SceneGraph};
}
