//! Scene nodes and the components they own
//!
//! A [`SceneNode`] is a named, transformable entity with a list of
//! components and owned children. Loaders build node hierarchies; the scene
//! graph takes ownership when a node is inserted.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use parking_lot::RwLock;

use crate::bounds::BoundingBox;

/// Local transform (translation, rotation, scale)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Vertex layout shared by all triangle meshes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// One drawable triangle list within a mesh
#[derive(Clone, Debug, Default)]
pub struct MeshPrimitive {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Index into the owning node's material list
    pub material_index: Option<usize>,
}

impl MeshPrimitive {
    /// Bounds of the vertex positions, `None` when there are no vertices
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|v| Vec3::from(v.position)))
    }
}

/// Triangle mesh component
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub name: String,
    pub primitives: Vec<MeshPrimitive>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.vertices.len()).sum()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.primitives
            .iter()
            .filter_map(MeshPrimitive::bounding_box)
            .reduce(|a, b| a.union(&b))
    }
}

/// Flat quad on the local XZ plane, facing +Y
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneMesh {
    pub width: f32,
    pub height: f32,
}

/// RGBA8 texture data
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub data: Vec<u8>,
    pub srgb: bool,
}

impl Texture {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Alpha blending mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// Metallic-roughness material
#[derive(Clone, Debug)]
pub struct PbrMaterial {
    pub name: String,
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
    pub base_color_texture: Option<Arc<Texture>>,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
            base_color_texture: None,
        }
    }
}

/// Texture sampling mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Sampler {
    #[default]
    LinearWrap,
    LinearClamp,
}

/// Unlit textured material used for flat image quads
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceMaterial {
    pub lighting_enabled: bool,
    pub ibl_enabled: bool,
    pub alpha_cutout: f32,
    pub alpha_blended: bool,
    pub sampler: Sampler,
    pub base_color_texture: Option<Arc<Texture>>,
}

impl SurfaceMaterial {
    /// Unlit, alpha-cut, clamped: the configuration for displaying images
    pub fn unlit_image() -> Self {
        Self {
            lighting_enabled: false,
            ibl_enabled: false,
            alpha_cutout: 0.01,
            alpha_blended: true,
            sampler: Sampler::LinearClamp,
            base_color_texture: None,
        }
    }
}

/// Material instance that several nodes may reference
pub type SharedMaterial = Arc<RwLock<SurfaceMaterial>>;

/// Material attached to a node
#[derive(Clone, Debug)]
pub enum MaterialSlot {
    Pbr(Vec<PbrMaterial>),
    Surface(SharedMaterial),
}

/// Drawable batch of points
#[derive(Clone, Debug, Default)]
pub struct PointBatch {
    pub positions: Vec<Vec3>,
    /// Per-point RGBA, empty when the source has no colour
    pub colors: Vec<[u8; 4]>,
}

impl PointBatch {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions.iter().copied())
    }
}

/// Drawable batch of line segments
#[derive(Clone, Debug, Default)]
pub struct LineBatch {
    pub segments: Vec<(Vec3, Vec3)>,
}

impl LineBatch {
    pub fn push(&mut self, a: Vec3, b: Vec3) {
        self.segments.push((a, b));
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.segments.iter().flat_map(|&(a, b)| [a, b]))
    }
}

/// Named animation clip
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds
    pub duration: f32,
}

/// Animation playback settings for a node hierarchy
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationPlayer {
    pub clips: Vec<AnimationClip>,
    pub play_automatically: bool,
    pub looping: bool,
}

impl AnimationPlayer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            play_automatically: false,
            looping: false,
        }
    }

    pub fn has_clips(&self) -> bool {
        !self.clips.is_empty()
    }
}

/// Component owned by a scene node
#[derive(Clone, Debug)]
pub enum Component {
    Mesh(Mesh),
    Plane(PlaneMesh),
    Material(MaterialSlot),
    Points(PointBatch),
    Lines(LineBatch),
    Animation(AnimationPlayer),
}

/// Typed access to a [`Component`] variant
pub trait NodeComponent: Sized {
    fn from_component(component: &Component) -> Option<&Self>;
    fn from_component_mut(component: &mut Component) -> Option<&mut Self>;
}

macro_rules! impl_node_component {
    ($ty:ty, $variant:ident) => {
        impl NodeComponent for $ty {
            fn from_component(component: &Component) -> Option<&Self> {
                match component {
                    Component::$variant(c) => Some(c),
                    _ => None,
                }
            }

            fn from_component_mut(component: &mut Component) -> Option<&mut Self> {
                match component {
                    Component::$variant(c) => Some(c),
                    _ => None,
                }
            }
        }
    };
}

impl_node_component!(Mesh, Mesh);
impl_node_component!(PlaneMesh, Plane);
impl_node_component!(MaterialSlot, Material);
impl_node_component!(PointBatch, Points);
impl_node_component!(LineBatch, Lines);
impl_node_component!(AnimationPlayer, Animation);

/// Entity in the scene graph
#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub components: Vec<Component>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// First component of type `T` on this node
    pub fn find_component<T: NodeComponent>(&self) -> Option<&T> {
        self.components.iter().find_map(T::from_component)
    }

    pub fn find_component_mut<T: NodeComponent>(&mut self) -> Option<&mut T> {
        self.components.iter_mut().find_map(T::from_component_mut)
    }

    /// Depth-first search of this node and its descendants
    pub fn find_component_in_children<T: NodeComponent>(&self) -> Option<&T> {
        self.find_component::<T>()
            .or_else(|| self.children.iter().find_map(|c| c.find_component_in_children::<T>()))
    }

    pub fn find_component_in_children_mut<T: NodeComponent>(&mut self) -> Option<&mut T> {
        if self.find_component::<T>().is_some() {
            return self.find_component_mut::<T>();
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_component_in_children_mut::<T>())
    }

    /// Number of nodes in this hierarchy, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}
