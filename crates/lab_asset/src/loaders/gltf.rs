//! glTF/GLB loader
//!
//! Supports:
//! - glTF 2.0 (.gltf + .bin) and GLB (.glb) formats
//! - Node hierarchy with local transforms
//! - Triangle primitives with positions, normals, UVs
//! - PBR metallic-roughness materials with embedded or external base colour textures
//! - Animation clip discovery (names and durations)
//!
//! The reported bounding box is the union of the primitives' accessor bounds,
//! carried through the node hierarchy into the root's space.

use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use lab_scene::{
    AlphaMode, AnimationClip, AnimationPlayer, BoundingBox, Component, MaterialSlot, Mesh,
    MeshPrimitive, PbrMaterial, SceneNode, Texture, Transform, Vertex,
};

use crate::loader::{node_name, LoadError, LoadResult, LoadedAsset, LoaderCategory, RuntimeLoader};

/// Loader for glTF/GLB files
#[derive(Debug, Default)]
pub struct GltfLoader;

impl GltfLoader {
    pub fn new() -> Self {
        Self
    }

    fn build(
        &self,
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        images: &[gltf::image::Data],
        path: &Path,
    ) -> LoadResult {
        let textures: Vec<Arc<Texture>> =
            images.iter().map(|i| Arc::new(convert_image(i))).collect();
        let materials = load_materials(document, &textures);

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| LoadError::empty(path))?;

        let mut root = SceneNode::new(node_name(path));
        let mut bounds: Option<BoundingBox> = None;

        for node in scene.nodes() {
            let child = build_node(&node, Mat4::IDENTITY, buffers, &mut bounds, path)?;
            root.children.push(child);
        }

        // A document with only empty nodes has nothing to show
        let bounds = bounds.ok_or_else(|| LoadError::empty(path))?;

        root.components.push(Component::Material(MaterialSlot::Pbr(materials)));

        let clips = load_animations(document, buffers);
        if !clips.is_empty() {
            log::debug!("GltfLoader: {} animation clip(s) in {}", clips.len(), path.display());
            root.components.push(Component::Animation(AnimationPlayer::new(clips)));
        }

        Ok(LoadedAsset::new(root, Some(bounds)))
    }
}

impl RuntimeLoader for GltfLoader {
    fn name(&self) -> &'static str {
        "gltf"
    }

    fn category(&self) -> LoaderCategory {
        LoaderCategory::Model
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".glb", ".gltf"]
    }

    /// Self-contained documents only: GLB or glTF with data URIs
    fn decode(&self, data: &[u8], path: &Path) -> LoadResult {
        let (document, buffers, images) =
            gltf::import_slice(data).map_err(|e| LoadError::decode(path, e))?;
        self.build(&document, &buffers, &images, path)
    }

    /// Resolves external buffers and images relative to the file
    fn load_asset(&self, path: &Path) -> LoadResult {
        let (document, buffers, images) = gltf::import(path).map_err(|e| match e {
            gltf::Error::Io(io) => LoadError::Io(io),
            other => LoadError::decode(path, other),
        })?;
        self.build(&document, &buffers, &images, path)
    }
}

fn build_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    bounds: &mut Option<BoundingBox>,
    path: &Path,
) -> Result<SceneNode, LoadError> {
    let local = Mat4::from_cols_array_2d(&node.transform().matrix());
    let to_root = parent * local;

    let mut out =
        SceneNode::new(node.name().unwrap_or("")).with_transform(Transform::from_matrix(local));

    if let Some(mesh) = node.mesh() {
        let mut primitives = Vec::new();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "GltfLoader: skipping {:?} primitive in {}",
                    primitive.mode(),
                    path.display()
                );
                continue;
            }

            primitives.push(load_primitive(&primitive, buffers, path)?);

            let bb = primitive.bounding_box();
            let prim_bounds =
                BoundingBox::new(Vec3::from(bb.min), Vec3::from(bb.max)).transform(&to_root);
            *bounds = Some(match bounds.take() {
                Some(b) => b.union(&prim_bounds),
                None => prim_bounds,
            });
        }

        out.components.push(Component::Mesh(Mesh {
            name: mesh.name().unwrap_or("").to_string(),
            primitives,
        }));
    }

    for child in node.children() {
        out.children.push(build_node(&child, to_root, buffers, bounds, path)?);
    }

    Ok(out)
}

fn load_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    path: &Path,
) -> Result<MeshPrimitive, LoadError> {
    let reader =
        primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| LoadError::decode(path, "mesh primitive without positions"))?
        .collect();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());

    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|t| t.into_f32().collect())
        .unwrap_or_default();

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|i| i.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let mut vertices: Vec<Vertex> = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            Vertex::new(
                position,
                normals.as_ref().and_then(|n| n.get(i).copied()).unwrap_or([0.0, 1.0, 0.0]),
                uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            )
        })
        .collect();

    if normals.is_none() {
        super::generate_normals(&mut vertices, &indices);
    }

    Ok(MeshPrimitive {
        vertices,
        indices,
        material_index: primitive.material().index(),
    })
}

fn convert_image(image: &gltf::image::Data) -> Texture {
    use gltf::image::Format;

    let pixels = &image.pixels;
    let data = match image.format {
        Format::R8G8B8A8 => pixels.clone(),
        Format::R8G8B8 => pixels.chunks_exact(3).flat_map(|c| [c[0], c[1], c[2], 255]).collect(),
        Format::R8G8 => pixels.chunks_exact(2).flat_map(|c| [c[0], c[1], 0, 255]).collect(),
        Format::R8 => pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        other => {
            log::warn!("GltfLoader: texture format {:?} not supported, using grey", other);
            vec![128u8; (image.width * image.height * 4) as usize]
        }
    };

    Texture {
        width: image.width,
        height: image.height,
        data,
        srgb: true,
    }
}

fn load_materials(document: &gltf::Document, textures: &[Arc<Texture>]) -> Vec<PbrMaterial> {
    let mut materials: Vec<PbrMaterial> = document
        .materials()
        .map(|mat| {
            let pbr = mat.pbr_metallic_roughness();
            PbrMaterial {
                name: mat.name().unwrap_or("").to_string(),
                base_color_factor: pbr.base_color_factor(),
                metallic_factor: pbr.metallic_factor(),
                roughness_factor: pbr.roughness_factor(),
                alpha_mode: match mat.alpha_mode() {
                    gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
                    gltf::material::AlphaMode::Mask => AlphaMode::Mask,
                    gltf::material::AlphaMode::Blend => AlphaMode::Blend,
                },
                double_sided: mat.double_sided(),
                base_color_texture: pbr
                    .base_color_texture()
                    .and_then(|t| textures.get(t.texture().source().index()).cloned()),
            }
        })
        .collect();

    // Primitives without a material fall back to the default one
    if materials.is_empty() {
        materials.push(PbrMaterial::default());
    }

    materials
}

fn load_animations(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Vec<AnimationClip> {
    document
        .animations()
        .map(|animation| {
            let duration = animation
                .channels()
                .filter_map(|channel| {
                    let reader = channel
                        .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
                    reader.read_inputs().map(|times| times.fold(0.0f32, f32::max))
                })
                .fold(0.0f32, f32::max);

            AnimationClip {
                name: animation
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("animation_{}", animation.index())),
                duration,
            }
        })
        .collect()
}
