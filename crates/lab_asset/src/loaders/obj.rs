//! Wavefront OBJ loader
//!
//! Each OBJ object becomes a child node with one mesh. Faces are triangulated
//! and re-indexed to a single index stream. When loading from disk, `mtllib`
//! references are resolved next to the file and their diffuse colours become
//! PBR base colours; in-memory decodes skip materials.

use std::io::BufReader;
use std::path::Path;

use lab_scene::{
    BoundingBox, Component, MaterialSlot, Mesh, MeshPrimitive, PbrMaterial, SceneNode, Vertex,
};

use crate::loader::{node_name, LoadError, LoadResult, LoadedAsset, LoaderCategory, RuntimeLoader};

/// Loader for OBJ files
#[derive(Debug, Default)]
pub struct ObjLoader;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

impl RuntimeLoader for ObjLoader {
    fn name(&self) -> &'static str {
        "obj"
    }

    fn category(&self) -> LoaderCategory {
        LoaderCategory::Model
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".obj"]
    }

    fn decode(&self, data: &[u8], path: &Path) -> LoadResult {
        let mut reader = BufReader::new(data);
        let (models, _) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
            Ok((Vec::new(), Default::default()))
        })
        .map_err(|e| LoadError::decode(path, e))?;

        build(models, Vec::new(), path)
    }

    fn load_asset(&self, path: &Path) -> LoadResult {
        let data = std::fs::read(path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut reader = BufReader::new(data.as_slice());
        let (models, materials) =
            tobj::load_obj_buf(&mut reader, &load_options(), |mtl| tobj::load_mtl(dir.join(mtl)))
                .map_err(|e| LoadError::decode(path, e))?;

        // A missing .mtl is not fatal; the geometry still shows with defaults
        let materials = match materials {
            Ok(materials) => materials,
            Err(e) => {
                log::warn!("ObjLoader: ignoring materials for {}: {}", path.display(), e);
                Vec::new()
            }
        };

        build(models, materials, path)
    }
}

fn build(models: Vec<tobj::Model>, materials: Vec<tobj::Material>, path: &Path) -> LoadResult {
    let mut root = SceneNode::new(node_name(path));
    let mut bounds: Option<BoundingBox> = None;

    for model in models {
        let primitive = convert_mesh(&model.mesh);
        let Some(mesh_bounds) = primitive.bounding_box() else {
            continue;
        };
        bounds = Some(match bounds {
            Some(b) => b.union(&mesh_bounds),
            None => mesh_bounds,
        });

        root.children.push(SceneNode::new(model.name.clone()).with_component(Component::Mesh(Mesh {
            name: model.name,
            primitives: vec![primitive],
        })));
    }

    let bounds = bounds.ok_or_else(|| LoadError::empty(path))?;

    let mut pbr: Vec<PbrMaterial> = materials.iter().map(convert_material).collect();
    if pbr.is_empty() {
        pbr.push(PbrMaterial::default());
    }
    root.components.push(Component::Material(MaterialSlot::Pbr(pbr)));

    Ok(LoadedAsset::new(root, Some(bounds)))
}

fn convert_mesh(mesh: &tobj::Mesh) -> MeshPrimitive {
    let count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() >= count * 3 && count > 0;

    let mut vertices: Vec<Vertex> = (0..count)
        .map(|i| {
            let position = [
                mesh.positions[3 * i],
                mesh.positions[3 * i + 1],
                mesh.positions[3 * i + 2],
            ];
            let normal = if has_normals {
                [mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2]]
            } else {
                [0.0, 1.0, 0.0]
            };
            let uv = if mesh.texcoords.len() >= 2 * (i + 1) {
                // OBJ UVs are bottom-left origin
                [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
            } else {
                [0.0, 0.0]
            };
            Vertex::new(position, normal, uv)
        })
        .collect();

    let indices: Vec<u32> = if mesh.indices.is_empty() {
        (0..count as u32).collect()
    } else {
        mesh.indices.clone()
    };

    if !has_normals {
        super::generate_normals(&mut vertices, &indices);
    }

    MeshPrimitive {
        vertices,
        indices,
        material_index: mesh.material_id,
    }
}

fn convert_material(material: &tobj::Material) -> PbrMaterial {
    let [r, g, b] = material.diffuse.unwrap_or([1.0, 1.0, 1.0]);
    let alpha = material.dissolve.unwrap_or(1.0);

    PbrMaterial {
        name: material.name.clone(),
        base_color_factor: [r, g, b, alpha],
        metallic_factor: 0.0,
        roughness_factor: 1.0,
        alpha_mode: if alpha < 1.0 {
            lab_scene::AlphaMode::Blend
        } else {
            lab_scene::AlphaMode::Opaque
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const TWO_OBJECTS: &str = "\
o left
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o right
v 2 0 0
v 3 0 0
v 3 2 -1
f 4 5 6
";

    #[test]
    fn test_objects_become_children() {
        let asset = ObjLoader.decode(TWO_OBJECTS.as_bytes(), Path::new("pair.obj")).unwrap();
        assert_eq!(asset.node.name, "pair");
        assert_eq!(asset.node.children.len(), 2);
        assert_eq!(asset.node.children[0].name, "left");

        let bounds = asset.bounds.unwrap();
        assert_eq!(bounds.min, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 2.0, 0.0));
    }

    #[test]
    fn test_missing_normals_are_generated() {
        let asset = ObjLoader.decode(TWO_OBJECTS.as_bytes(), Path::new("pair.obj")).unwrap();
        let mesh = asset.node.children[0].find_component::<Mesh>().unwrap();
        for v in &mesh.primitives[0].vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_no_faces_is_empty() {
        let err = ObjLoader.decode(b"# nothing here\n", Path::new("blank.obj")).unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }
}
