//! STL loader (binary and ASCII)
//!
//! Binary files are recognised by size: an 80-byte header, a u32 triangle
//! count and 50 bytes per triangle. Anything else starting with `solid` is
//! parsed as ASCII. Facets are emitted unshared with flat normals.

use std::path::Path;

use glam::Vec3;
use lab_scene::{Component, MaterialSlot, Mesh, MeshPrimitive, PbrMaterial, SceneNode, Vertex};

use crate::loader::{node_name, LoadError, LoadResult, LoadedAsset, LoaderCategory, RuntimeLoader};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

/// Loader for STL files
#[derive(Debug, Default)]
pub struct StlLoader;

impl RuntimeLoader for StlLoader {
    fn name(&self) -> &'static str {
        "stl"
    }

    fn category(&self) -> LoaderCategory {
        LoaderCategory::Model
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".stl"]
    }

    fn decode(&self, data: &[u8], path: &Path) -> LoadResult {
        let triangles = if is_binary(data) {
            parse_binary(data)
        } else {
            let text = std::str::from_utf8(data).map_err(|e| LoadError::decode(path, e))?;
            if !text.trim_start().starts_with("solid") {
                return Err(LoadError::decode(path, "neither binary nor ASCII STL"));
            }
            parse_ascii(text).map_err(|msg| LoadError::decode(path, msg))?
        };

        if triangles.is_empty() {
            return Err(LoadError::empty(path));
        }

        let primitive = flat_primitive(&triangles);
        let bounds = primitive.bounding_box().ok_or_else(|| LoadError::empty(path))?;

        let node = SceneNode::new(node_name(path))
            .with_component(Component::Mesh(Mesh {
                name: node_name(path),
                primitives: vec![primitive],
            }))
            .with_component(Component::Material(MaterialSlot::Pbr(vec![PbrMaterial {
                metallic_factor: 0.0,
                roughness_factor: 0.8,
                ..Default::default()
            }])));

        Ok(LoadedAsset::new(node, Some(bounds)))
    }
}

fn is_binary(data: &[u8]) -> bool {
    if data.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    count
        .checked_mul(TRIANGLE_LEN)
        .and_then(|n| n.checked_add(HEADER_LEN + 4))
        .map_or(false, |expected| expected == data.len())
}

fn read_vec3(bytes: &[u8]) -> Vec3 {
    let f = |o: usize| f32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);
    Vec3::new(f(0), f(4), f(8))
}

fn parse_binary(data: &[u8]) -> Vec<[Vec3; 3]> {
    data[HEADER_LEN + 4..]
        .chunks_exact(TRIANGLE_LEN)
        // Stored normal (first 12 bytes) is recomputed
        .map(|tri| [read_vec3(&tri[12..]), read_vec3(&tri[24..]), read_vec3(&tri[36..])])
        .collect()
}

fn parse_ascii(text: &str) -> Result<Vec<[Vec3; 3]>, String> {
    let mut triangles = Vec::new();
    let mut corners: Vec<Vec3> = Vec::with_capacity(3);

    for (line_no, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("vertex") => {
                let coords: Vec<f32> = parts
                    .take(3)
                    .map(str::parse)
                    .collect::<Result<_, _>>()
                    .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
                if coords.len() != 3 {
                    return Err(format!("line {}: vertex needs three coordinates", line_no + 1));
                }
                corners.push(Vec3::new(coords[0], coords[1], coords[2]));
            }
            Some("endfacet") => {
                if corners.len() != 3 {
                    return Err(format!(
                        "line {}: facet with {} vertices",
                        line_no + 1,
                        corners.len()
                    ));
                }
                triangles.push([corners[0], corners[1], corners[2]]);
                corners.clear();
            }
            _ => {}
        }
    }

    Ok(triangles)
}

fn flat_primitive(triangles: &[[Vec3; 3]]) -> MeshPrimitive {
    let mut vertices = Vec::with_capacity(triangles.len() * 3);

    for [a, b, c] in triangles {
        let normal = (*b - *a).cross(*c - *a).try_normalize().unwrap_or(Vec3::Y).to_array();
        for p in [a, b, c] {
            vertices.push(Vertex::new(p.to_array(), normal, [0.0, 0.0]));
        }
    }

    MeshPrimitive {
        indices: (0..vertices.len() as u32).collect(),
        vertices,
        material_index: Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            data.extend_from_slice(&[0u8; 12]);
            for corner in tri {
                for c in corner {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&[0u8; 2]);
        }
        data
    }

    #[test]
    fn test_binary_detection_by_size() {
        let data = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        assert_eq!(data.len(), 134);
        assert!(is_binary(&data));
        assert!(!is_binary(&data[..133]));
    }

    #[test]
    fn test_binary_header_starting_with_solid() {
        let mut data = binary_stl(&[[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 3.0]]]);
        data[..5].copy_from_slice(b"solid");

        let asset = StlLoader.decode(&data, Path::new("part.stl")).unwrap();
        let bounds = asset.bounds.unwrap();
        assert_eq!(bounds.max, Vec3::new(2.0, 0.0, 3.0));
    }

    #[test]
    fn test_ascii_facet_count_checked() {
        let text = "solid t\nfacet normal 0 0 1\nouter loop\n\
                    vertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\nendsolid t\n";
        let err = StlLoader.decode(text.as_bytes(), Path::new("bad.stl")).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn test_flat_normals() {
        let prim = flat_primitive(&[[Vec3::ZERO, Vec3::X, Vec3::Y]]);
        assert_eq!(prim.vertices.len(), 3);
        assert!(prim.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }
}
