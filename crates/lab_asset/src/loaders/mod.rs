//! Built-in loaders for the formats the viewer accepts

mod dxf;
pub mod gltf;
mod image;
mod obj;
mod point_cloud;
mod stl;

pub use self::dxf::DxfLoader;
pub use self::gltf::GltfLoader;
pub use self::image::ImageLoader;
pub use self::obj::ObjLoader;
pub use self::point_cloud::PointCloudLoader;
pub use self::stl::StlLoader;

use glam::Vec3;
use lab_scene::Vertex;

/// Fill in area-weighted vertex normals for an indexed triangle list.
/// Degenerate triangles contribute nothing; vertices with no contribution
/// point up.
pub(crate) fn generate_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accum = vec![Vec3::ZERO; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }

        let p0 = Vec3::from(vertices[i0].position);
        let p1 = Vec3::from(vertices[i1].position);
        let p2 = Vec3::from(vertices[i2].position);
        let face = (p1 - p0).cross(p2 - p0);

        accum[i0] += face;
        accum[i1] += face;
        accum[i2] += face;
    }

    for (vertex, n) in vertices.iter_mut().zip(accum) {
        vertex.normal = n.try_normalize().unwrap_or(Vec3::Y).to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_normals_flat_triangle() {
        let mut vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0; 3], [0.0; 2]),
            Vertex::new([1.0, 0.0, 0.0], [0.0; 3], [0.0; 2]),
            Vertex::new([0.0, 1.0, 0.0], [0.0; 3], [0.0; 2]),
            Vertex::new([5.0, 5.0, 5.0], [0.0; 3], [0.0; 2]),
        ];
        generate_normals(&mut vertices, &[0, 1, 2, 0, 1, 9]);

        for v in &vertices[..3] {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
        assert_eq!(vertices[3].normal, [0.0, 1.0, 0.0]);
    }
}
