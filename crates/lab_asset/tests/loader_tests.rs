//! Integration tests for lab_asset

use std::fs;
use std::io::Cursor;
use std::path::Path;

use glam::Vec3;
use lab_asset::*;
use lab_scene::{AnimationPlayer, MaterialSlot, Mesh, PlaneMesh, PointBatch};

/// Single triangle under a node translated by +2 on Y, with one
/// two-keyframe animation lasting 1.5 seconds.
fn triangle_glb() -> Vec<u8> {
    let mut bin = Vec::new();
    for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    for t in [0.0f32, 1.5] {
        bin.extend_from_slice(&t.to_le_bytes());
    }
    for v in [0.0f32, 2.0, 0.0, 0.0, 3.0, 0.0] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    assert_eq!(bin.len(), 68);

    let json = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"name": "tri", "mesh": 0, "translation": [0, 2, 0]}],
        "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0}}]}],
        "buffers": [{"byteLength": 68}],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 8},
            {"buffer": 0, "byteOffset": 44, "byteLength": 24}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [0, 0, 0], "max": [1, 1, 0]},
            {"bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
             "min": [0], "max": [1.5]},
            {"bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3"}
        ],
        "animations": [{
            "name": "bounce",
            "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}],
            "samplers": [{"input": 1, "output": 2}]
        }]
    }"#;

    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn test_glb_bounds_follow_node_transform() {
    let asset = GltfLoader::new().decode(&triangle_glb(), Path::new("tri.glb")).unwrap();
    let bounds = asset.bounds.expect("glTF reports bounds");

    assert_eq!(bounds.min, Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 0.0));

    let child = &asset.node.children[0];
    assert_eq!(child.name, "tri");
    assert_eq!(child.transform.translation, Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(child.find_component::<Mesh>().unwrap().vertex_count(), 3);
}

#[test]
fn test_glb_animations_discovered() {
    let asset = GltfLoader::new().decode(&triangle_glb(), Path::new("tri.glb")).unwrap();
    let player = asset.node.find_component::<AnimationPlayer>().expect("animation player on root");

    assert_eq!(player.clips.len(), 1);
    assert_eq!(player.clips[0].name, "bounce");
    assert_eq!(player.clips[0].duration, 1.5);
    // Playback is decided by whoever installs the asset
    assert!(!player.play_automatically);
}

#[test]
fn test_glb_from_disk_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Robot.GLB");
    fs::write(&path, triangle_glb()).unwrap();

    let registry = LoaderRegistry::with_default_loaders();
    let loader = registry.find_loader(&path).expect("glb is supported");
    assert_eq!(loader.name(), "gltf");

    let asset = loader.load_asset(&path).unwrap();
    assert_eq!(asset.node.name, "Robot");
    assert!(asset.bounds.is_some());
}

#[test]
fn test_truncated_glb_fails() {
    let glb = triangle_glb();
    let err = GltfLoader::new().decode(&glb[..glb.len() / 2], Path::new("cut.glb")).unwrap_err();
    assert!(matches!(err, LoadError::Decode { .. }));
}

#[test]
fn test_obj_with_material_library() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("box.mtl"), "newmtl red\nKd 1 0 0\n").unwrap();
    fs::write(
        dir.path().join("box.obj"),
        "mtllib box.mtl\no box\nv 0 0 0\nv 2 0 0\nv 2 3 0\nv 0 3 0\nusemtl red\nf 1 2 3 4\n",
    )
    .unwrap();

    let asset = ObjLoader.load_asset(&dir.path().join("box.obj")).unwrap();

    let bounds = asset.bounds.unwrap();
    assert_eq!(bounds.max, Vec3::new(2.0, 3.0, 0.0));

    let mesh = asset.node.children[0].find_component::<Mesh>().unwrap();
    assert_eq!(mesh.primitives[0].indices.len(), 6, "quad is triangulated");
    assert_eq!(mesh.primitives[0].material_index, Some(0));

    let Some(MaterialSlot::Pbr(materials)) = asset.node.find_component::<MaterialSlot>() else {
        panic!("obj root without materials");
    };
    assert_eq!(materials[0].name, "red");
    assert_eq!(materials[0].base_color_factor, [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_obj_missing_mtl_still_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lonely.obj");
    fs::write(&path, "mtllib gone.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

    let asset = ObjLoader.load_asset(&path).unwrap();
    assert!(asset.bounds.is_some());
}

#[test]
fn test_stl_ascii() {
    let stl = "solid tri\n\
               facet normal 0 0 1\n outer loop\n\
               vertex 0 0 0\n  vertex 4 0 0\n  vertex 0 2 1\n endloop\nendfacet\n\
               endsolid tri\n";
    let asset = StlLoader.decode(stl.as_bytes(), Path::new("tri.stl")).unwrap();
    let bounds = asset.bounds.unwrap();
    assert_eq!(bounds.min, Vec3::ZERO);
    assert_eq!(bounds.max, Vec3::new(4.0, 2.0, 1.0));
}

#[test]
fn test_stl_without_facets_is_empty() {
    let err = StlLoader
        .decode(b"solid nothing\nendsolid nothing\n", Path::new("e.stl"))
        .unwrap_err();
    assert!(matches!(err, LoadError::Empty(_)));
}

#[test]
fn test_image_plane_and_shared_material() {
    let loader = ImageLoader::new();
    let asset = loader.decode(&png(30, 10), Path::new("banner.png")).unwrap();

    let plane = asset.node.find_component::<PlaneMesh>().unwrap();
    assert_eq!((plane.width, plane.height), (3.0, 1.0));

    let bounds = asset.bounds.unwrap();
    assert_eq!(bounds.min, Vec3::new(-1.5, 0.0, -0.5));
    assert_eq!(bounds.max, Vec3::new(1.5, 0.0, 0.5));

    // Standing upright once the node rotation is applied
    let world = bounds.transform(&asset.node.transform.to_matrix());
    assert!((world.size().y - 1.0).abs() < 1e-5);
    assert!(world.size().z.abs() < 1e-5);

    let material = loader.material();
    assert!(!material.read().lighting_enabled);
    assert!(material.read().base_color_texture.is_none());

    asset.texture_binding.unwrap().apply();
    assert_eq!(material.read().base_color_texture.as_ref().map(|t| t.width), Some(30));
}

#[test]
fn test_point_cloud_xyz_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.XYZ");
    fs::write(&path, "0 0 0 255 0 0\n1 2 3 0 255 0\n-1 0 5 0 0 255\n").unwrap();

    let registry = LoaderRegistry::with_default_loaders();
    let asset = registry.find_loader(&path).unwrap().load_asset(&path).unwrap();

    let points = asset.node.find_component::<PointBatch>().unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points.colors[2], [0, 0, 255, 255]);

    let bounds = asset.bounds.unwrap();
    assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, 0.0));
    assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 5.0));
}

fn las_file(points: &[([f64; 3], [u16; 3])]) -> Vec<u8> {
    let mut builder = las::Builder::from((1, 2));
    builder.point_format = las::point::Format::new(2).unwrap();
    let header = builder.into_header().unwrap();

    let mut writer = las::Writer::new(Cursor::new(Vec::new()), header).unwrap();
    for &([x, y, z], [r, g, b]) in points {
        writer
            .write_point(las::Point {
                x,
                y,
                z,
                color: Some(las::Color::new(r, g, b)),
                ..Default::default()
            })
            .unwrap();
    }
    writer.into_inner().unwrap().into_inner()
}

fn assert_near(actual: Vec3, expected: Vec3) {
    assert!((actual - expected).abs().max_element() < 1e-3, "{} != {}", actual, expected);
}

#[test]
fn test_las_recentred_on_first_point() {
    let data = las_file(&[
        ([1000.5, 2000.25, 10.0], [0xFF00, 0x8000, 0x0100]),
        ([1002.5, 2001.25, 13.0], [0, 0xFFFF, 0]),
        ([999.5, 2000.25, 10.5], [0x0A00, 0x1400, 0x1E00]),
    ]);
    let asset = PointCloudLoader.decode(&data, Path::new("survey.LAS")).unwrap();

    assert_near(asset.node.transform.translation, Vec3::new(1000.5, 2000.25, 10.0));

    let points = asset.node.find_component::<PointBatch>().unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points.positions[0], Vec3::ZERO);
    assert_near(points.positions[1], Vec3::new(2.0, 1.0, 3.0));
    assert_near(points.positions[2], Vec3::new(-1.0, 0.0, 0.5));
    assert_eq!(points.colors, vec![[255, 128, 1, 255], [0, 255, 0, 255], [10, 20, 30, 255]]);

    let bounds = asset.bounds.unwrap();
    assert_near(bounds.min, Vec3::new(-1.0, 0.0, 0.0));
    assert_near(bounds.max, Vec3::new(2.0, 1.0, 3.0));
}

#[test]
fn test_las_garbage_is_decode_error() {
    let err = PointCloudLoader.decode(b"LASF but not really", Path::new("bad.las")).unwrap_err();
    assert!(matches!(err, LoadError::Decode { .. }));
}

#[test]
fn test_help_groups_for_default_registry() {
    let groups = LoaderRegistry::with_default_loaders().help_groups();
    let headings: Vec<&str> = groups.iter().map(|(h, _)| h.as_str()).collect();
    assert_eq!(headings, vec!["3D Models", "CAD files", "Images"]);

    let models = &groups[0].1;
    assert_eq!(models, &vec![".glb", ".gltf", ".obj", ".stl"]);
}

#[test]
fn test_missing_file_is_io_error() {
    let registry = LoaderRegistry::with_default_loaders();
    let path = Path::new("/no/such/dir/model.stl");
    let err = registry.find_loader(path).unwrap().load_asset(path).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}
