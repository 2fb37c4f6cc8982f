//! Image loader
//!
//! Shows a picture as a flat quad: an unlit, alpha-cut plane whose width is
//! the image aspect ratio and whose height is 1, rotated to stand upright.
//! Every image quad references one material instance owned by the loader.
//! Decoding only prepares the texture; it is bound into that material when
//! the asset is installed, so the quad on screen samples the image shown.

use std::f32::consts::FRAC_PI_2;
use std::path::Path;
use std::sync::Arc;

use glam::{Quat, Vec3};
use image::ImageFormat;
use lab_scene::{
    BoundingBox, Component, MaterialSlot, PlaneMesh, SceneNode, SharedMaterial, SurfaceMaterial,
    Texture, Transform,
};
use parking_lot::RwLock;

use crate::loader::{
    node_name, LoadError, LoadResult, LoadedAsset, LoaderCategory, RuntimeLoader, TextureBinding,
};

/// Loader for raster images
#[derive(Debug)]
pub struct ImageLoader {
    material: SharedMaterial,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self {
            material: Arc::new(RwLock::new(SurfaceMaterial::unlit_image())),
        }
    }

    /// Material every image quad from this loader references
    pub fn material(&self) -> SharedMaterial {
        Arc::clone(&self.material)
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeLoader for ImageLoader {
    fn name(&self) -> &'static str {
        "image"
    }

    fn category(&self) -> LoaderCategory {
        LoaderCategory::Image
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".jpg", ".jpeg", ".png", ".bmp", ".gif", ".webp", ".ico", ".tga"]
    }

    fn decode(&self, data: &[u8], path: &Path) -> LoadResult {
        // TGA has no magic number, so trust the extension first
        let decoded = match ImageFormat::from_path(path) {
            Ok(format) => image::load_from_memory_with_format(data, format),
            Err(_) => image::load_from_memory(data),
        }
        .map_err(|e| LoadError::decode(path, e))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(LoadError::empty(path));
        }

        let texture = Arc::new(Texture {
            width,
            height,
            data: rgba.into_raw(),
            srgb: true,
        });
        let aspect = texture.aspect_ratio();

        log::debug!("ImageLoader: decoded {}x{} texture from {}", width, height, path.display());

        let node = SceneNode::new(node_name(path))
            .with_transform(Transform::from_rotation(Quat::from_rotation_x(FRAC_PI_2)))
            .with_component(Component::Material(MaterialSlot::Surface(self.material())))
            .with_component(Component::Plane(PlaneMesh {
                width: aspect,
                height: 1.0,
            }));

        let bounds = BoundingBox::new(
            Vec3::new(aspect * -0.5, 0.0, -0.5),
            Vec3::new(aspect * 0.5, 0.0, 0.5),
        );

        Ok(LoadedAsset::new(node, Some(bounds)).with_texture_binding(TextureBinding {
            material: self.material(),
            texture,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_plane_matches_aspect() {
        let loader = ImageLoader::new();
        let asset = loader.decode(&png(4, 2), Path::new("wide.png")).unwrap();

        let plane = asset.node.find_component::<PlaneMesh>().unwrap();
        assert_eq!(plane.width, 2.0);
        assert_eq!(plane.height, 1.0);

        let bounds = asset.bounds.unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, -0.5));
        assert_eq!(bounds.max, Vec3::new(1.0, 0.0, 0.5));
    }

    #[test]
    fn test_decode_leaves_shared_material_alone() {
        let loader = ImageLoader::new();
        let first = loader.decode(&png(2, 2), Path::new("a.png")).unwrap();
        let second = loader.decode(&png(3, 1), Path::new("b.png")).unwrap();
        assert!(loader.material().read().base_color_texture.is_none());

        let Some(MaterialSlot::Surface(material)) = first.node.find_component::<MaterialSlot>()
        else {
            panic!("image node without surface material");
        };
        assert!(Arc::ptr_eq(material, &loader.material()));

        first.texture_binding.unwrap().apply();
        second.texture_binding.unwrap().apply();
        let texture = material.read().base_color_texture.clone().unwrap();
        assert_eq!((texture.width, texture.height), (3, 1));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = ImageLoader::new().decode(b"not an image", Path::new("x.png")).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }
}
