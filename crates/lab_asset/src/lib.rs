//! # lab_asset - Runtime Asset Loaders
//!
//! Turning files dropped on the viewer into scene nodes:
//! - A [`RuntimeLoader`] contract keyed on file extensions
//! - An ordered [`LoaderRegistry`] where the first matching loader wins
//! - Built-in loaders for glTF/GLB, STL, OBJ, images, point clouds and DXF
//!
//! ## Example
//!
//! ```ignore
//! use lab_asset::prelude::*;
//!
//! let registry = LoaderRegistry::with_default_loaders();
//! if let Some(loader) = registry.find_loader(Path::new("robot.glb")) {
//!     let asset = loader.load_asset(Path::new("robot.glb"))?;
//!     println!("{} nodes, bounds {:?}", asset.node.node_count(), asset.bounds);
//! }
//! ```

pub mod loader;
pub mod loaders;
pub mod registry;

pub use loader::{
    extension_key, LoadError, LoadResult, LoadedAsset, LoaderCategory, RuntimeLoader,
    TextureBinding,
};
pub use loaders::{DxfLoader, GltfLoader, ImageLoader, ObjLoader, PointCloudLoader, StlLoader};
pub use registry::{LoaderBuilder, LoaderRegistry};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::loader::{LoadError, LoadResult, LoadedAsset, LoaderCategory, RuntimeLoader};
    pub use crate::registry::LoaderRegistry;
}
