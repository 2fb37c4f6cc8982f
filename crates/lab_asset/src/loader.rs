//! Runtime loader contract
//!
//! A loader knows a fixed set of lower-case extensions (with the leading dot)
//! and turns one file into a scene node plus an optional local bounding box.
//! Decoding is blocking; the ingestion pipeline runs it off the frame loop.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use lab_scene::{BoundingBox, SceneNode, SharedMaterial, Texture};
use thiserror::Error;

/// Error during asset loading
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File was read but its contents could not be decoded
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    /// No loader handles the extension
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Decoding succeeded but produced nothing displayable
    #[error("Asset contains no displayable content: {0}")]
    Empty(String),
    /// The loader panicked
    #[error("Loader panicked: {0}")]
    Panicked(String),
}

impl LoadError {
    pub fn decode(path: &Path, message: impl fmt::Display) -> Self {
        Self::Decode {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub fn empty(path: &Path) -> Self {
        Self::Empty(path.display().to_string())
    }
}

/// Texture to put into a material shared with the asset on screen.
///
/// Decoding runs off the scene thread and may be thrown away, so the shared
/// material is only written when the asset is installed.
#[derive(Clone, Debug)]
pub struct TextureBinding {
    pub material: SharedMaterial,
    pub texture: Arc<Texture>,
}

impl TextureBinding {
    pub fn apply(&self) {
        self.material.write().base_color_texture = Some(Arc::clone(&self.texture));
    }
}

/// A successfully decoded asset
#[derive(Debug)]
pub struct LoadedAsset {
    /// Root of the constructed node hierarchy
    pub node: SceneNode,
    /// Bounds in the root node's local space, if the format reports them
    pub bounds: Option<BoundingBox>,
    /// Deferred write into a shared material
    pub texture_binding: Option<TextureBinding>,
}

impl LoadedAsset {
    pub fn new(node: SceneNode, bounds: Option<BoundingBox>) -> Self {
        Self {
            node,
            bounds,
            texture_binding: None,
        }
    }

    pub fn with_texture_binding(mut self, binding: TextureBinding) -> Self {
        self.texture_binding = Some(binding);
        self
    }
}

/// Result type for asset loading
pub type LoadResult = Result<LoadedAsset, LoadError>;

/// Family of formats a loader handles, used to group the help text
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoaderCategory {
    Model,
    Cad,
    Image,
    Unknown,
}

impl LoaderCategory {
    /// Heading shown to the user
    pub fn description(self) -> &'static str {
        match self {
            Self::Model => "3D Models",
            Self::Cad => "CAD files",
            Self::Image => "Images",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LoaderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Normalised extension of `path`: lower-case with a leading dot
pub fn extension_key(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Trait for runtime asset loaders
pub trait RuntimeLoader: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn category(&self) -> LoaderCategory;

    /// Lower-case extensions including the leading dot
    fn supported_extensions(&self) -> &[&'static str];

    /// Extension check only, no I/O
    fn can_process(&self, path: &Path) -> bool {
        extension_key(path)
            .map(|ext| self.supported_extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Decode an in-memory file. `path` is used for messages and for
    /// formats that need the extension to pick a sub-format.
    fn decode(&self, data: &[u8], path: &Path) -> LoadResult;

    /// Read and decode a file. Blocks on I/O.
    fn load_asset(&self, path: &Path) -> LoadResult {
        let data = std::fs::read(path)?;
        self.decode(&data, path)
    }
}

/// File name without directories, for node names
pub(crate) fn node_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "asset".to_string())
}
