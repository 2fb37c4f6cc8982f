//! Loader registry
//!
//! Ordered list of loaders. Lookup is a linear scan in registration order and
//! the first loader that claims a path wins, so overlapping extensions
//! resolve deterministically.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use crate::loader::{LoaderCategory, RuntimeLoader};
use crate::loaders::{DxfLoader, GltfLoader, ImageLoader, ObjLoader, PointCloudLoader, StlLoader};

/// Registry of runtime loaders
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: Vec<Arc<dyn RuntimeLoader>>,
}

impl LoaderRegistry {
    /// Create a registry from loaders in priority order
    pub fn new(loaders: Vec<Arc<dyn RuntimeLoader>>) -> Self {
        let registry = Self { loaders };
        registry.warn_on_overlaps();
        registry
    }

    /// Start an empty builder
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::default()
    }

    /// Registry with every built-in loader
    pub fn with_default_loaders() -> Self {
        Self::builder()
            .add(GltfLoader::new())
            .add(StlLoader)
            .add(ObjLoader)
            .add(ImageLoader::new())
            .add(PointCloudLoader)
            .add(DxfLoader)
            .build()
    }

    /// First loader, in registration order, that can process `path`
    pub fn find_loader(&self, path: &Path) -> Option<Arc<dyn RuntimeLoader>> {
        self.loaders.iter().find(|l| l.can_process(path)).cloned()
    }

    /// True iff some loader can process `path`. Extension check only.
    pub fn is_supported(&self, path: &Path) -> bool {
        self.loaders.iter().any(|l| l.can_process(path))
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub fn loaders(&self) -> impl Iterator<Item = &Arc<dyn RuntimeLoader>> {
        self.loaders.iter()
    }

    /// Sorted, de-duplicated extensions grouped by loader category
    pub fn extensions_by_category(&self) -> BTreeMap<LoaderCategory, Vec<String>> {
        let mut grouped: BTreeMap<LoaderCategory, BTreeSet<String>> = BTreeMap::new();
        for loader in &self.loaders {
            let set = grouped.entry(loader.category()).or_default();
            for ext in loader.supported_extensions() {
                set.insert(ext.to_lowercase());
            }
        }

        grouped
            .into_iter()
            .map(|(category, set)| (category, set.into_iter().collect()))
            .collect()
    }

    /// Help overlay groups: category description and its extensions
    pub fn help_groups(&self) -> Vec<(String, Vec<String>)> {
        self.extensions_by_category()
            .into_iter()
            .map(|(category, exts)| (category.description().to_string(), exts))
            .collect()
    }

    fn warn_on_overlaps(&self) {
        let mut owners: BTreeMap<String, &'static str> = BTreeMap::new();
        for loader in &self.loaders {
            for ext in loader.supported_extensions() {
                let ext = ext.to_lowercase();
                if let Some(first) = owners.get(&ext) {
                    log::debug!(
                        "LoaderRegistry: {} also claims {}, {} takes precedence",
                        loader.name(),
                        ext,
                        first
                    );
                } else {
                    owners.insert(ext, loader.name());
                }
            }
        }
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.loaders.iter().map(|l| l.name()))
            .finish()
    }
}

/// Builder for registering loaders with a fluent API
#[derive(Default)]
pub struct LoaderBuilder {
    loaders: Vec<Arc<dyn RuntimeLoader>>,
}

impl LoaderBuilder {
    /// Append a loader; earlier loaders take precedence
    pub fn add<L: RuntimeLoader + 'static>(mut self, loader: L) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    /// Append an already shared loader
    pub fn add_shared(mut self, loader: Arc<dyn RuntimeLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn build(self) -> LoaderRegistry {
        LoaderRegistry::new(self.loaders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadError, LoadResult};

    struct Claims(&'static str, LoaderCategory, &'static [&'static str]);

    impl RuntimeLoader for Claims {
        fn name(&self) -> &'static str {
            self.0
        }

        fn category(&self) -> LoaderCategory {
            self.1
        }

        fn supported_extensions(&self) -> &[&'static str] {
            self.2
        }

        fn decode(&self, _data: &[u8], path: &Path) -> LoadResult {
            Err(LoadError::empty(path))
        }
    }

    #[test]
    fn test_first_registered_wins() {
        let registry = LoaderRegistry::builder()
            .add(Claims("first", LoaderCategory::Model, &[".usdz"]))
            .add(Claims("second", LoaderCategory::Model, &[".usdz", ".usd"]))
            .build();

        for _ in 0..3 {
            let loader = registry.find_loader(Path::new("scene.usdz")).unwrap();
            assert_eq!(loader.name(), "first");
        }
        assert_eq!(registry.find_loader(Path::new("scene.usd")).unwrap().name(), "second");
    }

    #[test]
    fn test_is_supported_matches_find_loader() {
        let registry = LoaderRegistry::with_default_loaders();
        let paths = [
            "cube.obj",
            "Model.OBJ",
            "notes.txt",
            "a.glb",
            "photo.JPG",
            "noext",
            "plan.dxf",
        ];
        for path in paths {
            let path = Path::new(path);
            assert_eq!(registry.is_supported(path), registry.find_loader(path).is_some());
        }
    }

    #[test]
    fn test_extensions_by_category() {
        let registry = LoaderRegistry::builder()
            .add(Claims("a", LoaderCategory::Model, &[".obj", ".glb"]))
            .add(Claims("b", LoaderCategory::Model, &[".GLB", ".stl"]))
            .add(Claims("c", LoaderCategory::Image, &[".png"]))
            .build();

        let map = registry.extensions_by_category();
        assert_eq!(map[&LoaderCategory::Model], vec![".glb", ".obj", ".stl"]);
        assert_eq!(map[&LoaderCategory::Image], vec![".png"]);
        assert!(!map.contains_key(&LoaderCategory::Cad));
    }

    #[test]
    fn test_default_registry_order() {
        let registry = LoaderRegistry::with_default_loaders();
        let names: Vec<_> = registry.loaders().map(|l| l.name()).collect();
        assert_eq!(names, vec!["gltf", "stl", "obj", "image", "point-cloud", "dxf"]);
        assert!(!registry.is_supported(Path::new("notes.txt")));
    }
}
