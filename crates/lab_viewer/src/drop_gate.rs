//! Entry points for the windowing layer's file drag and drop

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ingest::{AssetIngestor, IngestOutcome};

/// Handed to the window at construction so it can query and forward drops
#[derive(Clone, Debug)]
pub struct DropGate {
    ingestor: Arc<AssetIngestor>,
}

impl DropGate {
    pub fn new(ingestor: Arc<AssetIngestor>) -> Self {
        Self { ingestor }
    }

    /// Drag-over feedback. Looks at the extension only.
    pub fn is_loadable(&self, path: &Path) -> bool {
        self.ingestor.is_loadable(path)
    }

    /// A drag carrying several files is judged by the first one
    pub fn accepts_drag(&self, paths: &[PathBuf]) -> bool {
        paths.first().map_or(false, |p| self.is_loadable(p))
    }

    /// A file was dropped. Returns without waiting for the load.
    pub fn on_file_dropped(&self, path: impl AsRef<Path>) -> IngestOutcome {
        let path = path.as_ref();
        log::debug!("DropGate: dropped {}", path.display());
        self.ingestor.ingest(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadingConfig;
    use lab_asset::LoaderRegistry;

    fn gate() -> DropGate {
        let ingestor =
            AssetIngestor::new(LoaderRegistry::with_default_loaders(), &LoadingConfig::default())
                .unwrap();
        DropGate::new(Arc::new(ingestor))
    }

    #[test]
    fn test_is_loadable_matches_registry() {
        let gate = gate();
        let registry = LoaderRegistry::with_default_loaders();
        for path in ["cube.obj", "Model.OBJ", "notes.txt", "scan.las", "README", "photo.Jpeg"] {
            let path = Path::new(path);
            assert_eq!(
                gate.is_loadable(path),
                registry.find_loader(path).is_some(),
                "{}",
                path.display()
            );
        }
        assert_eq!(
            gate.is_loadable(Path::new("Model.OBJ")),
            gate.is_loadable(Path::new("model.obj"))
        );
    }

    #[test]
    fn test_accepts_drag_checks_first_file() {
        let gate = gate();
        assert!(gate.accepts_drag(&[PathBuf::from("a.stl"), PathBuf::from("b.txt")]));
        assert!(!gate.accepts_drag(&[PathBuf::from("b.txt"), PathBuf::from("a.stl")]));
        assert!(!gate.accepts_drag(&[]));
    }

    #[test]
    fn test_unsupported_drop_starts_nothing() {
        let gate = gate();
        assert_eq!(gate.on_file_dropped("notes.txt"), IngestOutcome::Unsupported);
        assert_eq!(gate.ingestor.pending(), 0);
    }
}
