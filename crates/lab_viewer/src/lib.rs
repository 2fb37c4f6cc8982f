//! # lab_viewer - Drop-to-View Asset Ingestion
//!
//! The runtime side of the viewer:
//! - [`AssetIngestor`] resolves dropped files to loaders and decodes them in the background
//! - [`RuntimeAssetManager`] swaps the finished asset into the scene and frames the camera
//! - [`DropGate`] is what the windowing layer calls on drag-over and drop
//!
//! ## Example
//!
//! ```ignore
//! use lab_viewer::prelude::*;
//!
//! let config = ViewerConfig::load(None)?;
//! let mut manager = RuntimeAssetManager::new(LoaderRegistry::with_default_loaders(), &config)?;
//! let gate = manager.drop_gate();
//!
//! manager.start(&mut Viewport::new(&mut scene, &mut camera).with_overlay(&mut help));
//! gate.on_file_dropped("robot.glb");
//!
//! // every frame
//! manager.update(&mut Viewport::new(&mut scene, &mut camera).with_light(&mut sun));
//! ```

pub mod config;
pub mod drop_gate;
pub mod framing;
pub mod ingest;
pub mod manager;

pub use config::{CameraConfig, ConfigError, DebugConfig, LoadingConfig, ViewerConfig};
pub use drop_gate::DropGate;
pub use framing::{compute_zoom, CameraFraming};
pub use ingest::{AssetIngestor, Completion, IngestError, IngestOutcome, IngestReport, LoadTicket};
pub use manager::{ActiveAsset, AssetEvent, RuntimeAssetManager, ShowingAsset, Viewport};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::config::ViewerConfig;
    pub use crate::drop_gate::DropGate;
    pub use crate::ingest::IngestOutcome;
    pub use crate::manager::{ActiveAsset, AssetEvent, RuntimeAssetManager, Viewport};
    pub use lab_asset::LoaderRegistry;
}
