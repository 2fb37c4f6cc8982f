//! Active asset manager
//!
//! Owns the one asset on screen. Finished loads are applied in `update`,
//! on the thread that owns the scene graph: the old node is removed and the
//! new one inserted in the same step, so no frame sees both or neither.
//!
//! A successful load is discarded when a newer ingestion is still pending,
//! when a newer success arrives in the same batch, or when the asset on
//! screen came from a newer ingestion. A newer load that fails does not block
//! an older one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Mat4, Vec3};
use lab_asset::{LoadedAsset, LoaderRegistry};
use lab_scene::{
    AnimationPlayer, BoundingBox, CameraRig, Color, DebugDraw, DirectionalLight, DropOverlay,
    NodeId, SceneGraph,
};

use crate::config::ViewerConfig;
use crate::drop_gate::DropGate;
use crate::framing::CameraFraming;
use crate::ingest::{AssetIngestor, IngestError, IngestOutcome, IngestReport, LoadTicket};

/// Outcome notifications for the host
#[derive(Clone, Debug, PartialEq)]
pub enum AssetEvent {
    /// No loader for the file; nothing changed
    Unsupported { path: PathBuf },
    /// Asset is now on screen
    Loaded { path: PathBuf, ticket: LoadTicket },
    /// Load failed; the previous asset stays
    Failed {
        path: PathBuf,
        ticket: LoadTicket,
        error: String,
    },
    /// Load succeeded but a newer drop superseded it
    Discarded { path: PathBuf, ticket: LoadTicket },
}

/// The asset currently in the scene
#[derive(Clone, Debug, PartialEq)]
pub struct ShowingAsset {
    pub id: NodeId,
    pub path: PathBuf,
    pub ticket: LoadTicket,
    /// Local bounds carried through the node's world transform
    pub world_bounds: Option<BoundingBox>,
}

/// Active asset state machine
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ActiveAsset {
    #[default]
    Empty,
    Showing(ShowingAsset),
}

impl ActiveAsset {
    pub fn showing(&self) -> Option<&ShowingAsset> {
        match self {
            Self::Empty => None,
            Self::Showing(asset) => Some(asset),
        }
    }
}

/// The host collaborators touched while applying loads
pub struct Viewport<'a> {
    pub scene: &'a mut dyn SceneGraph,
    pub camera: &'a mut dyn CameraRig,
    pub light: Option<&'a mut DirectionalLight>,
    pub overlay: Option<&'a mut dyn DropOverlay>,
}

impl<'a> Viewport<'a> {
    pub fn new(scene: &'a mut dyn SceneGraph, camera: &'a mut dyn CameraRig) -> Self {
        Self {
            scene,
            camera,
            light: None,
            overlay: None,
        }
    }

    pub fn with_light(mut self, light: &'a mut DirectionalLight) -> Self {
        self.light = Some(light);
        self
    }

    pub fn with_overlay(mut self, overlay: &'a mut dyn DropOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }
}

/// Swaps loaded assets into the scene and frames the camera on them
#[derive(Debug)]
pub struct RuntimeAssetManager {
    ingestor: Arc<AssetIngestor>,
    framing: CameraFraming,
    active: ActiveAsset,
    events: Vec<AssetEvent>,
    debug_enabled: bool,
}

impl RuntimeAssetManager {
    /// Build the ingestion pipeline for `registry` using `config`
    pub fn new(registry: LoaderRegistry, config: &ViewerConfig) -> Result<Self, IngestError> {
        let ingestor = AssetIngestor::new(registry, &config.loading)?;
        Ok(Self::with_ingestor(
            Arc::new(ingestor),
            CameraFraming::from(&config.camera),
            config.debug.show_bounds,
        ))
    }

    pub fn with_ingestor(
        ingestor: Arc<AssetIngestor>,
        framing: CameraFraming,
        debug_enabled: bool,
    ) -> Self {
        Self {
            ingestor,
            framing,
            active: ActiveAsset::Empty,
            events: Vec::new(),
            debug_enabled,
        }
    }

    /// Show the help overlay and put the camera in its initial pose
    pub fn start(&mut self, viewport: &mut Viewport<'_>) {
        if let Some(overlay) = viewport.overlay.as_deref_mut() {
            overlay.set_supported_files(&self.ingestor.registry().help_groups());
            overlay.set_visible(self.active.showing().is_none());
        }
        self.center_camera(viewport);
    }

    /// Handle for the windowing layer
    pub fn drop_gate(&self) -> DropGate {
        DropGate::new(Arc::clone(&self.ingestor))
    }

    pub fn ingestor(&self) -> &Arc<AssetIngestor> {
        &self.ingestor
    }

    /// Start loading `path`; see [`AssetIngestor::ingest`]
    pub fn ingest(&self, path: impl AsRef<Path>) -> IngestOutcome {
        self.ingestor.ingest(path)
    }

    /// True while a load is decoding or waiting to be applied
    pub fn is_loading(&self) -> bool {
        self.ingestor.pending() > 0
    }

    pub fn active(&self) -> &ActiveAsset {
        &self.active
    }

    pub fn active_node(&self) -> Option<NodeId> {
        self.active.showing().map(|a| a.id)
    }

    pub fn world_bounds(&self) -> Option<BoundingBox> {
        self.active.showing().and_then(|a| a.world_bounds)
    }

    /// Apply finished loads. Call once per frame. Returns the number of
    /// reports handled.
    pub fn update(&mut self, viewport: &mut Viewport<'_>) -> usize {
        let reports = self.ingestor.drain_reports();
        let count = reports.len();

        let newest_success = reports
            .iter()
            .filter_map(|report| match report {
                IngestReport::Completed(done) if done.result.is_ok() => Some(done.ticket),
                _ => None,
            })
            .max();
        let newest = newest_success.max(self.ingestor.newest_pending());

        for report in reports {
            match report {
                IngestReport::Unsupported(path) => {
                    self.events.push(AssetEvent::Unsupported { path });
                }
                IngestReport::Completed(done) => match done.result {
                    Ok(asset) if self.is_current(done.ticket, newest) => {
                        self.install(viewport, asset, done.path, done.ticket);
                    }
                    Ok(_stale) => {
                        log::debug!(
                            "RuntimeAssetManager: discarding {} {}, superseded by a newer load",
                            done.ticket,
                            done.path.display()
                        );
                        self.events.push(AssetEvent::Discarded {
                            path: done.path,
                            ticket: done.ticket,
                        });
                    }
                    Err(e) => {
                        log::warn!(
                            "RuntimeAssetManager: failed to load {}: {}",
                            done.path.display(),
                            e
                        );
                        self.events.push(AssetEvent::Failed {
                            path: done.path,
                            ticket: done.ticket,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        count
    }

    /// `ticket` may replace the active asset when nothing newer is in flight
    /// or already on screen
    fn is_current(&self, ticket: LoadTicket, newest: Option<LoadTicket>) -> bool {
        let newest_in_flight = newest.map_or(true, |n| ticket >= n);
        newest_in_flight && self.active.showing().map_or(true, |a| ticket > a.ticket)
    }

    /// Replace the active asset with `asset`
    fn install(
        &mut self,
        viewport: &mut Viewport<'_>,
        asset: LoadedAsset,
        path: PathBuf,
        ticket: LoadTicket,
    ) {
        let LoadedAsset { mut node, bounds, texture_binding } = asset;

        if let Some(player) = node.find_component_in_children_mut::<AnimationPlayer>() {
            if player.has_clips() {
                player.play_automatically = true;
                player.looping = true;
            }
        }

        if let ActiveAsset::Showing(old) = std::mem::take(&mut self.active) {
            if viewport.scene.remove(old.id).is_none() {
                log::warn!("RuntimeAssetManager: {:?} was already gone from the scene", old.id);
            }
        }
        let id = viewport.scene.insert(node);
        if let Some(binding) = texture_binding {
            binding.apply();
        }

        let world = viewport.scene.world_transform(id).unwrap_or(Mat4::IDENTITY);
        let world_bounds = bounds.map(|b| b.transform(&world));

        log::info!("Loaded {} as {:?}", path.display(), id);
        self.events.push(AssetEvent::Loaded {
            path: path.clone(),
            ticket,
        });
        self.active = ActiveAsset::Showing(ShowingAsset {
            id,
            path,
            ticket,
            world_bounds,
        });

        self.center_camera(viewport);

        if let Some(overlay) = viewport.overlay.as_deref_mut() {
            overlay.set_visible(false);
        }
    }

    /// Frame the active asset, or restore the initial pose when there is
    /// nothing with bounds to frame
    pub fn center_camera(&self, viewport: &mut Viewport<'_>) {
        match self.world_bounds() {
            Some(bounds) => {
                let light = viewport.light.as_deref_mut();
                let zoom = self.framing.frame(&bounds, &mut *viewport.camera, light);
                log::debug!(
                    "RuntimeAssetManager: framed {:?} at zoom {:.3}",
                    bounds.center(),
                    zoom
                );
            }
            None => viewport.camera.reset_to_init(),
        }
    }

    /// Flip the bounds diagnostic; returns the new state
    pub fn toggle_debug(&mut self) -> bool {
        self.debug_enabled = !self.debug_enabled;
        self.debug_enabled
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    /// Draw the active bounds, their centre and the world origin
    pub fn draw_debug(&self, draw: &mut dyn DebugDraw) {
        if !self.debug_enabled {
            return;
        }
        if let Some(bounds) = self.world_bounds() {
            draw.draw_bounding_box(&bounds, Color::RED);
            draw.draw_point(bounds.center(), 0.5, Color::BLUE);
            draw.draw_point(Vec3::ZERO, 1.0, Color::BLACK);
        }
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<AssetEvent> {
        std::mem::take(&mut self.events)
    }
}
