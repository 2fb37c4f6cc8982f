//! Viewer Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `LAB_VIEWER_DEBUG=1`, `LAB_VIEWER_MAX_LOADS=2`
//! 2. Config file: explicit path, else `lab_viewer.toml` or `config/lab_viewer.toml`
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! [camera]
//! reset_zoom = 2.0
//! reset_theta_deg = -25.0
//! reset_lambda_deg = 25.0
//! min_aspect_guard = 1.5
//! shadow_distance_factor = 2.0
//!
//! [loading]
//! max_concurrent_loads = 1
//! worker_threads = 2
//!
//! [debug]
//! show_bounds = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Files searched when no explicit path is given
const DEFAULT_PATHS: &[&str] = &["lab_viewer.toml", "config/lab_viewer.toml"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Camera framing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Multiplier on the bounding box half-diagonal
    pub reset_zoom: f32,
    /// Orbit yaw after framing, degrees
    pub reset_theta_deg: f32,
    /// Orbit elevation after framing, degrees
    pub reset_lambda_deg: f32,
    /// Lower bound on the inverse aspect ratio used for framing
    pub min_aspect_guard: f32,
    /// Shadow distance as a multiple of the framing zoom
    pub shadow_distance_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            reset_zoom: 2.0,
            reset_theta_deg: -25.0,
            reset_lambda_deg: 25.0,
            min_aspect_guard: 1.5,
            shadow_distance_factor: 2.0,
        }
    }
}

/// Loader scheduling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// Loads decoding at the same time
    pub max_concurrent_loads: usize,
    /// Async runtime worker threads
    pub worker_threads: usize,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: 1,
            worker_threads: 2,
        }
    }
}

/// Diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Draw the active asset's bounds at start
    pub show_bounds: bool,
}

/// Complete viewer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub loading: LoadingConfig,
    pub debug: DebugConfig,
    /// File the configuration was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl ViewerConfig {
    /// Load from all sources. A missing file means defaults; a broken one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let found = DEFAULT_PATHS.iter().map(Path::new).find(|p| p.is_file());
                match found {
                    Some(path) => Self::load_from_file(path)?,
                    None => {
                        log::debug!("No config file found, using defaults");
                        Self::default()
                    }
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        log::info!("Loaded viewer config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `LAB_VIEWER_*` overrides from a variable lookup
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(value) = var("LAB_VIEWER_DEBUG") {
            self.debug.show_bounds = value == "1" || value.eq_ignore_ascii_case("true");
            log::info!("Debug bounds from env: {}", self.debug.show_bounds);
        }

        if let Some(value) = var("LAB_VIEWER_MAX_LOADS") {
            match value.parse() {
                Ok(n) => {
                    self.loading.max_concurrent_loads = n;
                    log::info!("Max concurrent loads from env: {}", n);
                }
                Err(_) => log::warn!("Ignoring LAB_VIEWER_MAX_LOADS={:?}", value),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if camera.reset_zoom.is_nan() || camera.reset_zoom <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "camera.reset_zoom must be positive, got {}",
                camera.reset_zoom
            )));
        }
        if camera.min_aspect_guard.is_nan() || camera.min_aspect_guard <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "camera.min_aspect_guard must be positive, got {}",
                camera.min_aspect_guard
            )));
        }
        if camera.shadow_distance_factor.is_nan() || camera.shadow_distance_factor < 0.0 {
            return Err(ConfigError::Invalid(
                "camera.shadow_distance_factor must not be negative".into(),
            ));
        }
        if self.loading.max_concurrent_loads == 0 {
            return Err(ConfigError::Invalid(
                "loading.max_concurrent_loads must be at least 1".into(),
            ));
        }
        if self.loading.worker_threads == 0 {
            return Err(ConfigError::Invalid("loading.worker_threads must be at least 1".into()));
        }
        Ok(())
    }
}
