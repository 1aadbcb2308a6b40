use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::app::{desired_frame_delta, DEFAULT_FPS_WINDOW};
use crate::autopilot::DEFAULT_MAX_OPERATIONS;

pub const CONFIG_ENV_VAR: &str = "AUTODRIVE_CONFIG";
pub const DEFAULT_CONFIG_RELATIVE_PATH: &str = "config/autodrive.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub desired_fps: f64,
    pub fps_window: usize,
    pub target_tps: u32,
    pub max_ticks_per_frame: u32,
    pub max_frame_delta_ms: u64,
    pub metrics_log_interval_ms: u64,
    /// Relative paths resolve against the project root.
    pub autopilot_script: PathBuf,
    pub engage_autopilot_on_start: bool,
    pub max_script_operations: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_title: "autodrive".to_string(),
            window_width: 1280,
            window_height: 720,
            desired_fps: 60.0,
            fps_window: DEFAULT_FPS_WINDOW,
            target_tps: 60,
            max_ticks_per_frame: 5,
            max_frame_delta_ms: 250,
            metrics_log_interval_ms: 1000,
            autopilot_script: PathBuf::from("assets/autopilot/follow_road.rhai"),
            engage_autopilot_on_start: false,
            max_script_operations: DEFAULT_MAX_OPERATIONS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path} at {at}: {message}")]
    Parse {
        path: PathBuf,
        at: String,
        message: String,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl EngineConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config_missing_using_defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = Self::parse(&raw).map_err(|(at, message)| ConfigError::Parse {
            path: path.to_path_buf(),
            at,
            message,
        })?;
        config.validate()?;
        info!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    fn parse(raw: &str) -> Result<Self, (String, String)> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, EngineConfig>(&mut deserializer).map_err(|error| {
            let at = error.path().to_string();
            (at, error.into_inner().to_string())
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if desired_frame_delta(self.desired_fps).is_err() {
            return Err(invalid(
                "desired_fps",
                format!("must be positive with a representable frame period, got {}", self.desired_fps),
            ));
        }
        if self.fps_window == 0 {
            return Err(invalid("fps_window", "must be at least 1"));
        }
        if self.target_tps == 0 {
            return Err(invalid("target_tps", "must be at least 1"));
        }
        if self.max_ticks_per_frame == 0 {
            return Err(invalid("max_ticks_per_frame", "must be at least 1"));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(invalid(
                "window_width",
                format!("window must be non-empty, got {}x{}", self.window_width, self.window_height),
            ));
        }
        if self.max_script_operations == 0 {
            return Err(invalid("max_script_operations", "must be at least 1"));
        }
        Ok(())
    }

    /// Script path with relative paths anchored at `root`.
    pub fn autopilot_script_path(&self, root: &Path) -> PathBuf {
        if self.autopilot_script.is_absolute() {
            self.autopilot_script.clone()
        } else {
            root.join(&self.autopilot_script)
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
