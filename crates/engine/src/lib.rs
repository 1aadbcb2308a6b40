use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod autopilot;
pub mod config;

pub use app::{
    run_app, run_app_with_metrics, AppError, DeviceIndex, DeviceInfo, EventSource, EventSystem,
    FramePacer, KeyCode, LoopCommand, LoopConfig, LoopMetricsSnapshot, MetricsHandle, PlatformEvent,
    QueuedEventSource, Simulation, ToggleState,
};
pub use autopilot::{
    AutopilotError, AutopilotState, CarAutopilot, CarInput, ControlInputs, Mat3, PatchId,
    RoadPatches, ScriptLimits, ScriptSource, Vec3, VehicleState, Wheel,
};
pub use config::{ConfigError, EngineConfig, CONFIG_ENV_VAR};

pub const ROOT_ENV_VAR: &str = "AUTODRIVE_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "AUTODRIVE_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/autodrive\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let config_path = match read_env(CONFIG_ENV_VAR)? {
        Some(value) => PathBuf::from(value),
        None => root.join(config::DEFAULT_CONFIG_RELATIVE_PATH),
    };

    Ok(AppPaths {
        assets_dir: root.join("assets"),
        config_path,
        root,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    if let Some(value) = read_env(ROOT_ENV_VAR)? {
        let normalized = normalize_path(&PathBuf::from(value));
        return if is_repo_marker(&normalized) {
            Ok(normalized)
        } else {
            Err(StartupError::InvalidEnvRoot { path: normalized })
        };
    }

    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let exe_dir = exe
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

    exe_dir
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: normalize_path(&exe_dir),
            env_var: ROOT_ENV_VAR,
        })
}

fn read_env(var: &'static str) -> Result<Option<String>, StartupError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(StartupError::EnvVar { var, source }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
