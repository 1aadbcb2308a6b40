use engine::autopilot::{ScriptLimits, ScriptSource};
use engine::{resolve_app_paths, AppError, AppPaths, EngineConfig, LoopConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::driving::DrivingSim;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) simulation: DrivingSim,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== autodrive startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        assets_dir = %paths.assets_dir.display(),
        config = %paths.config_path.display(),
        "startup"
    );
    let config = EngineConfig::load(&paths.config_path)?;
    wire(&paths, &config)
}

fn wire(paths: &AppPaths, config: &EngineConfig) -> Result<AppWiring, AppError> {
    let script = ScriptSource::File(config.autopilot_script_path(&paths.root));
    let limits = ScriptLimits {
        max_operations: config.max_script_operations,
        ..ScriptLimits::default()
    };

    let mut simulation = DrivingSim::new(script, limits);
    if config.engage_autopilot_on_start {
        simulation.engage_autopilot()?;
    }

    Ok(AppWiring {
        config: LoopConfig::from(config),
        simulation,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
