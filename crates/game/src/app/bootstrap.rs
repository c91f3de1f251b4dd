use std::env;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use engine::{
    build_or_load_level_database, resolve_app_paths, AppError, AppPaths, LoopConfig,
    StartupError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{
    GameSession, GameplayScene, LevelTuningError, ReplayInput, ReplayScript, ScriptError,
    DEMO_SCRIPT_LABEL,
};

pub const SEED_ENV_VAR: &str = "ECO_RANGER_SEED";
pub const SCRIPT_ENV_VAR: &str = "ECO_RANGER_SCRIPT";
pub const REALTIME_ENV_VAR: &str = "ECO_RANGER_REALTIME";
const BUILTIN_LEVELS_XML: &str = include_str!("../../../../assets/levels/levels.xml");

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("{var} '{value}' is not a valid u64 seed")]
    InvalidSeed { var: &'static str, value: String },
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("level definitions are unusable: {0}")]
    Tuning(#[from] LevelTuningError),
}

pub struct AppWiring {
    pub config: LoopConfig,
    pub scene: GameplayScene,
    pub input: ReplayInput,
}

pub fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Eco Ranger Startup ===");

    let paths = resolve_optional_app_paths()?;
    let (database, _source) = build_or_load_level_database(paths.as_ref(), BUILTIN_LEVELS_XML)
        .map_err(AppError::from)?;

    let script = match env::var(SCRIPT_ENV_VAR) {
        Ok(path) => ReplayScript::load(Path::new(&path))?,
        Err(_) => ReplayScript::demo()?,
    };
    let seed = match seed_from_env()? {
        Some(seed) => seed,
        None => script.seed.unwrap_or_else(clock_seed),
    };
    info!(
        seed,
        script = %env::var(SCRIPT_ENV_VAR).unwrap_or_else(|_| DEMO_SCRIPT_LABEL.to_string()),
        script_ticks = script.total_ticks(),
        "session_configured"
    );

    let session = GameSession::new(&database, seed)?;
    let config = LoopConfig {
        pace_realtime: realtime_from_env(),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        scene: GameplayScene::new(session),
        input: ReplayInput::new(&script),
    })
}

/// A missing project root is not fatal: the embedded level file still works.
fn resolve_optional_app_paths() -> Result<Option<AppPaths>, AppError> {
    match resolve_app_paths() {
        Ok(paths) => Ok(Some(paths)),
        Err(StartupError::RootNotFound { start_dir, .. }) => {
            warn!(start_dir = %start_dir.display(), "project_root_not_found_using_builtin_levels");
            Ok(None)
        }
        Err(error) => Err(error.into()),
    }
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

fn seed_from_env() -> Result<Option<u64>, BootstrapError> {
    match env::var(SEED_ENV_VAR) {
        Ok(raw) => parse_seed(&raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_seed(raw: &str) -> Result<u64, BootstrapError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| BootstrapError::InvalidSeed {
            var: SEED_ENV_VAR,
            value: raw.to_string(),
        })
}

fn realtime_from_env() -> bool {
    env::var(REALTIME_ENV_VAR)
        .map(|raw| matches!(raw.trim(), "1" | "true"))
        .unwrap_or(false)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use engine::compile_level_database;

    use super::*;

    #[test]
    fn builtin_levels_compile_into_three_tunings() {
        let database =
            compile_level_database(engine::BUILTIN_SOURCE_LABEL, BUILTIN_LEVELS_XML)
                .expect("builtin levels");
        let labels = database
            .levels()
            .iter()
            .map(|level| level.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Forest", "City", "Desert"]);
        GameSession::new(&database, 1).expect("builtin tokens resolve");
    }

    #[test]
    fn seed_parsing_trims_and_rejects_garbage() {
        assert_eq!(parse_seed(" 42 ").expect("seed"), 42);
        assert!(matches!(
            parse_seed("forty-two"),
            Err(BootstrapError::InvalidSeed { .. })
        ));
    }
}
