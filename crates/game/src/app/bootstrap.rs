use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{ConfigError, EngineConfig, LoopConfig};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::leaderboard::{JsonFileLeaderboard, Leaderboard, LeaderboardError};
use super::now_ms;
use super::scores::PlayerIdentity;

const CONFIG_ENV_VAR: &str = "DODGE_CONFIG";
const SEED_ENV_VAR: &str = "DODGE_SEED";
const PLAYER_ID_ENV_VAR: &str = "DODGE_PLAYER_ID";
const PLAYER_NAME_ENV_VAR: &str = "DODGE_PLAYER_NAME";
const LEADERBOARD_ENV_VAR: &str = "DODGE_LEADERBOARD";

const DEFAULT_PLAYER_ID: &str = "local";
const DEFAULT_PLAYER_NAME: &str = "Player";
const DEFAULT_LEADERBOARD_PATH: &str = "dodge_leaderboard.json";
const ARCHIVE_AFTER_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file '{path}' at {field}: {source}")]
    ParseConfig {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid engine config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("{var} must be an unsigned integer, got '{value}'")]
    InvalidSeed { var: &'static str, value: String },
    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) leaderboard: JsonFileLeaderboard,
    pub(crate) player: PlayerIdentity,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Dodge Startup ===");

    let config_path = read_env(CONFIG_ENV_VAR)?.map(PathBuf::from);
    let mut engine = match &config_path {
        Some(path) => load_engine_config(path)?,
        None => EngineConfig::default(),
    };
    apply_seed_override(&mut engine, read_env(SEED_ENV_VAR)?)?;
    engine.validate()?;
    let config_source = config_path
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    info!(
        config_source = config_source.as_str(),
        seed = ?engine.rng_seed,
        "config_loaded"
    );

    let player = PlayerIdentity {
        player_id: read_env(PLAYER_ID_ENV_VAR)?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PLAYER_ID.to_string()),
        display_name: read_env(PLAYER_NAME_ENV_VAR)?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string()),
        avatar_url: None,
    };

    let leaderboard_path = read_env(LEADERBOARD_ENV_VAR)?
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LEADERBOARD_PATH));
    let mut leaderboard = JsonFileLeaderboard::open(&leaderboard_path)?;
    leaderboard.archive_older_than(now_ms().saturating_sub(ARCHIVE_AFTER_MS))?;
    match leaderboard.player_standing(&player.player_id) {
        Some(standing) => info!(
            player = player.display_name.as_str(),
            best = standing.best.score,
            rank = standing.rank,
            archived = leaderboard.archived().len(),
            path = %leaderboard.path().display(),
            "leaderboard_loaded"
        ),
        None => info!(
            player = player.display_name.as_str(),
            archived = leaderboard.archived().len(),
            path = %leaderboard.path().display(),
            "leaderboard_loaded"
        ),
    }

    Ok(AppWiring {
        config: LoopConfig {
            engine,
            ..LoopConfig::default()
        },
        leaderboard,
        player,
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

fn read_env(var: &'static str) -> Result<Option<String>, BootstrapError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(BootstrapError::EnvVar { var, source }),
    }
}

fn load_engine_config(path: &Path) -> Result<EngineConfig, BootstrapError> {
    let raw = fs::read_to_string(path).map_err(|source| BootstrapError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    parse_engine_config(path, &raw)
}

/// Parses a partial config; absent fields keep their defaults.
fn parse_engine_config(path: &Path, raw: &str) -> Result<EngineConfig, BootstrapError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        BootstrapError::ParseConfig {
            path: path.to_path_buf(),
            field,
            source: error.into_inner(),
        }
    })
}

fn apply_seed_override(
    config: &mut EngineConfig,
    raw_seed: Option<String>,
) -> Result<(), BootstrapError> {
    let Some(raw_seed) = raw_seed else {
        return Ok(());
    };
    let seed = raw_seed
        .trim()
        .parse::<u64>()
        .map_err(|_| BootstrapError::InvalidSeed {
            var: SEED_ENV_VAR,
            value: raw_seed.clone(),
        })?;
    config.rng_seed = Some(seed);
    Ok(())
}
