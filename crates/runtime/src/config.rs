//! Runtime configuration structures and loaders.

use std::env;
use std::path::{Path, PathBuf};

use combat_content::{ConfigLoader, StatsTableLoader};
use combat_core::CombatConfig;
use directories::ProjectDirs;

use crate::api::{Result, RuntimeError};

/// Configuration required to bootstrap a [`CombatRuntime`](crate::CombatRuntime).
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub combat: CombatConfig,
    /// Session store root; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    pub event_buffer_size: usize,
    pub logging: LoggingConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            combat: CombatConfig::default(),
            data_dir: None,
            event_buffer_size: 100,
            logging: LoggingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `COMBAT_DATA_DIR` - Session store root (default: platform-specific)
    /// - `COMBAT_EVENT_BUFFER` - Event channel capacity per topic (default: 100)
    /// - `COMBAT_CONFIG_PATH` - TOML combat rules file (default: built-in rules)
    /// - `COMBAT_STATS_TABLE_PATH` - RON stats table, overrides the config's table
    /// - `COMBAT_LOG_DIR` - Directory for the log file (default: no file logging)
    /// - `COMBAT_LOG_FILTER` - Tracing filter directives (default: `info`)
    /// - `COMBAT_LOG_STDERR` - Also log to stderr (default: true)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.data_dir = env::var("COMBAT_DATA_DIR").ok().map(PathBuf::from);

        if let Some(capacity) = read_env::<usize>("COMBAT_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }

        if let Ok(path) = env::var("COMBAT_CONFIG_PATH") {
            config.combat = load_combat_config(Path::new(&path))?;
        }

        if let Ok(path) = env::var("COMBAT_STATS_TABLE_PATH") {
            let table = StatsTableLoader::load(Path::new(&path))
                .map_err(|e| RuntimeError::Config(format!("{e:#}")))?;
            config.combat = config.combat.with_stats_table(table);
        }

        config.logging.log_dir = env::var("COMBAT_LOG_DIR").ok().map(PathBuf::from);
        if let Ok(filter) = env::var("COMBAT_LOG_FILTER") {
            config.logging.filter = filter;
        }
        if let Some(stderr) = read_env::<bool>("COMBAT_LOG_STDERR") {
            config.logging.stderr = stderr;
        }

        Ok(config)
    }

    /// Session store root, falling back to the platform data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// Logging setup consumed by [`init_logging`](crate::logging::init_logging).
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub file_name: String,
    pub filter: String,
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            file_name: "combat.log".to_string(),
            filter: "info".to_string(),
            stderr: true,
        }
    }
}

/// Platform data directory for session records.
///
/// - Linux: `~/.local/share/combat-engine/sessions`
/// - macOS: `~/Library/Application Support/combat-engine/sessions`
/// - Windows: `%APPDATA%\combat-engine\sessions`
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "combat-engine")
        .map(|dirs| dirs.data_dir().join("sessions"))
        .unwrap_or_else(|| PathBuf::from("./data/sessions"))
}

fn load_combat_config(path: &Path) -> Result<CombatConfig> {
    ConfigLoader::load(path).map_err(|e| RuntimeError::Config(format!("{e:#}")))
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
