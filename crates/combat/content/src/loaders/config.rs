//! Combat configuration loader.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use combat_core::{CombatConfig, StatusEffectKind};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, StatsTableLoader, read_file};

/// Configuration structure for TOML files.
///
/// Every field is optional; anything left out keeps the built-in default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CombatConfigFile {
    pub log_tail_limit: Option<usize>,
    pub incapacitating: Option<BTreeSet<StatusEffectKind>>,
    /// RON stats table, resolved relative to the TOML file.
    pub stats_table: Option<PathBuf>,
}

/// Loader for combat configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from a TOML file, following its `stats_table` reference.
    pub fn load(path: &Path) -> LoadResult<CombatConfig> {
        let content = read_file(path)?;
        let file = Self::parse(&content)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::build(file, base_dir)
    }

    /// Parse the TOML text without resolving file references.
    pub fn parse(content: &str) -> LoadResult<CombatConfigFile> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))
    }

    fn build(file: CombatConfigFile, base_dir: &Path) -> LoadResult<CombatConfig> {
        let mut config = CombatConfig::default();

        if let Some(limit) = file.log_tail_limit {
            if limit == 0 {
                anyhow::bail!("log_tail_limit must be at least 1");
            }
            config = config.with_log_tail_limit(limit);
        }
        if let Some(kinds) = file.incapacitating {
            config = config.with_incapacitating(kinds);
        }
        if let Some(stats_path) = file.stats_table {
            let stats_path = if stats_path.is_absolute() {
                stats_path
            } else {
                base_dir.join(stats_path)
            };
            config = config.with_stats_table(StatsTableLoader::load(&stats_path)?);
        }

        Ok(config)
    }
}
