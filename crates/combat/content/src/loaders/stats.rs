//! Default stats table loader.

use std::path::Path;

use combat_core::{DefaultStatsTable, LevelStats};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Stats table structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsTableFile {
    pub levels: Vec<LevelStats>,
}

/// Loader for the per-level default stats table from RON files.
pub struct StatsTableLoader;

impl StatsTableLoader {
    /// Load a stats table from a RON file.
    ///
    /// An empty table is rejected: every combatant needs a row to seed from.
    pub fn load(path: &Path) -> LoadResult<DefaultStatsTable> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load stats table {}: {}", path.display(), e))
    }

    /// Parse a stats table from RON text.
    pub fn parse(content: &str) -> LoadResult<DefaultStatsTable> {
        let file: StatsTableFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse stats table RON: {}", e))?;

        if file.levels.is_empty() {
            anyhow::bail!("stats table has no levels");
        }
        if let Some(row) = file.levels.iter().find(|row| row.level == 0) {
            anyhow::bail!("stats table row has invalid level {}", row.level);
        }

        Ok(DefaultStatsTable::new(file.levels))
    }
}
