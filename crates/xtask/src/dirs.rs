//! Platform-specific directory utilities
//!
//! Mirrors the runtime's resolution so the tools look where the runtime
//! writes: the `COMBAT_*` environment variables first, then platform
//! defaults.

use std::path::PathBuf;

/// Session store root.
///
/// `COMBAT_DATA_DIR` when set, otherwise the runtime's platform default:
/// - macOS: `~/Library/Application Support/combat-engine/sessions`
/// - Linux: `~/.local/share/combat-engine/sessions`
/// - Windows: `%APPDATA%\combat-engine\sessions`
pub fn data_dir() -> PathBuf {
    std::env::var("COMBAT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| combat_runtime::default_data_dir())
}

/// Log directory.
///
/// `COMBAT_LOG_DIR` when set, otherwise the platform cache directory:
/// - macOS: `~/Library/Caches/combat-engine/logs`
/// - Linux: `~/.cache/combat-engine/logs`
/// - Windows: `%LOCALAPPDATA%\combat-engine\logs`
/// - Fallback: `/tmp/combat-engine/logs`
pub fn log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COMBAT_LOG_DIR") {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("", "", "combat-engine")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/combat-engine"))
        .join("logs")
}

/// Log file name, matching the runtime's `LoggingConfig` default.
pub const LOG_FILE: &str = "combat.log";
