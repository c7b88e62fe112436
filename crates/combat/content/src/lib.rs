//! Data-driven combat configuration.
//!
//! Loaders for the files that parameterize combat rules:
//! - Combat configuration (TOML): log tail limit, incapacitating effects and
//!   an optional reference to a stats table
//! - Default stats table (RON): per-level combat numbers
//!
//! Loaded values are plain `combat-core` types; nothing here is stored in a
//! session.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, LoadResult, StatsTableLoader};

/// Bundled default configuration, relative to this crate's root.
pub const DEFAULT_CONFIG_FILE: &str = "data/combat.toml";

/// Bundled default stats table, relative to this crate's root.
pub const DEFAULT_STATS_FILE: &str = "data/stats.ron";
