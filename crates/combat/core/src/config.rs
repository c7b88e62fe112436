use std::collections::BTreeSet;

use crate::state::{CombatStats, StatusEffectKind};

/// Combat rules configuration injected into the resolver, reconciler and
/// session construction.
///
/// The table is immutable once built; tests construct their own to control
/// every lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CombatConfig {
    /// Per-level combat numbers used to seed combatants from a roster.
    pub default_stats: DefaultStatsTable,

    /// Status effects that remove a combatant from the turn rotation.
    pub incapacitating: BTreeSet<StatusEffectKind>,

    /// Number of combat log entries kept when a session is persisted.
    pub log_tail_limit: usize,
}

impl CombatConfig {
    pub const DEFAULT_LOG_TAIL_LIMIT: usize = 100;
    pub const DEFAULT_ACTION_POINTS: i32 = 3;

    pub fn new() -> Self {
        Self {
            default_stats: DefaultStatsTable::standard(),
            incapacitating: StatusEffectKind::default_incapacitating(),
            log_tail_limit: Self::DEFAULT_LOG_TAIL_LIMIT,
        }
    }

    pub fn with_stats_table(mut self, table: DefaultStatsTable) -> Self {
        self.default_stats = table;
        self
    }

    pub fn with_incapacitating(mut self, kinds: impl IntoIterator<Item = StatusEffectKind>) -> Self {
        self.incapacitating = kinds.into_iter().collect();
        self
    }

    pub fn with_log_tail_limit(mut self, limit: usize) -> Self {
        self.log_tail_limit = limit;
        self
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Default combat numbers for one character level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelStats {
    pub level: u32,
    pub attack_bonus: i32,
    pub damage_bonus: i32,
    pub spell_save_dc: i32,
    pub initiative_bonus: i32,
    pub speed: i32,
    pub action_points: i32,
}

impl LevelStats {
    pub fn combat_stats(&self) -> CombatStats {
        CombatStats {
            attack_bonus: self.attack_bonus,
            damage_bonus: self.damage_bonus,
            spell_save_dc: self.spell_save_dc,
            initiative_bonus: self.initiative_bonus,
            speed: self.speed,
        }
    }
}

/// Level-indexed default stats.
///
/// Lookups resolve to the highest configured level that does not exceed the
/// requested one; levels below the first row use the first row.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultStatsTable {
    levels: Vec<LevelStats>,
}

impl DefaultStatsTable {
    /// Builds a table from arbitrary rows; rows are sorted by level and a
    /// duplicate level keeps the last row given.
    pub fn new(rows: impl IntoIterator<Item = LevelStats>) -> Self {
        let mut levels: Vec<LevelStats> = Vec::new();
        for row in rows {
            match levels.iter_mut().find(|r| r.level == row.level) {
                Some(existing) => *existing = row,
                None => levels.push(row),
            }
        }
        levels.sort_by_key(|r| r.level);
        Self { levels }
    }

    /// Proficiency-style progression: +1 attack every four levels from +2.
    pub fn standard() -> Self {
        Self::new((1..=20).map(|level| {
            let proficiency = 2 + (level as i32 - 1) / 4;
            LevelStats {
                level,
                attack_bonus: proficiency + 2,
                damage_bonus: 2,
                spell_save_dc: 8 + proficiency + 2,
                initiative_bonus: 1,
                speed: 30,
                action_points: CombatConfig::DEFAULT_ACTION_POINTS,
            }
        }))
    }

    pub fn stats_for(&self, level: u32) -> LevelStats {
        self.levels
            .iter()
            .rev()
            .find(|row| row.level <= level)
            .or_else(|| self.levels.first())
            .copied()
            .unwrap_or(LevelStats {
                level,
                attack_bonus: 0,
                damage_bonus: 0,
                spell_save_dc: 10,
                initiative_bonus: 0,
                speed: 30,
                action_points: CombatConfig::DEFAULT_ACTION_POINTS,
            })
    }

    pub fn levels(&self) -> &[LevelStats] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl Default for DefaultStatsTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(level: u32, attack_bonus: i32) -> LevelStats {
        LevelStats {
            level,
            attack_bonus,
            damage_bonus: 0,
            spell_save_dc: 10,
            initiative_bonus: 0,
            speed: 30,
            action_points: 2,
        }
    }

    #[test]
    fn stats_for_uses_highest_row_not_above_level() {
        let table = DefaultStatsTable::new([row(5, 7), row(1, 3)]);

        assert_eq!(table.stats_for(1).attack_bonus, 3);
        assert_eq!(table.stats_for(4).attack_bonus, 3);
        assert_eq!(table.stats_for(9).attack_bonus, 7);
    }

    #[test]
    fn stats_for_below_first_row_uses_first_row() {
        let table = DefaultStatsTable::new([row(3, 5)]);
        assert_eq!(table.stats_for(1).attack_bonus, 5);
    }

    #[test]
    fn empty_table_falls_back_to_neutral_stats() {
        let table = DefaultStatsTable::new([]);
        let stats = table.stats_for(4);
        assert_eq!(stats.attack_bonus, 0);
        assert_eq!(stats.action_points, CombatConfig::DEFAULT_ACTION_POINTS);
    }

    #[test]
    fn duplicate_levels_keep_last_row() {
        let table = DefaultStatsTable::new([row(2, 1), row(2, 9)]);
        assert_eq!(table.levels().len(), 1);
        assert_eq!(table.stats_for(2).attack_bonus, 9);
    }

    #[test]
    fn standard_table_progresses_every_four_levels() {
        let table = DefaultStatsTable::standard();
        assert_eq!(table.stats_for(1).attack_bonus, 4);
        assert_eq!(table.stats_for(5).attack_bonus, 5);
        assert_eq!(table.stats_for(20).attack_bonus, 8);
    }
}
