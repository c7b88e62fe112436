//! Per-participant combat ledger.
//!
//! Every hp/ap mutator clamps, so `0 <= hp <= max_hp` and
//! `0 <= ap.current <= ap.max` hold after any sequence of calls.

use std::collections::BTreeSet;

use super::{CombatantId, Position, ResourceSnapshot, StatusEffectKind, StatusEffects};

/// Action point budget for the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionPoints {
    pub current: i32,
    pub max: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spent_this_turn: i32,
}

impl ActionPoints {
    pub fn full(max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: max,
            max,
            spent_this_turn: 0,
        }
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot::new(self.current, self.max)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current <= 0
    }
}

/// Derived combat numbers seeded from the level table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CombatStats {
    pub attack_bonus: i32,
    pub damage_bonus: i32,
    pub spell_save_dc: i32,
    pub initiative_bonus: i32,
    pub speed: i32,
}

/// Combat state of a single participant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatantState {
    pub character_id: CombatantId,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub armor_class: i32,
    #[cfg_attr(feature = "serde", serde(default = "default_level"))]
    pub level: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_npc: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub hostile: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub action_points: ActionPoints,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status_effects: StatusEffects,
    #[cfg_attr(feature = "serde", serde(default))]
    pub position: Option<Position>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub combat_stats: CombatStats,
    #[cfg_attr(feature = "serde", serde(default))]
    pub has_taken_turn: bool,
}

#[cfg(feature = "serde")]
fn default_level() -> u32 {
    1
}

impl CombatantState {
    /// Creates a combatant with full HP and zeroed stats.
    pub fn new(character_id: impl Into<CombatantId>, name: impl Into<String>, max_hp: i32) -> Self {
        let max_hp = max_hp.max(0);
        Self {
            character_id: character_id.into(),
            name: name.into(),
            hp: max_hp,
            max_hp,
            armor_class: 10,
            level: 1,
            is_npc: false,
            hostile: false,
            action_points: ActionPoints::default(),
            status_effects: StatusEffects::empty(),
            position: None,
            combat_stats: CombatStats::default(),
            has_taken_turn: false,
        }
    }

    pub fn with_hp(mut self, hp: i32) -> Self {
        self.set_hp(hp);
        self
    }

    pub fn with_action_points(mut self, max: i32) -> Self {
        self.action_points = ActionPoints::full(max);
        self
    }

    pub fn npc(mut self, hostile: bool) -> Self {
        self.is_npc = true;
        self.hostile = hostile;
        self
    }

    pub fn hostile(mut self, hostile: bool) -> Self {
        self.hostile = hostile;
        self
    }

    /// Whether this combatant occupies its turn slot this round.
    pub fn is_conscious(&self, incapacitating: &BTreeSet<StatusEffectKind>) -> bool {
        self.hp > 0 && !self.status_effects.has_any(incapacitating)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn hp_snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot::new(self.hp, self.max_hp)
    }

    /// Effective armor class including status modifiers.
    pub fn effective_armor_class(&self) -> i32 {
        self.armor_class + self.status_effects.modifier_total("armor_class")
    }

    /// Applies damage, never dropping below zero. Returns HP actually lost.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let before = self.hp;
        self.hp = (self.hp - amount).max(0);
        before - self.hp
    }

    /// Heals, never exceeding `max_hp`. Returns HP actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount).min(self.max_hp);
        self.hp - before
    }

    pub fn set_hp(&mut self, hp: i32) {
        self.hp = hp.clamp(0, self.max_hp);
    }

    /// Overwrites HP from an authoritative `current/max` pair.
    pub fn set_hp_snapshot(&mut self, snapshot: ResourceSnapshot) {
        let snapshot = snapshot.clamped();
        self.max_hp = snapshot.max;
        self.hp = snapshot.current;
    }

    /// Spends AP, never dropping below zero. Returns AP actually spent.
    pub fn spend_ap(&mut self, cost: i32) -> i32 {
        if cost <= 0 {
            return 0;
        }
        let spent = cost.min(self.action_points.current);
        self.action_points.current -= spent;
        self.action_points.spent_this_turn += spent;
        spent
    }

    /// Overwrites AP from an authoritative `current/max` pair.
    pub fn set_ap_snapshot(&mut self, snapshot: ResourceSnapshot) {
        let snapshot = snapshot.clamped();
        let spent = (self.action_points.current - snapshot.current).max(0);
        self.action_points.max = snapshot.max;
        self.action_points.current = snapshot.current;
        self.action_points.spent_this_turn += spent;
    }

    /// Refills AP at the start of this combatant's turn.
    pub fn refresh_ap(&mut self) {
        self.action_points = ActionPoints::full(self.action_points.max);
    }
}
