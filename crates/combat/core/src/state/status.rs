//! Status effect system for combatants.
//!
//! Status effects are temporary conditions that modify a combatant's
//! capabilities, provide bonuses/penalties, or remove them from the turn
//! rotation entirely.
//!
//! # Round-based Duration
//!
//! Effects store `duration_rounds: Option<u32>`. Durations count down once per
//! new round; an effect reaching zero is removed. `None` is indefinite and only
//! ends when something removes it explicitly.

use std::collections::{BTreeMap, BTreeSet};

/// Active status effects on a combatant.
///
/// At most one effect exists per `(kind, source)` pair; applying the same pair
/// again refreshes the existing entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StatusEffects {
    effects: Vec<StatusEffect>,
}

/// A single status effect.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffect {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: StatusEffectKind,

    /// Remaining rounds; `None` means indefinite.
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration_rounds: Option<u32>,

    /// What applied the effect (a combatant id, spell name, hazard).
    #[cfg_attr(feature = "serde", serde(default))]
    pub source: Option<String>,

    /// Named numeric modifiers, e.g. `armor_class: +2`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: BTreeMap<String, i32>,
}

impl StatusEffect {
    pub fn new(kind: StatusEffectKind) -> Self {
        Self {
            kind,
            duration_rounds: None,
            source: None,
            modifiers: BTreeMap::new(),
        }
    }

    pub fn with_duration(mut self, rounds: u32) -> Self {
        self.duration_rounds = Some(rounds);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_modifier(mut self, name: impl Into<String>, value: i32) -> Self {
        self.modifiers.insert(name.into(), value);
        self
    }

    /// Human-readable label used in status displays.
    pub fn label(&self) -> String {
        match self.duration_rounds {
            Some(1) => format!("{} (1 round)", self.kind),
            Some(rounds) => format!("{} ({} rounds)", self.kind, rounds),
            None => self.kind.to_string(),
        }
    }
}

/// Types of status effects.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(ascii_case_insensitive)]
pub enum StatusEffectKind {
    // ========================================================================
    // Conditions (restrict what a combatant can do)
    // ========================================================================
    Blinded,
    Charmed,
    Deafened,
    Frightened,
    Grappled,
    Incapacitated,
    Paralyzed,
    Petrified,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
    Unconscious,

    // ========================================================================
    // Buffs
    // ========================================================================
    Blessed,
    Hasted,
    Invisible,
    Shielded,
    Regenerating,

    // ========================================================================
    // Damage over time
    // ========================================================================
    Burning,
    Bleeding,
}

impl StatusEffectKind {
    /// Default set of kinds that remove a combatant from the turn rotation.
    pub fn default_incapacitating() -> BTreeSet<Self> {
        use StatusEffectKind::*;
        [Incapacitated, Paralyzed, Petrified, Stunned, Unconscious]
            .into_iter()
            .collect()
    }
}

impl StatusEffects {
    /// Creates an empty status effect set.
    pub fn empty() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    pub fn from_effects(effects: impl IntoIterator<Item = StatusEffect>) -> Self {
        let mut set = Self::empty();
        for effect in effects {
            set.apply(effect);
        }
        set
    }

    /// Checks if any effect of the given kind is active.
    pub fn has(&self, kind: StatusEffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    /// Checks if any active effect belongs to `kinds`.
    pub fn has_any(&self, kinds: &BTreeSet<StatusEffectKind>) -> bool {
        self.effects.iter().any(|e| kinds.contains(&e.kind))
    }

    /// Applies an effect, refreshing an existing one with the same kind and source.
    pub fn apply(&mut self, effect: StatusEffect) {
        if let Some(existing) = self
            .effects
            .iter_mut()
            .find(|e| e.kind == effect.kind && e.source == effect.source)
        {
            *existing = effect;
        } else {
            self.effects.push(effect);
        }
    }

    /// Removes every effect of the given kind. Returns how many were removed.
    pub fn remove(&mut self, kind: StatusEffectKind) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| e.kind != kind);
        before - self.effects.len()
    }

    /// Counts down timed effects by one round and drops the ones that expired.
    ///
    /// Returns the kinds that expired.
    pub fn tick_round(&mut self) -> Vec<StatusEffectKind> {
        let mut expired = Vec::new();
        self.effects.retain_mut(|effect| {
            let Some(rounds) = effect.duration_rounds else {
                return true;
            };
            if rounds <= 1 {
                expired.push(effect.kind);
                false
            } else {
                effect.duration_rounds = Some(rounds - 1);
                true
            }
        });
        expired
    }

    /// Sum of a named modifier across every active effect.
    pub fn modifier_total(&self, name: &str) -> i32 {
        self.effects
            .iter()
            .filter_map(|e| e.modifiers.get(name))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Labels for every active effect, in application order.
    pub fn labels(&self) -> Vec<String> {
        self.effects.iter().map(StatusEffect::label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_refreshes_same_kind_and_source() {
        let mut effects = StatusEffects::empty();
        effects.apply(
            StatusEffect::new(StatusEffectKind::Poisoned)
                .with_duration(2)
                .with_source("spider"),
        );
        effects.apply(
            StatusEffect::new(StatusEffectKind::Poisoned)
                .with_duration(5)
                .with_source("spider"),
        );
        effects.apply(
            StatusEffect::new(StatusEffectKind::Poisoned)
                .with_duration(1)
                .with_source("trap"),
        );

        assert_eq!(effects.len(), 2);
        assert_eq!(effects.iter().next().unwrap().duration_rounds, Some(5));
    }

    #[test]
    fn tick_round_expires_last_round_effects() {
        let mut effects = StatusEffects::from_effects([
            StatusEffect::new(StatusEffectKind::Stunned).with_duration(1),
            StatusEffect::new(StatusEffectKind::Blessed).with_duration(3),
            StatusEffect::new(StatusEffectKind::Prone),
        ]);

        let expired = effects.tick_round();

        assert_eq!(expired, vec![StatusEffectKind::Stunned]);
        assert!(!effects.has(StatusEffectKind::Stunned));
        assert_eq!(
            effects
                .iter()
                .find(|e| e.kind == StatusEffectKind::Blessed)
                .unwrap()
                .duration_rounds,
            Some(2)
        );
        assert!(effects.has(StatusEffectKind::Prone));
    }

    #[test]
    fn modifier_total_sums_across_effects() {
        let effects = StatusEffects::from_effects([
            StatusEffect::new(StatusEffectKind::Shielded).with_modifier("armor_class", 2),
            StatusEffect::new(StatusEffectKind::Blessed)
                .with_modifier("armor_class", 1)
                .with_modifier("attack_bonus", 1),
        ]);

        assert_eq!(effects.modifier_total("armor_class"), 3);
        assert_eq!(effects.modifier_total("speed"), 0);
    }

    #[test]
    fn labels_include_remaining_rounds() {
        let effect = StatusEffect::new(StatusEffectKind::Burning).with_duration(2);
        assert_eq!(effect.label(), "Burning (2 rounds)");
        assert_eq!(
            StatusEffect::new(StatusEffectKind::Prone).with_duration(1).label(),
            "Prone (1 round)"
        );
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(
            "poisoned".parse::<StatusEffectKind>(),
            Ok(StatusEffectKind::Poisoned)
        );
        assert!("confused".parse::<StatusEffectKind>().is_err());
    }
}
