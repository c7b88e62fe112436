//! Victory-condition check, run by the orchestrator after every resolution.
//!
//! Kept apart from the turn resolver: the resolver always yields a transition,
//! and this check alone decides whether combat ends.

use crate::config::CombatConfig;
use crate::state::CombatSession;

/// How an encounter is won.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "rounds", rename_all = "snake_case")
)]
pub enum VictoryCondition {
    /// Every hostile combatant is down.
    #[default]
    DefeatAllHostiles,
    /// The non-hostile side is still standing after this many full rounds.
    SurviveRounds(u32),
    /// Only an explicit end ends combat.
    Manual,
}

/// How a finished encounter ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CombatOutcome {
    Victory,
    Defeat,
}

impl VictoryCondition {
    /// Returns the outcome if combat should end now.
    ///
    /// Defeat (no conscious non-hostile combatant) takes precedence over the
    /// configured win condition.
    pub fn evaluate(&self, session: &CombatSession, config: &CombatConfig) -> Option<CombatOutcome> {
        let incapacitating = &config.incapacitating;
        let mut friendly_standing = false;
        let mut hostile_standing = false;
        let mut has_friendly = false;

        for combatant in session.combatants.values() {
            let conscious = combatant.is_conscious(incapacitating);
            if combatant.hostile {
                hostile_standing |= conscious;
            } else {
                has_friendly = true;
                friendly_standing |= conscious;
            }
        }

        if has_friendly && !friendly_standing {
            return Some(CombatOutcome::Defeat);
        }

        match *self {
            VictoryCondition::DefeatAllHostiles if !hostile_standing => {
                Some(CombatOutcome::Victory)
            }
            VictoryCondition::SurviveRounds(rounds) if session.round_number > rounds => {
                Some(CombatOutcome::Victory)
            }
            _ => None,
        }
    }
}
