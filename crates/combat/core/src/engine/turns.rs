use std::collections::BTreeMap;

use crate::config::CombatConfig;
use crate::error::{CombatError, ErrorSeverity};
use crate::state::{CombatantId, CombatantState};

/// Errors that can occur while resolving a turn transition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("turn order is empty")]
    EmptyTurnOrder,

    #[error("combatant {actor} is not in the turn order")]
    UnknownActor { actor: CombatantId },
}

impl CombatError for TurnError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            TurnError::EmptyTurnOrder => "TURN_EMPTY_ORDER",
            TurnError::UnknownActor { .. } => "TURN_UNKNOWN_ACTOR",
        }
    }
}

/// Why the current actor's turn is being resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    /// The actor still has budget and keeps acting.
    TurnContinues,
    /// The actor ran out of action points.
    ApExhausted,
    /// The actor (or the narrator) ended the turn.
    ExplicitEnd,
}

impl TerminationReason {
    /// Derives the reason from an action outcome: an explicit end wins, then
    /// an empty AP pool.
    pub fn from_outcome(explicit_end: bool, remaining_ap: i32) -> Self {
        if explicit_end {
            Self::ExplicitEnd
        } else if remaining_ap <= 0 {
            Self::ApExhausted
        } else {
            Self::TurnContinues
        }
    }

    pub fn ends_turn(self) -> bool {
        !matches!(self, Self::TurnContinues)
    }
}

/// Outcome of a resolution. Never persisted; the caller applies it through
/// [`CombatSession::apply_transition`](crate::state::CombatSession::apply_transition).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnTransitionResult {
    pub current_actor: CombatantId,
    /// Equal to `current_actor` when the turn does not advance.
    pub next_combatant: CombatantId,
    pub reason: TerminationReason,
    pub new_round: bool,
    /// Round number after the transition.
    pub round_number: u32,
    /// Turn-order slot of `next_combatant`.
    pub order_index: usize,
}

impl TurnTransitionResult {
    /// True when the caller must keep the current actor.
    pub fn is_continuation(&self) -> bool {
        self.next_combatant == self.current_actor && !self.new_round
    }
}

/// Pure turn-advancement algorithm over a fixed initiative order.
///
/// The resolver only reads; it never touches session state.
#[derive(Clone, Copy, Debug)]
pub struct TurnOrderResolver<'a> {
    config: &'a CombatConfig,
}

impl<'a> TurnOrderResolver<'a> {
    pub fn new(config: &'a CombatConfig) -> Self {
        Self { config }
    }

    /// Slot holder is eligible to act. Slots without a ledger entry never are.
    fn occupies_slot(
        &self,
        combatants: &BTreeMap<CombatantId, CombatantState>,
        id: &CombatantId,
    ) -> bool {
        combatants
            .get(id)
            .is_some_and(|c| c.is_conscious(&self.config.incapacitating))
    }

    /// Resolves who acts next.
    ///
    /// Scans forward from the slot after `current_actor`, wrapping at the end
    /// of `turn_order`. Crossing the end starts a new round. Slots already
    /// behind the cursor are never revisited within the same round, so a
    /// combatant healed after their slot passed waits for the next round.
    ///
    /// When nobody is conscious the transition wraps back to `current_actor`
    /// with a new round; ending combat is the victory check's job.
    pub fn resolve(
        &self,
        turn_order: &[CombatantId],
        combatants: &BTreeMap<CombatantId, CombatantState>,
        current_actor: &CombatantId,
        round_number: u32,
        reason: TerminationReason,
    ) -> Result<TurnTransitionResult, TurnError> {
        if turn_order.is_empty() {
            return Err(TurnError::EmptyTurnOrder);
        }

        let current_index = turn_order
            .iter()
            .position(|id| id == current_actor)
            .ok_or_else(|| TurnError::UnknownActor {
                actor: current_actor.clone(),
            })?;

        let round_number = round_number.max(1);

        if reason == TerminationReason::TurnContinues {
            return Ok(TurnTransitionResult {
                current_actor: current_actor.clone(),
                next_combatant: current_actor.clone(),
                reason,
                new_round: false,
                round_number,
                order_index: current_index,
            });
        }

        let len = turn_order.len();
        let next = (1..=len)
            .map(|step| (current_index + step, (current_index + step) % len))
            .find(|(_, slot)| self.occupies_slot(combatants, &turn_order[*slot]));

        let (order_index, new_round) = match next {
            Some((cursor, slot)) => (slot, cursor >= len),
            // Nobody conscious: wrap to self.
            None => (current_index, true),
        };

        Ok(TurnTransitionResult {
            current_actor: current_actor.clone(),
            next_combatant: turn_order[order_index].clone(),
            reason,
            new_round,
            round_number: if new_round {
                round_number + 1
            } else {
                round_number
            },
            order_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<CombatantId> {
        names.iter().map(|n| CombatantId::from(*n)).collect()
    }

    fn roster(entries: &[(&str, i32)]) -> BTreeMap<CombatantId, CombatantState> {
        entries
            .iter()
            .map(|(id, hp)| {
                (
                    CombatantId::from(*id),
                    CombatantState::new(*id, *id, 10).with_hp(*hp),
                )
            })
            .collect()
    }

    #[test]
    fn turn_continues_keeps_current_actor() {
        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "b", "c"]);
        let combatants = roster(&[("a", 10), ("b", 0), ("c", 10)]);

        for actor in &order {
            let result = resolver
                .resolve(&order, &combatants, actor, 3, TerminationReason::TurnContinues)
                .unwrap();
            assert_eq!(&result.next_combatant, actor);
            assert!(!result.new_round);
            assert_eq!(result.round_number, 3);
            assert!(result.is_continuation());
        }
    }

    #[test]
    fn skips_unconscious_combatant() {
        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "b", "c"]);
        let combatants = roster(&[("a", 10), ("b", 0), ("c", 10)]);

        let result = resolver
            .resolve(&order, &combatants, &"a".into(), 1, TerminationReason::ExplicitEnd)
            .unwrap();

        assert_eq!(result.next_combatant, CombatantId::from("c"));
        assert_eq!(result.order_index, 2);
        assert!(!result.new_round);
        assert_eq!(result.round_number, 1);
    }

    #[test]
    fn wrapping_past_the_end_starts_new_round() {
        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "b"]);
        let combatants = roster(&[("a", 10), ("b", 10)]);

        let result = resolver
            .resolve(&order, &combatants, &"b".into(), 4, TerminationReason::ApExhausted)
            .unwrap();

        assert_eq!(result.next_combatant, CombatantId::from("a"));
        assert!(result.new_round);
        assert_eq!(result.round_number, 5);
        assert_eq!(result.order_index, 0);
    }

    #[test]
    fn single_conscious_combatant_wraps_to_self() {
        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "b", "c"]);
        let combatants = roster(&[("a", 0), ("b", 7), ("c", 0)]);

        let result = resolver
            .resolve(&order, &combatants, &"b".into(), 2, TerminationReason::ExplicitEnd)
            .unwrap();

        assert_eq!(result.next_combatant, CombatantId::from("b"));
        assert!(result.new_round);
        assert_eq!(result.round_number, 3);
    }

    #[test]
    fn nobody_conscious_wraps_to_current_actor() {
        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "b"]);
        let combatants = roster(&[("a", 0), ("b", 0)]);

        let result = resolver
            .resolve(&order, &combatants, &"a".into(), 1, TerminationReason::ExplicitEnd)
            .unwrap();

        assert_eq!(result.next_combatant, CombatantId::from("a"));
        assert!(result.new_round);
        assert_eq!(result.round_number, 2);
        assert_eq!(result.order_index, 0);
    }

    #[test]
    fn incapacitated_combatant_is_skipped() {
        use crate::state::{StatusEffect, StatusEffectKind};

        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "b", "c"]);
        let mut combatants = roster(&[("a", 10), ("b", 10), ("c", 10)]);
        combatants
            .get_mut(&CombatantId::from("b"))
            .unwrap()
            .status_effects
            .apply(StatusEffect::new(StatusEffectKind::Paralyzed).with_duration(2));

        let result = resolver
            .resolve(&order, &combatants, &"a".into(), 1, TerminationReason::ExplicitEnd)
            .unwrap();
        assert_eq!(result.next_combatant, CombatantId::from("c"));
    }

    #[test]
    fn incapacitating_set_comes_from_config() {
        use crate::state::{StatusEffect, StatusEffectKind};

        let config = CombatConfig::default().with_incapacitating([StatusEffectKind::Prone]);
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "b", "c"]);
        let mut combatants = roster(&[("a", 10), ("b", 10), ("c", 10)]);
        combatants
            .get_mut(&CombatantId::from("b"))
            .unwrap()
            .status_effects
            .apply(StatusEffect::new(StatusEffectKind::Prone));

        let result = resolver
            .resolve(&order, &combatants, &"a".into(), 1, TerminationReason::ExplicitEnd)
            .unwrap();
        assert_eq!(result.next_combatant, CombatantId::from("c"));
    }

    #[test]
    fn slot_without_ledger_entry_is_skipped() {
        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "ghost", "c"]);
        let combatants = roster(&[("a", 10), ("c", 10)]);

        let result = resolver
            .resolve(&order, &combatants, &"a".into(), 1, TerminationReason::ExplicitEnd)
            .unwrap();
        assert_eq!(result.next_combatant, CombatantId::from("c"));
    }

    #[test]
    fn unknown_actor_is_rejected() {
        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);
        let order = ids(&["a", "b"]);
        let combatants = roster(&[("a", 10), ("b", 10)]);

        let err = resolver
            .resolve(&order, &combatants, &"z".into(), 1, TerminationReason::ExplicitEnd)
            .unwrap_err();
        assert_eq!(err, TurnError::UnknownActor { actor: "z".into() });
        assert_eq!(err.severity(), ErrorSeverity::Validation);
    }

    #[test]
    fn empty_turn_order_is_rejected() {
        let config = CombatConfig::default();
        let resolver = TurnOrderResolver::new(&config);

        let err = resolver
            .resolve(&[], &BTreeMap::new(), &"a".into(), 1, TerminationReason::ExplicitEnd)
            .unwrap_err();
        assert_eq!(err, TurnError::EmptyTurnOrder);
    }

    #[test]
    fn termination_reason_from_outcome() {
        assert_eq!(
            TerminationReason::from_outcome(true, 2),
            TerminationReason::ExplicitEnd
        );
        assert_eq!(
            TerminationReason::from_outcome(false, 0),
            TerminationReason::ApExhausted
        );
        assert_eq!(
            TerminationReason::from_outcome(false, 1),
            TerminationReason::TurnContinues
        );
    }
}
