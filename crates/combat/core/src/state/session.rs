//! Combat session: the authoritative state of one encounter.
//!
//! All mutation goes through the methods here. The turn resolver produces a
//! [`TurnTransitionResult`] value and [`CombatSession::apply_transition`] is
//! its only writer.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::{CombatAction, CombatantId, CombatantState, RosterEntry, SessionId};
use crate::config::CombatConfig;
use crate::engine::{
    CombatOutcome, TerminationReason, TurnError, TurnOrderResolver, TurnTransitionResult,
    VictoryCondition,
};
use crate::error::{CombatError, ErrorSeverity};

/// Lifecycle status of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Initializing,
    InProgress,
    Completed,
    Aborted,
}

impl SessionStatus {
    /// COMPLETED and ABORTED sessions belong in history.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// Errors raised by session mutations. Every variant leaves the session untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("roster is empty")]
    EmptyRoster,

    #[error("combatant {id} appears more than once")]
    DuplicateCombatant { id: CombatantId },

    #[error("combatant {id} is not part of this session")]
    UnknownCombatant { id: CombatantId },

    #[error("session is {status}; expected {expected}")]
    InvalidStatus {
        status: SessionStatus,
        expected: SessionStatus,
    },

    #[error("session already ended with status {status}")]
    AlreadyEnded { status: SessionStatus },

    #[error("transition was resolved for {resolved}, but the current actor is {current}")]
    StaleTransition {
        resolved: CombatantId,
        current: CombatantId,
    },

    #[error(transparent)]
    Turn(#[from] TurnError),
}

impl CombatError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            SessionError::Turn(inner) => inner.severity(),
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::EmptyRoster => "SESSION_EMPTY_ROSTER",
            SessionError::DuplicateCombatant { .. } => "SESSION_DUPLICATE_COMBATANT",
            SessionError::UnknownCombatant { .. } => "SESSION_UNKNOWN_COMBATANT",
            SessionError::InvalidStatus { .. } => "SESSION_INVALID_STATUS",
            SessionError::AlreadyEnded { .. } => "SESSION_ALREADY_ENDED",
            SessionError::StaleTransition { .. } => "SESSION_STALE_TRANSITION",
            SessionError::Turn(inner) => inner.error_code(),
        }
    }
}

/// One encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatSession {
    pub session_id: SessionId,
    /// Non-owning reference to the scene the encounter happens in.
    pub scene_id: String,
    pub status: SessionStatus,
    pub round_number: u32,
    /// Fixed initiative order. Append-only for the encounter.
    pub turn_order: Vec<CombatantId>,
    /// Slot of the actor whose turn was last resolved into.
    pub current_turn_index: usize,
    pub combatants: BTreeMap<CombatantId, CombatantState>,
    pub combat_log: Vec<CombatAction>,
    pub victory_condition: VictoryCondition,
    #[cfg_attr(feature = "serde", serde(default))]
    pub outcome: Option<CombatOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CombatSession {
    /// Builds a session from a roster snapshot.
    ///
    /// Entries are ordered by initiative, highest first; ties keep roster
    /// order. Combat numbers come from the config's level table.
    pub fn from_roster(
        session_id: impl Into<SessionId>,
        scene_id: impl Into<String>,
        roster: Vec<RosterEntry>,
        victory_condition: VictoryCondition,
        config: &CombatConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if roster.is_empty() {
            return Err(SessionError::EmptyRoster);
        }

        let mut seen = BTreeSet::new();
        for entry in &roster {
            if !seen.insert(&entry.character_id) {
                return Err(SessionError::DuplicateCombatant {
                    id: entry.character_id.clone(),
                });
            }
        }

        let mut ordered = roster;
        ordered.sort_by(|a, b| b.initiative.cmp(&a.initiative));

        let turn_order = ordered.iter().map(|e| e.character_id.clone()).collect();
        let combatants = ordered
            .iter()
            .map(|entry| (entry.character_id.clone(), seed_combatant(entry, config)))
            .collect();

        Ok(Self {
            session_id: session_id.into(),
            scene_id: scene_id.into(),
            status: SessionStatus::Initializing,
            round_number: 1,
            turn_order,
            current_turn_index: 0,
            combatants,
            combat_log: Vec::new(),
            victory_condition,
            outcome: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Starts the encounter at the first conscious slot.
    pub fn begin(&mut self, config: &CombatConfig, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status != SessionStatus::Initializing {
            return Err(SessionError::InvalidStatus {
                status: self.status,
                expected: SessionStatus::Initializing,
            });
        }

        self.current_turn_index = self
            .turn_order
            .iter()
            .position(|id| {
                self.combatants
                    .get(id)
                    .is_some_and(|c| c.is_conscious(&config.incapacitating))
            })
            .unwrap_or(0);
        self.status = SessionStatus::InProgress;
        if let Some(actor) = self.turn_order.get(self.current_turn_index).cloned()
            && let Some(combatant) = self.combatants.get_mut(&actor)
        {
            combatant.refresh_ap();
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::AlreadyEnded {
                status: self.status,
            });
        }
        Ok(())
    }

    /// The combatant whose turn is active.
    pub fn current_actor(&self) -> Option<&CombatantId> {
        self.turn_order.get(self.current_turn_index)
    }

    pub fn current_combatant(&self) -> Option<&CombatantState> {
        self.current_actor().and_then(|id| self.combatants.get(id))
    }

    pub fn combatant(&self, id: &CombatantId) -> Option<&CombatantState> {
        self.combatants.get(id)
    }

    pub fn combatant_mut(&mut self, id: &CombatantId) -> Option<&mut CombatantState> {
        self.combatants.get_mut(id)
    }

    pub fn combatant_by_name(&self, name: &str) -> Option<&CombatantState> {
        self.combatants
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Combatants in initiative order. Slots without a ledger entry are skipped.
    pub fn combatants_in_order(&self) -> impl Iterator<Item = &CombatantState> {
        self.turn_order
            .iter()
            .filter_map(|id| self.combatants.get(id))
    }

    /// Resolves the current actor's transition without mutating anything.
    pub fn resolve(
        &self,
        config: &CombatConfig,
        reason: TerminationReason,
    ) -> Result<TurnTransitionResult, SessionError> {
        let actor = self
            .current_actor()
            .ok_or(SessionError::Turn(TurnError::EmptyTurnOrder))?;
        let result = TurnOrderResolver::new(config).resolve(
            &self.turn_order,
            &self.combatants,
            actor,
            self.round_number,
            reason,
        )?;
        Ok(result)
    }

    /// Applies a resolved transition. The single writer for turn state.
    ///
    /// Continuations are no-ops. Otherwise the outgoing actor is marked as
    /// having acted, a new round resets those marks and ticks effect
    /// durations, and the incoming actor's AP is refilled.
    pub fn apply_transition(
        &mut self,
        result: &TurnTransitionResult,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;

        let current = self
            .current_actor()
            .cloned()
            .ok_or(SessionError::Turn(TurnError::EmptyTurnOrder))?;
        if current != result.current_actor {
            return Err(SessionError::StaleTransition {
                resolved: result.current_actor.clone(),
                current,
            });
        }
        if result.order_index >= self.turn_order.len()
            || self.turn_order[result.order_index] != result.next_combatant
        {
            return Err(SessionError::UnknownCombatant {
                id: result.next_combatant.clone(),
            });
        }

        if result.reason == TerminationReason::TurnContinues {
            return Ok(());
        }

        if let Some(outgoing) = self.combatants.get_mut(&current) {
            outgoing.has_taken_turn = true;
        }

        if result.new_round {
            self.round_number = result.round_number.max(self.round_number + 1);
            for combatant in self.combatants.values_mut() {
                combatant.has_taken_turn = false;
                combatant.status_effects.tick_round();
            }
        }

        self.current_turn_index = result.order_index;
        if let Some(incoming) = self.combatants.get_mut(&result.next_combatant) {
            incoming.refresh_ap();
        }
        self.updated_at = now;
        Ok(())
    }

    /// Appends a resolved action to the log and charges its AP cost.
    pub fn record_action(
        &mut self,
        action: CombatAction,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        if let Some(target) = &action.target_id
            && !self.combatants.contains_key(target)
        {
            return Err(SessionError::UnknownCombatant { id: target.clone() });
        }
        let actor = self
            .combatants
            .get_mut(&action.actor_id)
            .ok_or_else(|| SessionError::UnknownCombatant {
                id: action.actor_id.clone(),
            })?;

        actor.spend_ap(action.ap_cost);
        self.combat_log.push(action);
        self.updated_at = now;
        Ok(())
    }

    /// Adds a combatant mid-encounter (summons, reinforcements) at the end of
    /// the turn order.
    pub fn add_combatant(
        &mut self,
        entry: RosterEntry,
        config: &CombatConfig,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        if self.combatants.contains_key(&entry.character_id) {
            return Err(SessionError::DuplicateCombatant {
                id: entry.character_id,
            });
        }
        self.turn_order.push(entry.character_id.clone());
        self.combatants
            .insert(entry.character_id.clone(), seed_combatant(&entry, config));
        self.updated_at = now;
        Ok(())
    }

    /// Ends the encounter with an outcome.
    pub fn finish(&mut self, outcome: CombatOutcome, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.status = SessionStatus::Completed;
        self.outcome = Some(outcome);
        self.updated_at = now;
        Ok(())
    }

    /// Ends the encounter without an outcome.
    pub fn abort(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.status = SessionStatus::Aborted;
        self.updated_at = now;
        Ok(())
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Last `limit` log entries, oldest first.
    pub fn log_tail(&self, limit: usize) -> &[CombatAction] {
        let start = self.combat_log.len().saturating_sub(limit);
        &self.combat_log[start..]
    }

    /// Drops all but the last `limit` log entries.
    pub fn trim_log(&mut self, limit: usize) {
        let excess = self.combat_log.len().saturating_sub(limit);
        if excess > 0 {
            self.combat_log.drain(..excess);
        }
    }
}

fn seed_combatant(entry: &RosterEntry, config: &CombatConfig) -> CombatantState {
    let stats = config.default_stats.stats_for(entry.level);
    let mut combatant = CombatantState::new(entry.character_id.clone(), entry.name.clone(), entry.max_hp)
        .with_hp(entry.hp)
        .with_action_points(stats.action_points);
    combatant.armor_class = entry.ac;
    combatant.level = entry.level;
    combatant.is_npc = !entry.is_player;
    combatant.hostile = entry.hostile;
    combatant.combat_stats = stats.combat_stats();
    combatant
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::state::{ActionType, StatusEffect, StatusEffectKind};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    fn roster() -> Vec<RosterEntry> {
        vec![
            RosterEntry::npc("enemy", "Enemy", true, 12, 12).with_initiative(8),
            RosterEntry::player("hero", "Hero", 20, 20).with_initiative(17),
            RosterEntry::npc("ally", "Ally", false, 0, 10).with_initiative(12),
        ]
    }

    fn started() -> (CombatSession, CombatConfig) {
        let config = CombatConfig::default();
        let mut session = CombatSession::from_roster(
            "s-1",
            "tavern",
            roster(),
            VictoryCondition::DefeatAllHostiles,
            &config,
            now(),
        )
        .unwrap();
        session.begin(&config, now()).unwrap();
        (session, config)
    }

    fn id(s: &str) -> CombatantId {
        CombatantId::from(s)
    }

    #[test]
    fn from_roster_orders_by_initiative() {
        let (session, _) = started();
        assert_eq!(session.turn_order, vec![id("hero"), id("ally"), id("enemy")]);
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.round_number, 1);
        assert_eq!(session.current_actor(), Some(&id("hero")));
    }

    #[test]
    fn from_roster_ties_keep_roster_order() {
        let config = CombatConfig::default();
        let session = CombatSession::from_roster(
            "s-1",
            "scene",
            vec![
                RosterEntry::player("b", "B", 5, 5).with_initiative(10),
                RosterEntry::player("a", "A", 5, 5).with_initiative(10),
            ],
            VictoryCondition::Manual,
            &config,
            now(),
        )
        .unwrap();
        assert_eq!(session.turn_order, vec![id("b"), id("a")]);
    }

    #[test]
    fn from_roster_rejects_duplicates_and_empty() {
        let config = CombatConfig::default();
        let err = CombatSession::from_roster(
            "s-1",
            "scene",
            vec![
                RosterEntry::player("a", "A", 5, 5),
                RosterEntry::player("a", "A again", 5, 5),
            ],
            VictoryCondition::default(),
            &config,
            now(),
        )
        .unwrap_err();
        assert_eq!(err, SessionError::DuplicateCombatant { id: id("a") });

        let err = CombatSession::from_roster(
            "s-1",
            "scene",
            vec![],
            VictoryCondition::default(),
            &config,
            now(),
        )
        .unwrap_err();
        assert_eq!(err, SessionError::EmptyRoster);
    }

    #[test]
    fn from_roster_seeds_stats_and_clamps_hp() {
        let config = CombatConfig::default();
        let session = CombatSession::from_roster(
            "s-1",
            "scene",
            vec![
                RosterEntry::npc("ogre", "Ogre", true, 80, 59)
                    .with_level(5)
                    .with_armor_class(11),
            ],
            VictoryCondition::default(),
            &config,
            now(),
        )
        .unwrap();
        let ogre = session.combatant(&id("ogre")).unwrap();

        assert_eq!(ogre.hp, 59);
        assert!(ogre.is_npc);
        assert!(ogre.hostile);
        assert_eq!(ogre.armor_class, 11);
        assert_eq!(ogre.combat_stats, config.default_stats.stats_for(5).combat_stats());
        assert_eq!(ogre.action_points.max, CombatConfig::DEFAULT_ACTION_POINTS);
    }

    #[test]
    fn begin_skips_unconscious_leading_slots() {
        let config = CombatConfig::default();
        let mut session = CombatSession::from_roster(
            "s-1",
            "scene",
            vec![
                RosterEntry::player("down", "Down", 0, 10).with_initiative(20),
                RosterEntry::player("up", "Up", 10, 10).with_initiative(5),
            ],
            VictoryCondition::default(),
            &config,
            now(),
        )
        .unwrap();
        session.begin(&config, now()).unwrap();
        assert_eq!(session.current_actor(), Some(&id("up")));

        assert!(matches!(
            session.begin(&config, now()),
            Err(SessionError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn hero_ally_enemy_rotation() {
        let (mut session, config) = started();

        let t1 = session.resolve(&config, TerminationReason::ExplicitEnd).unwrap();
        assert_eq!(t1.next_combatant, id("enemy"));
        assert!(!t1.new_round);
        session.apply_transition(&t1, now()).unwrap();
        assert!(session.combatant(&id("hero")).unwrap().has_taken_turn);

        let t2 = session.resolve(&config, TerminationReason::ExplicitEnd).unwrap();
        assert_eq!(t2.next_combatant, id("hero"));
        assert!(t2.new_round);
        assert_eq!(t2.round_number, 2);
        session.apply_transition(&t2, now()).unwrap();

        assert_eq!(session.round_number, 2);
        assert_eq!(session.current_actor(), Some(&id("hero")));
        assert!(session.combatants.values().all(|c| !c.has_taken_turn));
    }

    #[test]
    fn healed_combatant_waits_for_next_round() {
        let (mut session, config) = started();

        // hero -> enemy, ally skipped while down
        let t = session.resolve(&config, TerminationReason::ExplicitEnd).unwrap();
        session.apply_transition(&t, now()).unwrap();
        assert_eq!(session.current_actor(), Some(&id("enemy")));

        // ally is healed during the enemy's turn; their slot is already behind
        session.combatant_mut(&id("ally")).unwrap().heal(6);

        let t = session.resolve(&config, TerminationReason::ExplicitEnd).unwrap();
        assert_eq!(t.next_combatant, id("hero"));
        assert!(t.new_round);
        session.apply_transition(&t, now()).unwrap();

        let t = session.resolve(&config, TerminationReason::ExplicitEnd).unwrap();
        assert_eq!(t.next_combatant, id("ally"));
        assert!(!t.new_round);
    }

    #[test]
    fn continuation_is_a_no_op() {
        let (mut session, config) = started();
        let before = session.clone();

        let t = session.resolve(&config, TerminationReason::TurnContinues).unwrap();
        session.apply_transition(&t, now() + Duration::seconds(5)).unwrap();

        assert_eq!(session, before);
    }

    #[test]
    fn stale_transition_is_rejected_without_mutation() {
        let (mut session, config) = started();
        let t = session.resolve(&config, TerminationReason::ExplicitEnd).unwrap();
        session.apply_transition(&t, now()).unwrap();
        let before = session.clone();

        let err = session.apply_transition(&t, now()).unwrap_err();
        assert!(matches!(err, SessionError::StaleTransition { .. }));
        assert_eq!(session, before);
    }

    #[test]
    fn new_round_ticks_effects_and_refreshes_incoming_ap() {
        let (mut session, config) = started();
        session
            .combatant_mut(&id("hero"))
            .unwrap()
            .status_effects
            .apply(StatusEffect::new(StatusEffectKind::Blessed).with_duration(1));

        let action = CombatAction::new("hero", ActionType::Attack, 1, now())
            .targeting("enemy")
            .costing(2);
        session.record_action(action, now()).unwrap();
        assert_eq!(session.combatant(&id("hero")).unwrap().action_points.current, 1);

        let t = session.resolve(&config, TerminationReason::ExplicitEnd).unwrap();
        session.apply_transition(&t, now()).unwrap();
        let t = session.resolve(&config, TerminationReason::ExplicitEnd).unwrap();
        session.apply_transition(&t, now()).unwrap();

        let hero = session.combatant(&id("hero")).unwrap();
        assert!(!hero.status_effects.has(StatusEffectKind::Blessed));
        assert_eq!(hero.action_points.current, hero.action_points.max);
        assert_eq!(hero.action_points.spent_this_turn, 0);
    }

    #[test]
    fn record_action_rejects_unknown_combatants() {
        let (mut session, _) = started();
        let before = session.clone();

        let err = session
            .record_action(CombatAction::new("nobody", ActionType::Dash, 1, now()), now())
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownCombatant { id: id("nobody") });

        let err = session
            .record_action(
                CombatAction::new("hero", ActionType::Attack, 1, now()).targeting("ghost"),
                now(),
            )
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownCombatant { id: id("ghost") });
        assert_eq!(session, before);
    }

    #[test]
    fn add_combatant_appends_to_turn_order() {
        let (mut session, config) = started();
        session
            .add_combatant(
                RosterEntry::npc("wolf", "Spirit Wolf", false, 9, 9).with_initiative(30),
                &config,
                now(),
            )
            .unwrap();

        assert_eq!(session.turn_order.last(), Some(&id("wolf")));
        assert!(matches!(
            session.add_combatant(RosterEntry::player("hero", "Hero", 1, 1), &config, now()),
            Err(SessionError::DuplicateCombatant { .. })
        ));
    }

    #[test]
    fn finished_sessions_reject_mutation() {
        let (mut session, _) = started();
        session.finish(CombatOutcome::Victory, now()).unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.outcome, Some(CombatOutcome::Victory));
        assert!(matches!(
            session.abort(now()),
            Err(SessionError::AlreadyEnded { .. })
        ));
        let t = TurnTransitionResult {
            current_actor: id("hero"),
            next_combatant: id("enemy"),
            reason: TerminationReason::ExplicitEnd,
            new_round: false,
            round_number: 1,
            order_index: 2,
        };
        assert!(session.apply_transition(&t, now()).is_err());
    }

    #[test]
    fn trim_log_keeps_tail() {
        let (mut session, _) = started();
        for round in 1..=5 {
            session
                .record_action(CombatAction::new("hero", ActionType::Dodge, round, now()), now())
                .unwrap();
        }

        assert_eq!(session.log_tail(2).len(), 2);
        assert_eq!(session.log_tail(2)[0].round_number, 4);

        session.trim_log(3);
        assert_eq!(session.combat_log.len(), 3);
        assert_eq!(session.combat_log[0].round_number, 3);
    }

    #[test]
    fn combatant_by_name_ignores_case() {
        let (session, _) = started();
        assert_eq!(
            session.combatant_by_name("HERO").map(|c| &c.character_id),
            Some(&id("hero"))
        );
    }
}
