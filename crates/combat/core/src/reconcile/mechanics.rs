use std::collections::{BTreeMap, BTreeSet};

use super::{NarrativeEffect, ReconciliationContext};
use crate::config::CombatConfig;
use crate::state::{CombatSession, CombatantState};

/// Displayable status of one combatant after reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatantStatus {
    /// `"current/max"`.
    pub hp: String,
    /// `"current/max"`.
    pub ap: String,
    /// Structured effect labels first, then narrative annotations.
    pub status: Vec<String>,
    pub hostile: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub conscious: bool,
}

/// Status of every combatant keyed by display label.
///
/// The label is the combatant's name; a later combatant sharing a name
/// already taken gets a `#N` suffix (`"Goblin"`, `"Goblin #2"`).
pub type StatusMap = BTreeMap<String, CombatantStatus>;

/// Where the encounter stands, for prompt building and UIs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnInfo {
    pub round_number: u32,
    /// 1-based slot of the active combatant.
    pub turn_number: usize,
    pub active_combatant: Option<String>,
    pub initiative_order: Vec<String>,
    pub is_npc_turn: bool,
}

/// Merges authoritative deltas, persisted state and narrative annotations.
///
/// Priority per field: the context's authoritative value, then the
/// combatant's own state. Narrative annotations only ever append to the
/// status list. Nothing here mutates its inputs.
#[derive(Clone, Copy, Debug)]
pub struct MechanicsReconciler<'a> {
    config: &'a CombatConfig,
}

impl<'a> MechanicsReconciler<'a> {
    pub fn new(config: &'a CombatConfig) -> Self {
        Self { config }
    }

    pub fn reconcile<C>(&self, combatant: &CombatantState, ctx: &C) -> CombatantStatus
    where
        C: ReconciliationContext + ?Sized,
    {
        let id = &combatant.character_id;
        let hp = ctx
            .authoritative_hp(id)
            .unwrap_or_else(|| combatant.hp_snapshot());
        let ap = ctx
            .authoritative_ap(id)
            .unwrap_or_else(|| combatant.action_points.snapshot());

        let mut status = combatant.status_effects.labels();
        let mut seen: Vec<String> = combatant
            .status_effects
            .iter()
            .map(|effect| effect.kind.to_string().to_lowercase())
            .collect();

        for effect in ctx.narrative_effects(&combatant.name) {
            let key = effect.key().to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            status.push(effect.label());
        }

        CombatantStatus {
            hp: hp.to_string(),
            ap: ap.to_string(),
            status,
            hostile: combatant.hostile,
            conscious: hp.current > 0
                && !combatant.status_effects.has_any(&self.config.incapacitating),
        }
    }

    /// Display label of every combatant, in initiative order.
    ///
    /// Names are unique labels unless shared; the first holder of a name
    /// keeps it and later holders get the lowest free `#N` suffix.
    pub fn labels<'s>(&self, session: &'s CombatSession) -> Vec<(&'s CombatantState, String)> {
        let mut taken = BTreeSet::new();
        session
            .combatants_in_order()
            .map(|combatant| {
                let mut label = combatant.name.clone();
                let mut n = 2;
                while taken.contains(&label) {
                    label = format!("{} #{n}", combatant.name);
                    n += 1;
                }
                taken.insert(label.clone());
                (combatant, label)
            })
            .collect()
    }

    /// Reconciled status for every combatant in the session.
    pub fn status_map<C>(&self, session: &CombatSession, ctx: &C) -> StatusMap
    where
        C: ReconciliationContext + ?Sized,
    {
        self.labels(session)
            .into_iter()
            .map(|(combatant, label)| (label, self.reconcile(combatant, ctx)))
            .collect()
    }

    pub fn turn_info(&self, session: &CombatSession) -> TurnInfo {
        let active = session.current_combatant();
        let labels = self.labels(session);
        let active_label = active.and_then(|current| {
            labels
                .iter()
                .find(|(c, _)| c.character_id == current.character_id)
                .map(|(_, label)| label.clone())
        });
        TurnInfo {
            round_number: session.round_number,
            turn_number: session.current_turn_index + 1,
            active_combatant: active_label,
            initiative_order: labels.into_iter().map(|(_, label)| label).collect(),
            is_npc_turn: active.is_some_and(|c| c.is_npc),
        }
    }

    /// Narrative annotations that did not collapse into a structured effect.
    pub fn annotations<'c, C>(
        &self,
        combatant: &CombatantState,
        ctx: &'c C,
    ) -> impl Iterator<Item = &'c NarrativeEffect>
    where
        C: ReconciliationContext + ?Sized,
    {
        let structured: Vec<String> = combatant
            .status_effects
            .iter()
            .map(|effect| effect.kind.to_string().to_lowercase())
            .collect();
        ctx.narrative_effects(&combatant.name)
            .iter()
            .filter(move |effect| !structured.contains(&effect.key().to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::engine::VictoryCondition;
    use crate::reconcile::MechanicsContext;
    use crate::state::{RosterEntry, StatusEffect, StatusEffectKind};

    fn session() -> (CombatSession, CombatConfig) {
        let config = CombatConfig::default();
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        let mut session = CombatSession::from_roster(
            "s-1",
            "bridge",
            vec![
                RosterEntry::player("hero", "Hero", 18, 20).with_initiative(14),
                RosterEntry::npc("troll", "Troll", true, 40, 40).with_initiative(9),
            ],
            VictoryCondition::default(),
            &config,
            now,
        )
        .unwrap();
        session.begin(&config, now).unwrap();
        (session, config)
    }

    #[test]
    fn authoritative_hp_wins_over_ledger() {
        let (session, config) = session();
        let reconciler = MechanicsReconciler::new(&config);
        let ctx = MechanicsContext::new().with_hp("hero", 4, 20);

        let status = reconciler.reconcile(session.combatant(&"hero".into()).unwrap(), &ctx);
        assert_eq!(status.hp, "4/20");
        assert_eq!(status.ap, "3/3");
        assert!(!status.hostile);
    }

    #[test]
    fn missing_context_falls_back_to_ledger() {
        let (session, config) = session();
        let reconciler = MechanicsReconciler::new(&config);

        let map = reconciler.status_map(&session, &());
        assert_eq!(map["Hero"].hp, "18/20");
        assert_eq!(map["Troll"].hp, "40/40");
        assert!(map["Troll"].hostile);
        assert!(map["Troll"].status.is_empty());
    }

    #[test]
    fn narrative_annotations_append_without_duplicates() {
        let (mut session, config) = session();
        session
            .combatant_mut(&"troll".into())
            .unwrap()
            .status_effects
            .apply(StatusEffect::new(StatusEffectKind::Burning).with_duration(2));
        let reconciler = MechanicsReconciler::new(&config);
        let ctx = MechanicsContext::new()
            .with_narrative("troll", NarrativeEffect::condition("burning"))
            .with_narrative("troll", NarrativeEffect::condition("enraged"))
            .with_narrative("troll", NarrativeEffect::condition("Enraged"));

        let map = reconciler.status_map(&session, &ctx);
        assert_eq!(map["Troll"].status, vec!["Burning (2 rounds)", "enraged"]);

        let troll = session.combatant(&"troll".into()).unwrap();
        assert_eq!(reconciler.annotations(troll, &ctx).count(), 2);
    }

    #[test]
    fn reconciliation_does_not_touch_session() {
        let (session, config) = session();
        let before = session.clone();
        let reconciler = MechanicsReconciler::new(&config);
        let ctx = MechanicsContext::new().with_hp("hero", 0, 20).with_ap("hero", 0, 3);

        let status = reconciler.reconcile(session.combatant(&"hero".into()).unwrap(), &ctx);
        assert!(!status.conscious);
        assert_eq!(session, before);
    }

    #[test]
    fn turn_info_reports_one_based_slot() {
        let (mut session, config) = session();
        let reconciler = MechanicsReconciler::new(&config);

        let info = reconciler.turn_info(&session);
        assert_eq!(info.turn_number, 1);
        assert_eq!(info.active_combatant.as_deref(), Some("Hero"));
        assert_eq!(info.initiative_order, vec!["Hero", "Troll"]);
        assert!(!info.is_npc_turn);

        session.current_turn_index = 1;
        let info = reconciler.turn_info(&session);
        assert_eq!(info.turn_number, 2);
        assert!(info.is_npc_turn);
    }

    #[test]
    fn shared_names_get_distinct_labels() {
        let config = CombatConfig::default();
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        let mut session = CombatSession::from_roster(
            "s-2",
            "cave",
            vec![
                RosterEntry::player("hero", "Hero", 20, 20).with_initiative(15),
                RosterEntry::npc("gob-1", "Goblin", true, 1, 7).with_initiative(12),
                RosterEntry::npc("gob-2", "Goblin", true, 7, 7).with_initiative(8),
            ],
            VictoryCondition::default(),
            &config,
            now,
        )
        .unwrap();
        session.begin(&config, now).unwrap();
        let reconciler = MechanicsReconciler::new(&config);

        let map = reconciler.status_map(&session, &());
        assert_eq!(map.len(), 3);
        assert_eq!(map["Goblin"].hp, "1/7");
        assert_eq!(map["Goblin #2"].hp, "7/7");

        session.current_turn_index = 2;
        let info = reconciler.turn_info(&session);
        assert_eq!(info.initiative_order, vec!["Hero", "Goblin", "Goblin #2"]);
        assert_eq!(info.active_combatant.as_deref(), Some("Goblin #2"));
    }
}
