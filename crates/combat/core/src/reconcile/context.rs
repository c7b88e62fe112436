use std::collections::BTreeMap;

use super::NarrativeEffect;
use crate::state::{CombatantId, ResourceSnapshot};

/// Per-action deltas handed to the reconciler.
///
/// Authoritative values are keyed by id; narrative annotations are keyed by
/// display name since that is what the narrative step refers to.
pub trait ReconciliationContext {
    fn authoritative_hp(&self, id: &CombatantId) -> Option<ResourceSnapshot>;

    fn authoritative_ap(&self, id: &CombatantId) -> Option<ResourceSnapshot>;

    fn narrative_effects(&self, _name: &str) -> &[NarrativeEffect] {
        &[]
    }
}

/// The empty context: everything falls back to the persisted ledger.
impl ReconciliationContext for () {
    fn authoritative_hp(&self, _id: &CombatantId) -> Option<ResourceSnapshot> {
        None
    }

    fn authoritative_ap(&self, _id: &CombatantId) -> Option<ResourceSnapshot> {
        None
    }
}

/// Owned reconciliation context built by the caller for one action.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MechanicsContext {
    hp: BTreeMap<CombatantId, ResourceSnapshot>,
    ap: BTreeMap<CombatantId, ResourceSnapshot>,
    /// Keyed by lowercased combatant name.
    narrative: BTreeMap<String, Vec<NarrativeEffect>>,
}

impl MechanicsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hp(mut self, id: impl Into<CombatantId>, current: i32, max: i32) -> Self {
        self.hp.insert(id.into(), ResourceSnapshot::new(current, max));
        self
    }

    pub fn with_ap(mut self, id: impl Into<CombatantId>, current: i32, max: i32) -> Self {
        self.ap.insert(id.into(), ResourceSnapshot::new(current, max));
        self
    }

    pub fn with_narrative(mut self, name: &str, effect: NarrativeEffect) -> Self {
        self.narrative
            .entry(name.to_lowercase())
            .or_default()
            .push(effect);
        self
    }

    /// Normalizes and attaches a raw narrative payload for `name`.
    #[cfg(feature = "serde")]
    pub fn with_narrative_payload(mut self, name: &str, payload: &serde_json::Value) -> Self {
        let effects = NarrativeEffect::from_payload(payload);
        if !effects.is_empty() {
            self.narrative
                .entry(name.to_lowercase())
                .or_default()
                .extend(effects);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.hp.is_empty() && self.ap.is_empty() && self.narrative.is_empty()
    }

    /// Ids with an authoritative hp or ap entry.
    pub fn touched(&self) -> impl Iterator<Item = &CombatantId> {
        let mut ids: Vec<_> = self.hp.keys().chain(self.ap.keys()).collect();
        ids.sort();
        ids.dedup();
        ids.into_iter()
    }
}

impl ReconciliationContext for MechanicsContext {
    fn authoritative_hp(&self, id: &CombatantId) -> Option<ResourceSnapshot> {
        self.hp.get(id).copied()
    }

    fn authoritative_ap(&self, id: &CombatantId) -> Option<ResourceSnapshot> {
        self.ap.get(id).copied()
    }

    fn narrative_effects(&self, name: &str) -> &[NarrativeEffect] {
        self.narrative
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_values() {
        let ctx = MechanicsContext::new()
            .with_hp("hero", 7, 20)
            .with_ap("hero", 1, 3)
            .with_narrative("Hero", NarrativeEffect::condition("winded"));

        let hero = CombatantId::from("hero");
        assert_eq!(ctx.authoritative_hp(&hero), Some(ResourceSnapshot::new(7, 20)));
        assert_eq!(ctx.authoritative_ap(&hero), Some(ResourceSnapshot::new(1, 3)));
        assert_eq!(ctx.narrative_effects("HERO").len(), 1);
        assert_eq!(ctx.touched().count(), 1);
    }

    #[test]
    fn missing_entries_are_none() {
        let ctx = MechanicsContext::new();
        assert!(ctx.is_empty());
        assert_eq!(ctx.authoritative_hp(&CombatantId::from("x")), None);
        assert!(ctx.narrative_effects("x").is_empty());
        assert_eq!(().authoritative_ap(&CombatantId::from("x")), None);
    }
}
