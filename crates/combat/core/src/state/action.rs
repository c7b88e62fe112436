use chrono::{DateTime, Utc};

use super::{CombatantId, StatusEffectKind};

/// Broad category of a resolved action.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionType {
    Attack,
    Spell,
    Move,
    Item,
    Dash,
    Dodge,
    Help,
    Other,
}

/// Immutable combat log entry for one resolved action.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatAction {
    pub actor_id: CombatantId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub target_id: Option<CombatantId>,
    pub action_type: ActionType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ap_cost: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub roll_result: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub damage_dealt: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub success: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub effects_applied: Vec<StatusEffectKind>,
    pub timestamp: DateTime<Utc>,
    pub round_number: u32,
}

impl CombatAction {
    pub fn new(
        actor_id: impl Into<CombatantId>,
        action_type: ActionType,
        round_number: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            target_id: None,
            action_type,
            ap_cost: 0,
            roll_result: None,
            damage_dealt: 0,
            success: false,
            effects_applied: Vec::new(),
            timestamp,
            round_number,
        }
    }

    pub fn targeting(mut self, target: impl Into<CombatantId>) -> Self {
        self.target_id = Some(target.into());
        self
    }

    pub fn costing(mut self, ap_cost: i32) -> Self {
        self.ap_cost = ap_cost;
        self
    }

    pub fn rolled(mut self, roll: i32, success: bool) -> Self {
        self.roll_result = Some(roll);
        self.success = success;
        self
    }

    pub fn dealing(mut self, damage: i32) -> Self {
        self.damage_dealt = damage;
        self
    }

    pub fn applying(mut self, effect: StatusEffectKind) -> Self {
        self.effects_applied.push(effect);
        self
    }
}
