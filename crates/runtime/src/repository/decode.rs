//! Schema-tolerant decoding of session records.
//!
//! Records outlive the code that wrote them. Decoding works on a
//! `serde_json::Value` tree and degrades per top-level field, per combatant field,
//! per status effect and per log entry: an unreadable part is defaulted or
//! dropped with a warning and the rest of the session survives. Only a
//! record without a readable `session_id` is rejected.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use combat_core::{
    CombatAction, CombatSession, CombatantId, CombatantState, SessionStatus, StatusEffect,
    StatusEffects,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::{RepositoryError, Result};
use super::record::SessionRecord;

/// `schema_version` assumed for records written before the field existed.
const LEGACY_SCHEMA_VERSION: u32 = 1;

pub(crate) fn decode_record(text: &str, origin: &str) -> Result<SessionRecord> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| RepositoryError::Json(e.to_string()))?;
    let Value::Object(mut root) = value else {
        return Err(RepositoryError::CorruptedData(format!(
            "{origin}: record is not a JSON object"
        )));
    };

    let session_id = root
        .remove("session_id")
        .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            RepositoryError::CorruptedData(format!("{origin}: missing session_id"))
        })?;

    let decoder = Decoder {
        origin,
        session_id: &session_id,
    };

    let campaign_id: String = decoder.field(&mut root, "campaign_id", String::new);
    let schema_version = decoder.field(&mut root, "schema_version", || LEGACY_SCHEMA_VERSION);
    let last_saved: Option<DateTime<Utc>> = decoder.field(&mut root, "last_saved", || None);
    let archived_at: Option<DateTime<Utc>> = decoder.field(&mut root, "archived_at", || None);
    let duration_seconds: Option<i64> = decoder.field(&mut root, "duration_seconds", || None);

    let fallback_time = last_saved.or(archived_at).unwrap_or_else(Utc::now);
    let updated_at = decoder.field(&mut root, "updated_at", || fallback_time);
    let created_at = decoder.field(&mut root, "created_at", || updated_at);

    let combatants = decoder.combatants(root.remove("combatants"));
    let turn_order: Vec<CombatantId> = decoder.field(&mut root, "turn_order", Vec::new);
    let mut current_turn_index: usize = decoder.field(&mut root, "current_turn_index", || 0);
    if !turn_order.is_empty() && current_turn_index >= turn_order.len() {
        tracing::warn!(
            "{}: session {} has turn index {} past a {}-slot turn order; resetting to 0",
            origin,
            session_id,
            current_turn_index,
            turn_order.len()
        );
        current_turn_index = 0;
    }

    let session = CombatSession {
        scene_id: decoder.field(&mut root, "scene_id", String::new),
        status: decoder.field(&mut root, "status", || SessionStatus::InProgress),
        round_number: decoder.field(&mut root, "round_number", || 1u32).max(1),
        turn_order,
        current_turn_index,
        combatants,
        combat_log: decoder.log(root.remove("combat_log")),
        victory_condition: decoder.field(&mut root, "victory_condition", Default::default),
        outcome: decoder.field(&mut root, "outcome", || None),
        created_at,
        updated_at,
        session_id: session_id.clone(),
    };

    for key in root.keys() {
        tracing::debug!("{}: ignoring unknown field {:?}", origin, key);
    }

    Ok(SessionRecord {
        campaign_id,
        schema_version,
        last_saved,
        archived_at,
        duration_seconds,
        session,
    })
}

struct Decoder<'a> {
    origin: &'a str,
    session_id: &'a str,
}

impl Decoder<'_> {
    /// Takes `key` out of `map` and decodes it, defaulting when absent or
    /// unreadable.
    fn field<T, F>(&self, map: &mut Map<String, Value>, key: &str, default: F) -> T
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.field_at(map, key, key, default)
    }

    /// Like [`field`](Self::field), naming the value by `path` in warnings.
    fn field_at<T, F>(&self, map: &mut Map<String, Value>, key: &str, path: &str, default: F) -> T
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match map.remove(key) {
            None | Some(Value::Null) => default(),
            Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
                tracing::warn!(
                    "{}: session {} field {:?} unreadable ({}); using default",
                    self.origin,
                    self.session_id,
                    path,
                    err
                );
                default()
            }),
        }
    }

    fn combatants(&self, value: Option<Value>) -> BTreeMap<CombatantId, CombatantState> {
        let entries = match value {
            Some(Value::Object(entries)) => entries,
            None | Some(Value::Null) => return BTreeMap::new(),
            Some(_) => {
                tracing::warn!(
                    "{}: session {} combatants is not a map; dropping",
                    self.origin,
                    self.session_id
                );
                return BTreeMap::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|(key, value)| self.combatant(key, value))
            .map(|combatant| (combatant.character_id.clone(), combatant))
            .collect()
    }

    /// Decodes one combatant field by field.
    ///
    /// Only a combatant without a readable name, hp or max_hp is dropped;
    /// every other field falls back to its default on its own.
    fn combatant(&self, key: String, value: Value) -> Option<CombatantState> {
        let Value::Object(mut fields) = value else {
            tracing::warn!(
                "{}: session {} combatant {:?} is not an object; dropping",
                self.origin,
                self.session_id,
                key
            );
            return None;
        };

        let (name, hp, max_hp) = match vitals(&mut fields) {
            Ok(vitals) => vitals,
            Err(err) => {
                tracing::warn!(
                    "{}: session {} combatant {:?} unreadable ({}); dropping",
                    self.origin,
                    self.session_id,
                    key,
                    err
                );
                return None;
            }
        };

        let path = |field: &str| format!("combatants.{key}.{field}");
        let effects = self.status_effects(&key, fields.remove("status_effects"));
        let character_id = self.field_at(&mut fields, "character_id", &path("character_id"), || {
            CombatantId::from(key.as_str())
        });

        let mut combatant = CombatantState::new(character_id, name, max_hp);
        combatant.hp = hp;
        combatant.armor_class =
            self.field_at(&mut fields, "armor_class", &path("armor_class"), || 10);
        combatant.level = self.field_at(&mut fields, "level", &path("level"), || 1);
        combatant.is_npc = self.field_at(&mut fields, "is_npc", &path("is_npc"), || false);
        combatant.hostile = self.field_at(&mut fields, "hostile", &path("hostile"), || false);
        combatant.action_points = self.field_at(
            &mut fields,
            "action_points",
            &path("action_points"),
            Default::default,
        );
        combatant.position = self.field_at(&mut fields, "position", &path("position"), || None);
        combatant.combat_stats = self.field_at(
            &mut fields,
            "combat_stats",
            &path("combat_stats"),
            Default::default,
        );
        combatant.has_taken_turn =
            self.field_at(&mut fields, "has_taken_turn", &path("has_taken_turn"), || false);
        combatant.status_effects = effects;

        for field in fields.keys() {
            tracing::debug!("{}: ignoring unknown field {:?}", self.origin, path(field.as_str()));
        }

        sanitize(&mut combatant);
        Some(combatant)
    }

    fn status_effects(&self, owner: &str, value: Option<Value>) -> StatusEffects {
        let items = match value {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => return StatusEffects::empty(),
            Some(_) => {
                tracing::warn!(
                    "{}: session {} combatant {:?} status_effects is not a list; dropping",
                    self.origin,
                    self.session_id,
                    owner
                );
                return StatusEffects::empty();
            }
        };

        StatusEffects::from_effects(items.into_iter().filter_map(|item| {
            let raw = item.to_string();
            serde_json::from_value::<StatusEffect>(item)
                .map_err(|err| {
                    tracing::warn!(
                        "{}: session {} combatant {:?} dropping status effect {} ({})",
                        self.origin,
                        self.session_id,
                        owner,
                        raw,
                        err
                    );
                })
                .ok()
        }))
    }

    fn log(&self, value: Option<Value>) -> Vec<CombatAction> {
        let items = match value {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => return Vec::new(),
            Some(_) => {
                tracing::warn!(
                    "{}: session {} combat_log is not a list; dropping",
                    self.origin,
                    self.session_id
                );
                return Vec::new();
            }
        };

        let total = items.len();
        let log: Vec<CombatAction> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if log.len() < total {
            tracing::warn!(
                "{}: session {} dropped {} unreadable log entries",
                self.origin,
                self.session_id,
                total - log.len()
            );
        }
        log
    }
}

/// Name and hit points: the fields a combatant cannot be rebuilt without.
fn vitals(fields: &mut Map<String, Value>) -> std::result::Result<(String, i32, i32), String> {
    Ok((
        required(fields, "name")?,
        required(fields, "hp")?,
        required(fields, "max_hp")?,
    ))
}

fn required<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    key: &str,
) -> std::result::Result<T, String> {
    match fields.remove(key) {
        None | Some(Value::Null) => Err(format!("missing {key}")),
        Some(value) => serde_json::from_value(value).map_err(|err| format!("{key}: {err}")),
    }
}

/// Re-establishes resource bounds on hand-edited or drifted records.
fn sanitize(combatant: &mut CombatantState) {
    combatant.set_hp_snapshot(combatant.hp_snapshot());
    let ap = &mut combatant.action_points;
    ap.max = ap.max.max(0);
    ap.current = ap.current.clamp(0, ap.max);
    ap.spent_this_turn = ap.spent_this_turn.max(0);
}
