//! Narrative-effect annotations.
//!
//! The narrative step reports effects in whatever shape it produced: a bare
//! string, a structured object, a free-form mapping, or a list of those.
//! Everything is normalized here into [`NarrativeEffect`] so downstream code
//! never branches on payload shape.

/// A normalized narrative annotation. Display-only: never a write path for
/// hp, ap or structured status effects.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum NarrativeEffect {
    /// A named condition the narrator described ("pinned under rubble").
    Condition {
        label: String,
        duration_rounds: Option<u32>,
    },
    /// Free text with no recognizable structure.
    Note { text: String },
}

impl NarrativeEffect {
    pub fn condition(label: impl Into<String>) -> Self {
        Self::Condition {
            label: label.into(),
            duration_rounds: None,
        }
    }

    pub fn note(text: impl Into<String>) -> Self {
        Self::Note { text: text.into() }
    }

    /// The bare name used for duplicate detection.
    pub fn key(&self) -> &str {
        match self {
            Self::Condition { label, .. } => label,
            Self::Note { text } => text,
        }
    }

    /// Display label.
    pub fn label(&self) -> String {
        match self {
            Self::Condition {
                label,
                duration_rounds: Some(1),
            } => format!("{label} (1 round)"),
            Self::Condition {
                label,
                duration_rounds: Some(rounds),
            } => format!("{label} ({rounds} rounds)"),
            Self::Condition { label, .. } => label.clone(),
            Self::Note { text } => text.clone(),
        }
    }
}

#[cfg(feature = "serde")]
mod normalize {
    use serde_json::{Map, Value};

    use super::NarrativeEffect;

    const LABEL_KEYS: [&str; 4] = ["type", "name", "effect", "condition"];
    const DURATION_KEYS: [&str; 3] = ["duration_rounds", "duration", "rounds"];

    impl NarrativeEffect {
        /// Normalizes a loosely-typed payload. Unusable parts are dropped.
        pub fn from_payload(payload: &Value) -> Vec<NarrativeEffect> {
            let mut out = Vec::new();
            collect(payload, &mut out);
            out
        }
    }

    fn collect(payload: &Value, out: &mut Vec<NarrativeEffect>) {
        match payload {
            Value::String(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push(NarrativeEffect::condition(text));
                }
            }
            Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
            Value::Object(map) => match structured(map) {
                Some(effect) => out.push(effect),
                None => freeform(map, out),
            },
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    fn structured(map: &Map<String, Value>) -> Option<NarrativeEffect> {
        let label = LABEL_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|label| !label.is_empty())?;

        let duration_rounds = DURATION_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_u64))
            .and_then(|rounds| u32::try_from(rounds).ok());

        Some(NarrativeEffect::Condition {
            label: label.to_string(),
            duration_rounds,
        })
    }

    fn freeform(map: &Map<String, Value>, out: &mut Vec<NarrativeEffect>) {
        for (key, value) in map {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            match value {
                Value::Bool(true) => out.push(NarrativeEffect::condition(key)),
                Value::String(detail) if !detail.trim().is_empty() => {
                    out.push(NarrativeEffect::note(format!("{key}: {}", detail.trim())))
                }
                Value::Number(n) => out.push(NarrativeEffect::note(format!("{key}: {n}"))),
                _ => {}
            }
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_string_becomes_condition() {
        assert_eq!(
            NarrativeEffect::from_payload(&json!("  knocked prone ")),
            vec![NarrativeEffect::condition("knocked prone")]
        );
    }

    #[test]
    fn structured_object_keeps_duration() {
        let effects = NarrativeEffect::from_payload(&json!({
            "type": "Entangled",
            "duration": 2,
            "source": "vines"
        }));
        assert_eq!(
            effects,
            vec![NarrativeEffect::Condition {
                label: "Entangled".into(),
                duration_rounds: Some(2),
            }]
        );
        assert_eq!(effects[0].label(), "Entangled (2 rounds)");
    }

    #[test]
    fn freeform_mapping_becomes_notes_and_flags() {
        let effects = NarrativeEffect::from_payload(&json!({
            "dazed": true,
            "morale": "shaken",
            "hidden": false,
            "bruises": 3
        }));

        assert!(effects.contains(&NarrativeEffect::condition("dazed")));
        assert!(effects.contains(&NarrativeEffect::note("morale: shaken")));
        assert!(effects.contains(&NarrativeEffect::note("bruises: 3")));
        assert_eq!(effects.len(), 3);
    }

    #[test]
    fn lists_are_flattened_and_junk_dropped() {
        let effects = NarrativeEffect::from_payload(&json!([
            "singed",
            null,
            42,
            {"name": ""},
            {"condition": "Blinded", "rounds": 1}
        ]));
        assert_eq!(
            effects,
            vec![
                NarrativeEffect::condition("singed"),
                NarrativeEffect::Condition {
                    label: "Blinded".into(),
                    duration_rounds: Some(1),
                },
            ]
        );
    }
}
