use std::fmt;

/// Stable identifier of a combatant within a session.
///
/// Identifiers come from the roster snapshot (character sheet ids, NPC ids,
/// summon ids) and are never reassigned during an encounter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CombatantId(pub String);

impl CombatantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CombatantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CombatantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Session identifier for a single encounter.
pub type SessionId = String;

/// Identifier of the campaign that owns a session.
pub type CampaignId = String;

/// Discrete battlefield position expressed in grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::ORIGIN
    }
}

/// A `current/max` pair for a bounded resource (HP, AP).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceSnapshot {
    pub current: i32,
    pub max: i32,
}

impl ResourceSnapshot {
    pub const fn new(current: i32, max: i32) -> Self {
        Self { current, max }
    }

    /// Returns a copy with `max >= 0` and `0 <= current <= max`.
    pub fn clamped(self) -> Self {
        let max = self.max.max(0);
        Self {
            current: self.current.clamp(0, max),
            max,
        }
    }
}

impl fmt::Display for ResourceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.max)
    }
}
