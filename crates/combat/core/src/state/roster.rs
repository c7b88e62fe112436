use super::CombatantId;

/// One row of the already-resolved roster snapshot handed over at combat start.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RosterEntry {
    pub character_id: CombatantId,
    pub name: String,
    pub is_player: bool,
    pub hostile: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub initiative: i32,
    pub hp: i32,
    pub max_hp: i32,
    #[cfg_attr(feature = "serde", serde(default = "default_ac"))]
    pub ac: i32,
    #[cfg_attr(feature = "serde", serde(default = "default_level"))]
    pub level: u32,
}

#[cfg(feature = "serde")]
fn default_ac() -> i32 {
    10
}

#[cfg(feature = "serde")]
fn default_level() -> u32 {
    1
}

impl RosterEntry {
    pub fn player(
        character_id: impl Into<CombatantId>,
        name: impl Into<String>,
        hp: i32,
        max_hp: i32,
    ) -> Self {
        Self {
            character_id: character_id.into(),
            name: name.into(),
            is_player: true,
            hostile: false,
            initiative: 0,
            hp,
            max_hp,
            ac: 10,
            level: 1,
        }
    }

    pub fn npc(
        character_id: impl Into<CombatantId>,
        name: impl Into<String>,
        hostile: bool,
        hp: i32,
        max_hp: i32,
    ) -> Self {
        Self {
            is_player: false,
            hostile,
            ..Self::player(character_id, name, hp, max_hp)
        }
    }

    pub fn with_initiative(mut self, initiative: i32) -> Self {
        self.initiative = initiative;
        self
    }

    pub fn with_armor_class(mut self, ac: i32) -> Self {
        self.ac = ac;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }
}
