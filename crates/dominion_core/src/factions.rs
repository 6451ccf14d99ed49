//! Faction capabilities and alignment.
//!
//! Race-specific mechanics are switched on by capabilities listed in the
//! race data file, never by comparing race names.

use serde::{Deserialize, Serialize};

/// A faction-specific mechanic a race opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Collects souls, blood and food from battle.
    SoulCollection,
    /// Fallen slot 1 units become champions on overwhelming victories.
    ChampionCreation,
    /// Zealots slay immortal units and destroy souls.
    ImmortalSlaying,
    /// Can only invade through an open portal.
    RequiresPortal,
    /// Bodies of the fallen fill the realm crypt.
    ImperialCrypt,
    /// Non-player faction: attackers earn reduced prestige and land.
    NonPlayer,
}

impl Capability {
    /// Display name for this capability.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::SoulCollection => "Soul Collection",
            Self::ChampionCreation => "Champion Creation",
            Self::ImmortalSlaying => "Immortal Slaying",
            Self::RequiresPortal => "Portal Invasions",
            Self::ImperialCrypt => "Imperial Crypt",
            Self::NonPlayer => "Non-Player Faction",
        }
    }
}

/// Moral alignment of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Good.
    Good,
    /// Neither.
    #[default]
    Neutral,
    /// Evil.
    Evil,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_ron_names() {
        let caps: Vec<Capability> =
            ron::from_str("[SoulCollection, RequiresPortal]").expect("parse");
        assert_eq!(caps, vec![Capability::SoulCollection, Capability::RequiresPortal]);
        assert_eq!(caps[0].display_name(), "Soul Collection");
    }
}
