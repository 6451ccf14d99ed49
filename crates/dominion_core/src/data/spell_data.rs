//! Spell definition data.

use serde::{Deserialize, Serialize};

use crate::math::{option_decimal_serde, Fixed};
use crate::perks::{PerkSet, SpellPerk};

/// Who a spell can be cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellScope {
    /// The caster.
    Own,
    /// A realm mate.
    Friendly,
    /// An enemy.
    Hostile,
}

/// Broad spell category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellClass {
    /// Cast by a player and lasts a duration.
    Active,
    /// Always on.
    Passive,
    /// Applied automatically by an invasion.
    Invasion,
    /// Reveals information.
    Info,
}

/// Side of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleSide {
    /// The invader.
    Offense,
    /// The invaded.
    Defense,
}

/// When an invasion spell is cast on the opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvasionTrigger {
    /// Side whose units cast the spell.
    pub side: BattleSide,

    /// `Some(true)`: only on success, `Some(false)`: only on failure,
    /// `None`: always.
    #[serde(default)]
    pub invasion_must_be_successful: Option<bool>,

    /// Minimum OP/DP ratio (offense side) required to cast.
    #[serde(default, with = "option_decimal_serde")]
    pub op_dp_ratio: Option<Fixed>,
}

impl InvasionTrigger {
    /// Whether this trigger fires for an outcome.
    #[must_use]
    pub fn fires(&self, side: BattleSide, success: bool, op_dp_ratio: Fixed) -> bool {
        if self.side != side {
            return false;
        }
        if let Some(required) = self.invasion_must_be_successful {
            if required != success {
                return false;
            }
        }
        match self.op_dp_ratio {
            Some(minimum) => op_dp_ratio >= minimum,
            None => true,
        }
    }
}

/// Data-driven spell definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellData {
    /// Unique key.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Who it can target.
    pub scope: SpellScope,

    /// Category.
    pub class: SpellClass,

    /// Duration in ticks when cast.
    #[serde(default = "default_duration")]
    pub duration: u32,

    /// Named perks.
    #[serde(default)]
    pub perks: PerkSet,

    /// Invasion trigger, for invasion-class spells.
    #[serde(default)]
    pub invasion: Option<InvasionTrigger>,

    /// Race keys allowed to cast it; empty means everyone.
    #[serde(default)]
    pub races: Vec<String>,
}

const fn default_duration() -> u32 {
    12
}

impl SpellData {
    /// Whether a race may use this spell.
    #[must_use]
    pub fn available_to(&self, race_key: &str) -> bool {
        self.races.is_empty() || self.races.iter().any(|r| r == race_key)
    }

    /// Validate the definition.
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for key in self.perks.unknown_keys::<SpellPerk>() {
            errors.push(format!("Spell '{}' has unknown perk '{key}'", self.key));
        }

        match (self.class, &self.invasion) {
            (SpellClass::Invasion, None) => errors.push(format!(
                "Spell '{}' is an invasion spell without an invasion trigger",
                self.key
            )),
            (class, Some(_)) if class != SpellClass::Invasion => errors.push(format!(
                "Spell '{}' has an invasion trigger but is not an invasion spell",
                self.key
            )),
            _ => {}
        }

        if self.duration == 0 && self.class != SpellClass::Passive {
            errors.push(format!("Spell '{}' has zero duration", self.key));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spell_from_ron() {
        let spell: SpellData = ron::from_str(
            r#"SpellData(
                key: "plague",
                name: "Plague",
                scope: hostile,
                class: invasion,
                perks: {"offensive_power": "-5"},
                invasion: Some(InvasionTrigger(
                    side: offense,
                    invasion_must_be_successful: Some(true),
                    op_dp_ratio: Some(1.2),
                )),
            )"#,
        )
        .expect("parse");

        assert_eq!(spell.duration, 12);
        assert!(spell.validate().is_empty());
        assert!(spell.available_to("lizardfolk"));
    }

    #[test]
    fn test_trigger_conditions() {
        let trigger = InvasionTrigger {
            side: BattleSide::Offense,
            invasion_must_be_successful: Some(true),
            op_dp_ratio: Some(Fixed::from_num(1.2)),
        };
        assert!(trigger.fires(BattleSide::Offense, true, Fixed::from_num(1.25)));
        assert!(!trigger.fires(BattleSide::Offense, true, Fixed::from_num(1.1)));
        assert!(!trigger.fires(BattleSide::Offense, false, Fixed::from_num(2)));
        assert!(!trigger.fires(BattleSide::Defense, true, Fixed::from_num(2)));
    }

    #[test]
    fn test_validate_missing_trigger() {
        let spell = SpellData {
            key: "broken".to_string(),
            name: "Broken".to_string(),
            scope: SpellScope::Hostile,
            class: SpellClass::Invasion,
            duration: 12,
            perks: PerkSet::new(),
            invasion: None,
            races: Vec::new(),
        };
        assert_eq!(spell.validate().len(), 1);
    }
}
