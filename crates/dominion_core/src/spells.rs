//! Active spells and the spell book.
//!
//! A spell is active on a dominion iff it has a record with a remaining
//! duration above zero. Durations are counted down by the tick scheduler,
//! not by this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{SpellClass, SpellData};
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::perks::{PerkValue, SpellPerk};

/// A spell currently affecting a dominion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveSpell {
    /// Spell key.
    pub key: String,
    /// Ticks remaining.
    pub duration: u32,
    /// Dominion that cast it, if not self-cast.
    #[serde(default)]
    pub cast_by: Option<u64>,
}

impl ActiveSpell {
    /// Create a self-cast spell record.
    #[must_use]
    pub fn new(key: impl Into<String>, duration: u32) -> Self {
        Self {
            key: key.into(),
            duration,
            cast_by: None,
        }
    }

    /// Builder: record the caster.
    #[must_use]
    pub fn cast_by(mut self, caster: u64) -> Self {
        self.cast_by = Some(caster);
        self
    }

    /// Whether the spell is still running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.duration > 0
    }
}

/// Set of spell records on one dominion, one per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveSpells(Vec<ActiveSpell>);

impl ActiveSpells {
    /// No spells.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a spell.
    #[must_use]
    pub fn with(mut self, spell: ActiveSpell) -> Self {
        self.apply(spell);
        self
    }

    /// Whether a spell key is active.
    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.0.iter().any(|s| s.key == key && s.is_active())
    }

    /// Apply a spell, refreshing the duration if it is already present.
    pub fn apply(&mut self, spell: ActiveSpell) {
        match self.0.iter_mut().find(|s| s.key == spell.key) {
            Some(existing) => {
                existing.duration = existing.duration.max(spell.duration);
                existing.cast_by = spell.cast_by;
            }
            None => self.0.push(spell),
        }
    }

    /// Active records in insertion order.
    pub fn active(&self) -> impl Iterator<Item = &ActiveSpell> {
        self.0.iter().filter(|s| s.is_active())
    }
}

/// All spell definitions known to the game.
#[derive(Debug, Clone, Default)]
pub struct SpellBook {
    spells: BTreeMap<String, SpellData>,
}

impl SpellBook {
    /// Create an empty spell book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spell definition.
    pub fn register(&mut self, spell: SpellData) {
        self.spells.insert(spell.key.clone(), spell);
    }

    /// Builder: register a spell definition.
    #[must_use]
    pub fn with(mut self, spell: SpellData) -> Self {
        self.register(spell);
        self
    }

    /// Spell definition by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SpellData> {
        self.spells.get(key)
    }

    /// Spell definition by key, failing on unknown keys.
    pub fn require(&self, key: &str) -> Result<&SpellData> {
        self.get(key)
            .ok_or_else(|| GameError::UnknownSpell(key.to_string()))
    }

    /// All definitions in key order.
    pub fn iter(&self) -> impl Iterator<Item = &SpellData> {
        self.spells.values()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spells.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    /// Sum of a scalar perk over every active spell, in percent.
    pub fn perk_value(&self, active: &ActiveSpells, perk: SpellPerk) -> Result<Fixed> {
        let mut total = Fixed::ZERO;
        for spell in active.active() {
            total += self.require(&spell.key)?.perks.value(perk);
        }
        Ok(total)
    }

    /// Sum of a scalar perk over every active spell, as a fraction.
    pub fn perk_multiplier(&self, active: &ActiveSpells, perk: SpellPerk) -> Result<Fixed> {
        Ok(self.perk_value(active, perk)? / Fixed::from_num(100))
    }

    /// Whether any active spell carries a perk.
    pub fn has_perk(&self, active: &ActiveSpells, perk: SpellPerk) -> Result<bool> {
        Ok(self.perk(active, perk)?.is_some())
    }

    /// Value of the first active spell carrying a perk.
    pub fn perk(&self, active: &ActiveSpells, perk: SpellPerk) -> Result<Option<&PerkValue>> {
        for spell in active.active() {
            if let Some(value) = self.require(&spell.key)?.perks.get(perk) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Key of the first active spell carrying a perk.
    pub fn spell_with_perk(&self, active: &ActiveSpells, perk: SpellPerk) -> Result<Option<String>> {
        for spell in active.active() {
            if self.require(&spell.key)?.perks.has(perk) {
                return Ok(Some(spell.key.clone()));
            }
        }
        Ok(None)
    }

    /// Invasion spells a race can cast.
    pub fn invasion_spells<'a>(&'a self, race_key: &'a str) -> impl Iterator<Item = &'a SpellData> {
        self.spells
            .values()
            .filter(move |s| s.class == SpellClass::Invasion && s.available_to(race_key))
    }

    /// Validate every definition.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        self.spells.values().flat_map(SpellData::validate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SpellScope;
    use crate::perks::PerkSet;

    fn spell(key: &str, perks: PerkSet) -> SpellData {
        SpellData {
            key: key.to_string(),
            name: key.to_string(),
            scope: SpellScope::Own,
            class: SpellClass::Active,
            duration: 12,
            perks,
            invasion: None,
            races: Vec::new(),
        }
    }

    #[test]
    fn test_expired_spells_are_inactive() {
        let spells = ActiveSpells::new()
            .with(ActiveSpell::new("bloodrage", 4))
            .with(ActiveSpell::new("crusade", 0));
        assert!(spells.is_active("bloodrage"));
        assert!(!spells.is_active("crusade"));
        assert_eq!(spells.active().count(), 1);
    }

    #[test]
    fn test_apply_refreshes_duration() {
        let mut spells = ActiveSpells::new().with(ActiveSpell::new("plague", 3));
        spells.apply(ActiveSpell::new("plague", 12).cast_by(7));
        let record = spells.active().next().expect("record");
        assert_eq!(record.duration, 12);
        assert_eq!(record.cast_by, Some(7));
    }

    #[test]
    fn test_perk_sums_over_active_spells() {
        let book = SpellBook::new()
            .with(spell(
                "bloodrage",
                PerkSet::new().with(SpellPerk::OffensivePower, "10").expect("perk"),
            ))
            .with(spell(
                "howling",
                PerkSet::new().with(SpellPerk::OffensivePower, "5").expect("perk"),
            ));
        let active = ActiveSpells::new()
            .with(ActiveSpell::new("bloodrage", 5))
            .with(ActiveSpell::new("howling", 5));
        assert_eq!(
            book.perk_value(&active, SpellPerk::OffensivePower).expect("sum"),
            Fixed::from_num(15)
        );
    }

    #[test]
    fn test_unknown_active_spell_is_error() {
        let book = SpellBook::new();
        let active = ActiveSpells::new().with(ActiveSpell::new("mystery", 5));
        assert!(book.perk_value(&active, SpellPerk::Stasis).is_err());
    }
}
