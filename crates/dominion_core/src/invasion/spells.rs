//! Spells cast automatically by the battle itself.

use crate::data::{BattleSide, SpellData};
use crate::dominion::Dominion;
use crate::error::InvasionError;
use crate::math::Fixed;
use crate::spells::ActiveSpell;

use super::Battle;

impl Battle<'_> {
    /// Offense-triggered spells of the attacker's race land on the defender
    /// and defense-triggered spells of the defender's race land on the
    /// attacker, each with its full duration.
    pub(super) fn handle_invasion_spells(&mut self) -> Result<(), InvasionError> {
        let op_dp_ratio = self.op_dp_ratio();

        let on_defender = triggered(self.spells.invasion_spells(&self.attacker_race.key), BattleSide::Offense, self.success, op_dp_ratio);
        let on_attacker = triggered(self.spells.invasion_spells(&self.defender_race.key), BattleSide::Defense, self.success, op_dp_ratio);

        self.report.attacker.spells_cast = cast(&on_defender, &mut self.defender, self.attacker.id);
        self.report.defender.spells_cast = cast(&on_attacker, &mut self.attacker, self.defender.id);
        Ok(())
    }
}

fn triggered<'s>(
    spells: impl Iterator<Item = &'s SpellData>,
    side: BattleSide,
    success: bool,
    op_dp_ratio: Fixed,
) -> Vec<&'s SpellData> {
    spells
        .filter(|spell| {
            spell
                .invasion
                .as_ref()
                .is_some_and(|trigger| trigger.fires(side, success, op_dp_ratio))
        })
        .collect()
}

fn cast(spells: &[&SpellData], target: &mut Dominion, caster: u64) -> Vec<String> {
    spells
        .iter()
        .map(|spell| {
            target.spells.apply(ActiveSpell::new(spell.key.clone(), spell.duration).cast_by(caster));
            tracing::debug!(spell = %spell.key, target = target.id, caster, "Invasion spell cast");
            spell.key.clone()
        })
        .collect()
}
