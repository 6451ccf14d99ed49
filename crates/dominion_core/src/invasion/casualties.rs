//! Casualties on both sides.

use crate::calculators::CasualtiesCalculator;
use crate::data::RaceData;
use crate::error::InvasionError;
use crate::math::{ceil_count, floor_count, fx, percent, ratio, round_count, Fixed};
use crate::perks::UnitPerk;
use crate::queue::{QueueChannel, QueueResource};
use crate::units::{UnitCounts, UnitSlot};

use super::{Battle, QueueService};

impl Battle<'_> {
    /// Attacker losses.
    ///
    /// On success only the units needed to break the target are exposed:
    /// `round((dp + 1) / (op / sent))`, and each slot loses its share of
    /// that, never more than what is left to kill. Slots with a fixed
    /// casualty rate lose that rate instead. On failure each slot
    /// loses the base percentage of what it sent.
    pub(super) fn handle_offensive_casualties(&mut self) -> Result<(), InvasionError> {
        let calculator = CasualtiesCalculator::new(self.rules, self.spells);
        let context = self.casualty_context();
        let percentage = calculator.offensive_percentage(self.attacking(), self.defending(), &context)?;
        let fighting = self.fighting;
        let total = fighting.total();

        let mut lost = UnitCounts::ZERO;
        if total == 0 {
            self.report.attacker.surviving_units = fighting;
            return Ok(());
        }

        if self.success {
            let per_unit = self.op / fx(total);
            let needed = fx(round_count(ratio(self.dp.saturating_add(Fixed::ONE), per_unit)));
            let mut left = ceil_count(needed * percentage);
            for (slot, count) in fighting.iter() {
                if count == 0 {
                    continue;
                }
                // Fixed-rate slots do not draw from the shared budget.
                lost[slot] = match self.fixed_casualties(slot, count)? {
                    Some(fixed) => fixed,
                    None => {
                        let share = ratio(fx(count), fx(total));
                        let kill = ceil_count(needed * percentage * share).min(left);
                        left -= kill;
                        kill
                    }
                };
            }
        } else {
            for (slot, count) in fighting.iter() {
                if count == 0 {
                    continue;
                }
                lost[slot] = match self.fixed_casualties(slot, count)? {
                    Some(fixed) => fixed,
                    None => ceil_count(fx(count) * percentage),
                };
            }
        }

        for slot in UnitSlot::ALL {
            if lost[slot] == 0 {
                continue;
            }
            let multiplier = calculator.offensive_multiplier(self.attacking(), self.defending(), slot, &context)?;
            lost[slot] = floor_count(fx(lost[slot]) * multiplier).min(fighting[slot]);
        }

        self.attacker.stats.total_units_lost = self.attacker.stats.total_units_lost.saturating_add(&lost);
        self.defender.stats.total_units_killed += lost.total();
        self.report.attacker.units_lost = lost;
        self.report.attacker.surviving_units = fighting.saturating_sub(&lost);
        Ok(())
    }

    /// `ceil(count × fixed%)` for slots with a fixed casualty rate.
    fn fixed_casualties(&self, slot: UnitSlot, count: u64) -> Result<Option<u64>, InvasionError> {
        let perks = &self.attacker_race.unit(slot)?.perks;
        if !perks.has(UnitPerk::FixedCasualties) {
            return Ok(None);
        }
        Ok(Some(ceil_count(fx(count) * percent(perks.value(UnitPerk::FixedCasualties)))))
    }

    /// Defender losses; nothing dies when the attacker is overwhelmed.
    pub(super) fn handle_defensive_casualties(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let calculator = CasualtiesCalculator::new(self.rules, self.spells);
        let context = self.casualty_context();
        let percentage = calculator.defensive_percentage(&context, self.recently_invaded, self.op, self.dp);
        if percentage == Fixed::ZERO {
            return Ok(());
        }
        let spell_multiplier = calculator.defensive_spell_multiplier(self.attacking(), &context)?;

        let draftee_multiplier = calculator.defensive_multiplier(self.defending(), self.attacking(), None, &context)?
            * spell_multiplier
            * calculator.draftee_multiplier(self.attacking())?;
        let draftees_lost = floor_count(fx(self.defender.military.draftees) * percentage * draftee_multiplier)
            .min(self.defender.military.draftees);

        let mut lost = UnitCounts::ZERO;
        for (slot, home) in self.defender.military.units.iter() {
            if home == 0 || self.defender_race.unit(slot)?.defense == Fixed::ZERO {
                continue;
            }
            let multiplier = calculator.defensive_multiplier(self.defending(), self.attacking(), Some(slot), &context)?;
            lost[slot] = floor_count(fx(home) * percentage * multiplier * spell_multiplier).min(home);
        }

        self.defender.military.draftees -= draftees_lost;
        self.defender.military.units = self.defender.military.units.saturating_sub(&lost);

        let risen = dies_into(self.defender_race, &lost)?;
        let deltas: Vec<(QueueResource, i64)> = risen
            .iter()
            .map(|(slot, count)| (QueueResource::Unit(slot), count as i64))
            .collect();
        queue.queue_resources(
            QueueChannel::Training,
            self.defender.id,
            &deltas,
            self.rules.timing.dies_into_ticks,
        );

        let stats = &mut self.defender.stats;
        stats.total_units_lost = stats.total_units_lost.saturating_add(&lost);
        stats.total_draftees_lost += draftees_lost;
        self.attacker.stats.total_units_killed += lost.total() + draftees_lost;
        self.report.defender.units_lost = lost;
        self.report.defender.draftees_lost = draftees_lost;
        Ok(())
    }
}

/// Units that rise from the dead through `dies_into` perks.
pub(super) fn dies_into(race: &RaceData, lost: &UnitCounts) -> Result<UnitCounts, InvasionError> {
    let mut risen = UnitCounts::ZERO;
    for (slot, count) in lost.iter() {
        if count == 0 {
            continue;
        }
        let perks = &race.unit(slot)?.perks;
        if let Some(target) = perks.slot(UnitPerk::DiesInto)? {
            risen[target] += count;
        }
        if let Some(number) = perks.number_at(UnitPerk::DiesIntoMultiple, 0)? {
            let target = crate::perks::slot_from_number(UnitPerk::DiesIntoMultiple, number)?;
            let multiple = perks.number_at(UnitPerk::DiesIntoMultiple, 1)?.unwrap_or(Fixed::ONE);
            risen[target] += floor_count(fx(count) * multiple);
        }
    }
    Ok(risen)
}
