//! Conversions and the army's trip home.

use crate::calculators::{ConversionCalculator, ConversionContext};
use crate::error::InvasionError;
use crate::perks::{slot_from_number, UnitPerk};
use crate::queue::{QueueChannel, QueueResource};
use crate::units::{UnitCounts, UnitSlot};

use super::casualties::dies_into;
use super::{Battle, QueueService};

impl Battle<'_> {
    /// New units from the enemy dead. Defensive conversions show up after a
    /// short training delay; offensive ones travel home with the army.
    pub(super) fn handle_conversions(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let context = ConversionContext {
            land_ratio: self.land_ratio,
            success: self.success,
            units_sent: self.fighting,
            attacker_units_lost: self.report.attacker.units_lost,
            defender_units_lost: self.report.defender.units_lost,
            defender_draftees_lost: self.report.defender.draftees_lost,
        };
        let conversions = ConversionCalculator::new(self.rules, self.spells).conversions(
            self.attacking(),
            self.defending(),
            &context,
        )?;

        if !conversions.defender.is_empty() {
            let deltas: Vec<(QueueResource, i64)> = conversions
                .defender
                .iter()
                .map(|(slot, count)| (QueueResource::Unit(slot), count as i64))
                .collect();
            queue.queue_resources(
                QueueChannel::Training,
                self.defender.id,
                &deltas,
                self.rules.timing.defensive_conversion_ticks,
            );
            self.defender.stats.total_units_converted += conversions.defender.total();
        }
        self.attacker.stats.total_units_converted += conversions.attacker.total();
        self.report.attacker.conversions = conversions.attacker;
        self.report.defender.conversions = conversions.defender;
        Ok(())
    }

    /// Queue survivors, conversions, released captives and risen dead.
    pub(super) fn handle_returning_units(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let surviving = self.report.attacker.surviving_units;
        let converted = self.report.attacker.conversions;

        let mut returning = UnitCounts::ZERO;
        for slot in UnitSlot::ALL {
            let amount = surviving[slot] + converted[slot] + self.released[slot];
            if amount == 0 {
                continue;
            }
            let target = if self.success {
                self.attacker_race.unit(slot)?.perks.slot(UnitPerk::WinsInto)?.unwrap_or(slot)
            } else {
                slot
            };
            returning[target] += amount;
        }
        returning = returning.saturating_add(&dies_into(self.attacker_race, &self.report.attacker.units_lost)?);

        for (slot, amount) in returning.iter() {
            if amount == 0 {
                continue;
            }
            let ticks = self.return_ticks(slot)?;
            let perks = &self.attacker_race.unit(slot)?.perks;
            let paired = match perks.number_at(UnitPerk::FasterReturnIfPaired, 0)? {
                Some(number) => {
                    let partner = slot_from_number(UnitPerk::FasterReturnIfPaired, number)?;
                    let faster = perks
                        .number_at(UnitPerk::FasterReturnIfPaired, 1)?
                        .map_or(0, |n| n.to_num::<i64>());
                    Some((returning[partner].min(amount), faster))
                }
                None => None,
            };

            let resource = QueueResource::Unit(slot);
            match paired {
                Some((fast, faster)) if fast > 0 => {
                    let fast_ticks = (i64::from(ticks) - faster).clamp(1, i64::from(u32::MAX)) as u32;
                    queue.queue_resources(QueueChannel::Invasion, self.attacker.id, &[(resource, fast as i64)], fast_ticks);
                    queue.queue_resources(
                        QueueChannel::Invasion,
                        self.attacker.id,
                        &[(resource, (amount - fast) as i64)],
                        ticks,
                    );
                }
                _ => queue.queue_resources(QueueChannel::Invasion, self.attacker.id, &[(resource, amount as i64)], ticks),
            }
        }

        tracing::debug!(attacker = self.attacker.id, returning = returning.total(), "Units returning");
        self.report.attacker.units_returning = returning;
        Ok(())
    }
}
