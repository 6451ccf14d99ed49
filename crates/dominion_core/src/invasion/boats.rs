//! Boats sent with the army, sunk on either side.

use std::collections::BTreeMap;

use crate::error::InvasionError;
use crate::improvements::Improvement;
use crate::land::BuildingType;
use crate::math::{ceil_count, floor_count, fx, percent, ratio, Fixed};
use crate::perks::UnitPerk;
use crate::queue::{QueueChannel, QueueResource};
use crate::resources::Resource;
use crate::units::UnitCounts;

use super::{Battle, QueueService};

const BOATS: QueueResource = QueueResource::Resource(Resource::Boats);

impl Battle<'_> {
    pub(super) fn handle_boats(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let sent = self.units_sent;
        let mut sinkers = 0u64;
        let mut riders: BTreeMap<u32, u64> = BTreeMap::new();
        for (slot, count) in sent.iter() {
            if count == 0 {
                continue;
            }
            let unit = self.attacker_race.unit(slot)?;
            if unit.perks.has(UnitPerk::SinkBoatsOffense) {
                sinkers += count;
            }
            if unit.need_boat {
                *riders.entry(self.return_ticks(slot)?).or_default() += count;
            }
        }

        if !self.overwhelmed && sinkers > 0 {
            let sunk = self.sink_defender_boats(queue, sinkers, sent.total());
            self.defender.stats.total_boats_lost += sunk;
            self.attacker.stats.total_boats_sunk += sunk;
            self.report.defender.boats_lost = sunk;
        }

        let sink_percentage = self.defensive_sink_percentage()?;
        let capacity = self.attacker_race.boat_capacity.max(1);
        let mut lost = 0u64;
        for (ticks, count) in riders {
            let boats = count / capacity;
            self.attacker.resources.take(Resource::Boats, boats);
            let sunk = ceil_count(fx(boats) * sink_percentage).min(boats);
            lost += sunk;
            queue.queue_resources(
                QueueChannel::Invasion,
                self.attacker.id,
                &[(BOATS, (boats - sunk) as i64)],
                ticks,
            );
        }
        if lost > 0 {
            self.attacker.stats.total_boats_lost += lost;
            self.defender.stats.total_boats_sunk += lost;
            self.report.attacker.boats_lost = lost;
        }
        Ok(())
    }

    /// Sink defender boats, in-transit boats first.
    fn sink_defender_boats(&mut self, queue: &mut dyn QueueService, sinkers: u64, sent: u64) -> u64 {
        let dominion = &self.defender;
        let harbor = dominion.improvements.multiplier(
            Improvement::Harbor,
            dominion.total_land(),
            dominion.building(BuildingType::Masonry),
        );
        let protected = fx(dominion.building(BuildingType::Dock))
            * self.rules.boats.protected_per_dock
            * (Fixed::ONE + harbor);
        let percentage = percent(self.rules.boats.sunk_base_percentage) * ratio(fx(sinkers), fx(sent));

        let queued = queue
            .queue_total_by_resource(QueueChannel::Invasion, dominion.id, BOATS)
            .max(0)
            .unsigned_abs();
        let total = fx(dominion.resources[Resource::Boats].saturating_add(queued));
        let sunk = floor_count((total - protected).max(Fixed::ZERO) * percentage);

        let from_queue = queue.dequeue_resource(QueueChannel::Invasion, self.defender.id, BOATS, sunk.min(queued));
        let from_stock = self.defender.resources.take(Resource::Boats, sunk - from_queue);
        from_queue + from_stock
    }

    /// Share of returning boats the defender's units sink.
    fn defensive_sink_percentage(&self) -> Result<Fixed, InvasionError> {
        let home: UnitCounts = self.defender.military.units;
        let mut sinkers = 0u64;
        for (slot, count) in home.iter() {
            if count > 0 && self.defender_race.unit(slot)?.perks.has(UnitPerk::SinkBoatsDefense) {
                sinkers += count;
            }
        }
        if sinkers == 0 {
            return Ok(Fixed::ZERO);
        }
        Ok(percent(self.rules.boats.sunk_base_percentage) * ratio(fx(sinkers), fx(home.total())))
    }
}
