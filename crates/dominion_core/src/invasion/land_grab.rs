//! Land and buildings changing hands on a successful invasion.

use crate::calculators::{LandCalculator, PowerKind};
use crate::error::InvasionError;
use crate::factions::Capability;
use crate::land::{LandHoldings, LandType};
use crate::math::{floor_count, fx, percent, ratio, round_count, Fixed};
use crate::perks::{slot_from_number, PerkAtom, RacePerk, SpellPerk};
use crate::queue::{QueueChannel, QueueResource};
use crate::resources::Resource;

use super::{Battle, LandReport, QueueService};

impl Battle<'_> {
    pub(super) fn handle_land_grab(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        if !self.success {
            return Ok(());
        }

        let calculator = LandCalculator::new(self.rules);
        let acres = calculator.acres_conquered(self.attacker.total_land(), self.land_ratio);
        let land_lost = LandCalculator::land_lost(&self.defender, acres);
        let burn_multiplier = self.extra_burn_multiplier()?;
        let discovers = self.discovers_land();
        let non_player = self.defender_race.has_capability(Capability::NonPlayer);

        let mut report = LandReport {
            home_land_type: Some(self.attacker_race.home_land_type),
            ..LandReport::default()
        };
        let mut buildings_lost = Vec::new();
        let mut burned = 0u64;

        for (land, lost) in land_lost.iter() {
            if lost == 0 {
                continue;
            }
            for mut loss in LandCalculator::buildings_lost(&self.defender, &*queue, land, lost) {
                if let Some(multiplier) = burn_multiplier {
                    let standing = self.defender.building(loss.building);
                    let boosted = floor_count(fx(loss.built) * multiplier).min(standing);
                    burned += boosted.saturating_sub(loss.built);
                    loss.built = boosted.max(loss.built);
                }
                self.defender.buildings.remove(loss.building, loss.built);
                if loss.constructing > 0 {
                    queue.dequeue_resource(
                        QueueChannel::Construction,
                        self.defender.id,
                        QueueResource::Building(loss.building),
                        loss.constructing,
                    );
                }
                buildings_lost.push(loss);
            }
            self.defender.land[land] -= lost;

            report.conquered[land] = lost;
            if discovers {
                report.discovered[land] = if non_player {
                    round_count(ratio(fx(lost), fx(self.rules.land.non_player_discovery_divisor)))
                } else {
                    lost
                };
            }
        }

        if discovers {
            report.extra_discovered = self.extra_land_discovered(report.conquered.total())?;
        }

        let gained = gained_per_land_type(&report, self.attacker_race.home_land_type);
        let deltas: Vec<(QueueResource, i64)> = gained
            .iter()
            .map(|(land, acres)| (QueueResource::Land(land), acres as i64))
            .collect();
        queue.queue_resources(
            QueueChannel::Invasion,
            self.attacker.id,
            &deltas,
            self.rules.timing.land_return_ticks,
        );

        let destroyed: u64 = buildings_lost.iter().map(|l| l.built + l.constructing).sum();
        let conquered = report.conquered.total();
        self.defender.stats.total_land_lost += conquered;
        let stats = &mut self.attacker.stats;
        stats.total_land_conquered += conquered;
        stats.total_land_discovered += report.discovered.total() + report.extra_discovered;
        stats.total_buildings_destroyed += destroyed;

        tracing::debug!(
            attacker = self.attacker.id,
            defender = self.defender.id,
            conquered,
            discovered = report.discovered.total(),
            extra = report.extra_discovered,
            "Land grabbed"
        );

        self.report.defender.land_lost = report.conquered;
        self.report.defender.buildings_lost = buildings_lost;
        self.report.defender.buildings_burned = burned;
        self.report.attacker.land = Some(report);
        Ok(())
    }

    /// Land is discovered on hits at or above the discovery ratio, unless
    /// this attacker already hit the target recently.
    fn discovers_land(&self) -> bool {
        self.land_ratio >= self.rules.land.discovery_ratio
            && !self.defender.recently_invaded_by(
                self.attacker.id,
                self.tick,
                self.rules.timing.recent_invasion_window,
            )
    }

    fn extra_land_discovered(&self, conquered: u64) -> Result<u64, InvasionError> {
        let bonus = self.attacker_race.perk_multiplier(RacePerk::ExtraLandDiscovered)
            + self.spells.perk_multiplier(&self.attacker.spells, SpellPerk::LandDiscovered)?;
        Ok(floor_count(fx(conquered) * bonus.max(Fixed::ZERO)))
    }

    /// `1 + extra` when the attacker's burning spell applies: the target
    /// builds with lumber and the named slot carries enough of the raw OP.
    fn extra_burn_multiplier(&self) -> Result<Option<Fixed>, InvasionError> {
        let Some(value) = self.spells.perk(&self.attacker.spells, SpellPerk::BurnsExtraBuildings)? else {
            return Ok(None);
        };
        if !self.defender_race.builds_with(Resource::Lumber) {
            return Ok(None);
        }
        let list = value.as_list();
        let number = |index: usize| {
            list.get(index).and_then(PerkAtom::as_number).ok_or_else(|| {
                InvasionError::invariant("burns_extra_buildings expects slot,min share,extra")
            })
        };
        let slot = slot_from_number(SpellPerk::BurnsExtraBuildings, number(0)?)?;
        let minimum_share = number(1)?;
        let extra = number(2)?;

        let military = self.military();
        let context = self.power_context();
        let raw = military.raw_power(self.attacking(), PowerKind::Offense, &self.fighting, context)?;
        if raw == Fixed::ZERO || self.fighting[slot] == 0 {
            return Ok(None);
        }
        let slot_power = fx(self.fighting[slot])
            * military.unit_power(self.attacking(), slot, PowerKind::Offense, &self.fighting, context)?;
        if ratio(slot_power, raw) * Fixed::from_num(100) < minimum_share {
            return Ok(None);
        }
        Ok(Some(Fixed::ONE + percent(extra)))
    }
}

/// Acres queued for the attacker per land type.
fn gained_per_land_type(report: &LandReport, home: LandType) -> LandHoldings {
    let mut gained = LandHoldings::new();
    for land in LandType::ALL {
        gained[land] = report.conquered[land] + report.discovered[land];
    }
    gained[home] += report.extra_discovered;
    gained
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_land_lands_on_home_type() {
        let report = LandReport {
            conquered: LandHoldings::new().with(LandType::Plain, 30).with(LandType::Forest, 10),
            discovered: LandHoldings::new().with(LandType::Plain, 30).with(LandType::Forest, 10),
            extra_discovered: 4,
            home_land_type: Some(LandType::Mountain),
        };
        let gained = gained_per_land_type(&report, LandType::Mountain);
        assert_eq!(gained[LandType::Plain], 60);
        assert_eq!(gained[LandType::Forest], 20);
        assert_eq!(gained[LandType::Mountain], 4);
        assert_eq!(gained.total(), report.total_gained());
    }
}
