//! Salvage from the fallen and plunder carried home.

use crate::data::RaceData;
use crate::error::InvasionError;
use crate::math::{floor_count, fx, Fixed};
use crate::perks::{PerkAtom, RacePerk, UnitPerk};
use crate::queue::{QueueChannel, QueueResource};
use crate::resources::{Resource, ResourceStock};
use crate::units::UnitCounts;

use super::{Battle, QueueService};

/// Resources recovered from the cost of lost units.
const SALVAGEABLE: [Resource; 3] = [Resource::Ore, Resource::Lumber, Resource::Gems];

impl Battle<'_> {
    /// The defender always salvages its own dead. The attacker salvages and
    /// plunders only on success; both arrive with the army.
    pub(super) fn handle_salvage_and_plunder(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let defender_salvage = salvage(self.defender_race, &self.report.defender.units_lost)?;
        for resource in SALVAGEABLE {
            self.defender.resources.add(resource, defender_salvage[resource]);
        }
        record_salvage(&mut self.defender.stats, &defender_salvage);
        self.report.defender.salvage = defender_salvage;

        if !self.success {
            return Ok(());
        }

        let attacker_salvage = salvage(self.attacker_race, &self.report.attacker.units_lost)?;
        record_salvage(&mut self.attacker.stats, &attacker_salvage);

        let mut plunder = self.plunder_wanted()?;
        for resource in Resource::ALL {
            plunder[resource] = self.defender.resources.take(resource, plunder[resource]);
        }

        let deltas: Vec<(QueueResource, i64)> = Resource::ALL
            .into_iter()
            .map(|resource| {
                let amount = plunder[resource] + attacker_salvage[resource];
                (QueueResource::Resource(resource), amount as i64)
            })
            .collect();
        let ticks = self.slowest_return_ticks(&self.report.attacker.surviving_units)?;
        queue.queue_resources(QueueChannel::Invasion, self.attacker.id, &deltas, ticks);

        let totals = &mut self.attacker.stats.total_plundered;
        for resource in Resource::ALL {
            totals.add(resource, plunder[resource]);
        }
        self.report.attacker.salvage = attacker_salvage;
        self.report.attacker.plunder = plunder;
        Ok(())
    }

    /// Plunder perks of surviving units, before the defender's stock caps them.
    fn plunder_wanted(&self) -> Result<ResourceStock, InvasionError> {
        let mut wanted = ResourceStock::new();
        for (slot, count) in self.report.attacker.surviving_units.iter() {
            if count == 0 {
                continue;
            }
            let perks = &self.attacker_race.unit(slot)?.perks;
            let mut groups = perks.groups(UnitPerk::Plunders);
            let single = perks.list(UnitPerk::Plunder);
            if !single.is_empty() {
                groups.push(single);
            }
            for group in groups {
                let (resource, per_unit) = plunder_entry(&group)?;
                wanted.add(resource, floor_count(fx(count) * per_unit));
            }
        }
        Ok(wanted)
    }
}

/// `resource,per unit`; "gem" is accepted for gems.
fn plunder_entry(group: &[PerkAtom]) -> Result<(Resource, Fixed), InvasionError> {
    let key = group
        .first()
        .map(PerkAtom::as_key)
        .ok_or_else(|| InvasionError::invariant("plunder perk has no resource"))?;
    let key = if key == "gem" { "gems".to_string() } else { key };
    let resource = Resource::from_key(&key)
        .ok_or_else(|| InvasionError::invariant(format!("plunder perk names unknown resource '{key}'")))?;
    let per_unit = group
        .get(1)
        .and_then(PerkAtom::as_number)
        .ok_or_else(|| InvasionError::invariant("plunder perk has no amount"))?;
    Ok((resource, per_unit))
}

/// `lost × unit cost × salvaging` for ore, lumber and gems.
fn salvage(race: &RaceData, lost: &UnitCounts) -> Result<ResourceStock, InvasionError> {
    let mut salvaged = ResourceStock::new();
    let salvaging = race.perk_multiplier(RacePerk::Salvaging);
    if salvaging <= Fixed::ZERO {
        return Ok(salvaged);
    }
    for (slot, count) in lost.iter() {
        if count == 0 {
            continue;
        }
        let cost = race.unit(slot)?.cost;
        for resource in SALVAGEABLE {
            salvaged.add(resource, floor_count(fx(count) * fx(cost.of(resource)) * salvaging));
        }
    }
    Ok(salvaged)
}

fn record_salvage(stats: &mut crate::dominion::DominionStats, salvage: &ResourceStock) {
    stats.total_ore_salvaged += salvage[Resource::Ore];
    stats.total_lumber_salvaged += salvage[Resource::Lumber];
    stats.total_gems_salvaged += salvage[Resource::Gems];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plunder_entry_accepts_gem_alias() {
        let group = vec![PerkAtom::Key("gem".to_string()), PerkAtom::Number(Fixed::from_num(2))];
        let (resource, per_unit) = plunder_entry(&group).expect("entry");
        assert_eq!(resource, Resource::Gems);
        assert_eq!(per_unit, Fixed::from_num(2));
    }

    #[test]
    fn test_plunder_entry_rejects_unknown_resource() {
        let group = vec![PerkAtom::Key("mithril".to_string()), PerkAtom::Number(Fixed::ONE)];
        assert!(plunder_entry(&group).is_err());
    }
}
