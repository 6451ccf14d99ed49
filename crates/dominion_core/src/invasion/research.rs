//! Research points for conquered acres.

use crate::error::InvasionError;
use crate::improvements::Improvement;
use crate::land::BuildingType;
use crate::math::{fx, round_count, Fixed};
use crate::perks::RacePerk;
use crate::queue::{QueueChannel, QueueResource};
use crate::resources::Resource;

use super::{Battle, QueueService};

impl Battle<'_> {
    /// `conquered × first-hit multiplier × points per acre × (1 + race + observatory)`,
    /// arriving with the slowest returning unit. In-realm hits earn nothing.
    pub(super) fn handle_research(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        if !self.success || self.attacker.realm_id == self.defender.realm_id {
            return Ok(());
        }
        let conquered = self.report.attacker.land.as_ref().map_or(0, |l| l.conquered.total());
        if conquered == 0 {
            return Ok(());
        }

        let rules = &self.rules.research;
        let first_hit = !self.defender.recently_invaded_by(
            self.attacker.id,
            self.tick,
            self.rules.timing.recent_invasion_window,
        );
        let per_hit = if first_hit { rules.first_hit_multiplier } else { 1 };
        let observatory = self.attacker.improvements.multiplier(
            Improvement::Observatory,
            self.attacker.total_land(),
            self.attacker.building(BuildingType::Masonry),
        );
        let multiplier = Fixed::ONE + self.attacker_race.perk_multiplier(RacePerk::ResearchPointsPerAcre) + observatory;
        let points = round_count(fx(conquered * per_hit * rules.points_per_acre) * multiplier);

        let ticks = self.slowest_return_ticks(&self.fighting)?;
        queue.queue_resources(
            QueueChannel::Invasion,
            self.attacker.id,
            &[(QueueResource::Resource(Resource::Tech), points as i64)],
            ticks,
        );
        self.attacker.stats.total_research_points_earned += points;
        self.report.attacker.research_points = points;
        Ok(())
    }
}
