//! Prestige changes for both sides.
//!
//! Tiers by land ratio `r`:
//!
//! | Outcome                   | Attacker          | Defender  |
//! |---------------------------|-------------------|-----------|
//! | overwhelmed               | −20               | 0         |
//! | `r` in the loss zone      | −20               | 0         |
//! | success, full zone        | `60 · r · LDA`    | `−20 · r` |
//! | raze, full zone           | 0                 | +10       |
//! | anything else             | 0                 | 0         |
//!
//! LDA is the low-numbers mitigation for attackers with few lifetime wins.

use crate::error::InvasionError;
use crate::factions::Capability;
use crate::math::{fx, fxi, percent, ratio, round_signed, Fixed};
use crate::perks::{RacePerk, TechPerk, UnitPerk};
use crate::queue::{QueueChannel, QueueResource};

use super::{Battle, QueueService};

impl Battle<'_> {
    pub(super) fn handle_prestige(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let rules = &self.rules.prestige;
        let r = self.land_ratio;
        let in_full_zone = r >= rules.full_zone_from && r < rules.full_zone_below;

        let (mut attacker_change, mut defender_change) = if self.overwhelmed {
            (fxi(-rules.failure_penalty), Fixed::ZERO)
        } else if r < rules.loss_zone_below {
            (fxi(-rules.bottomfeed_penalty), Fixed::ZERO)
        } else if self.success && in_full_zone {
            (
                rules.victory_gain * r * self.low_numbers_mitigation(),
                -(rules.victory_defender_loss * r),
            )
        } else if !self.success && in_full_zone {
            (Fixed::ZERO, fxi(rules.raze_defender_gain))
        } else {
            (Fixed::ZERO, Fixed::ZERO)
        };

        let recent = ratio(fx(self.recently_invaded), fx(rules.recent_invasion_divisor));
        let recent_multiplier = (Fixed::ONE - recent).max(rules.recent_invasion_floor);
        attacker_change *= recent_multiplier;
        defender_change *= recent_multiplier;

        if attacker_change > Fixed::ZERO {
            attacker_change *= Fixed::ONE + self.prestige_gains()?;
        }
        if self.defender_race.has_capability(Capability::NonPlayer) {
            attacker_change /= fx(rules.non_player_divisor.max(1));
        }

        let attacker_change = round_signed(attacker_change);
        let defender_change = round_signed(defender_change);

        if attacker_change != 0 {
            if self.success {
                let ticks = self.slowest_return_ticks(&self.fighting)?;
                queue.queue_resources(
                    QueueChannel::Invasion,
                    self.attacker.id,
                    &[(QueueResource::Prestige, attacker_change)],
                    ticks,
                );
            } else {
                self.attacker.prestige += attacker_change;
            }
            record(&mut self.attacker.stats, attacker_change);
        }
        if defender_change != 0 {
            self.defender.prestige += defender_change;
            record(&mut self.defender.stats, defender_change);
        }

        self.report.attacker.prestige_change = attacker_change;
        self.report.defender.prestige_change = defender_change;
        Ok(())
    }

    /// `successes / (successes + defending failures)` below the threshold, else 1.
    fn low_numbers_mitigation(&self) -> Fixed {
        let stats = &self.attacker.stats;
        if stats.attacking_success >= self.rules.prestige.low_numbers_threshold {
            return Fixed::ONE;
        }
        let total = stats.attacking_success + stats.defending_failures;
        if total == 0 {
            return Fixed::ONE;
        }
        ratio(fx(stats.attacking_success), fx(total))
    }

    /// Race, tech and unit prestige gains as a fraction.
    fn prestige_gains(&self) -> Result<Fixed, InvasionError> {
        let mut gains = self.attacker_race.perk_multiplier(RacePerk::PrestigeGains)
            + self.attacker.tech_perks.multiplier(TechPerk::PrestigeGains);
        let total = self.fighting.total();
        for (slot, count) in self.fighting.iter() {
            if count == 0 {
                continue;
            }
            let perk = self.attacker_race.unit(slot)?.perks.value(UnitPerk::PrestigeGains);
            gains += percent(perk) * ratio(fx(count), fx(total));
        }
        Ok(gains)
    }
}

fn record(stats: &mut crate::dominion::DominionStats, change: i64) {
    if change > 0 {
        stats.total_prestige_gained += change.unsigned_abs();
    } else {
        stats.total_prestige_lost += change.unsigned_abs();
    }
}
