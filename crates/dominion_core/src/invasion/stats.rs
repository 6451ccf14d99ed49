//! Win/loss counters and invasion history.

use crate::dominion::RecentInvasion;

use super::Battle;

impl Battle<'_> {
    /// Runs last so earlier handlers still see the history without this hit.
    pub(super) fn handle_stats(&mut self) {
        if self.success {
            if self.land_ratio >= self.rules.land.victory_ratio {
                self.attacker.stats.attacking_success += 1;
            } else {
                self.attacker.stats.attacking_bottomfeeds += 1;
            }
            self.defender.stats.defending_failures += 1;

            let invasion = RecentInvasion {
                attacker: self.attacker.id,
                tick: self.tick,
            };
            self.defender.invasions_received.push(invasion);
            self.realm_effects.invasion_received = Some((self.defender.realm_id, invasion));
        } else {
            if self.overwhelmed {
                self.attacker.stats.attacking_failures += 1;
            } else {
                self.attacker.stats.attacking_razes += 1;
            }
            self.defender.stats.defending_success += 1;
            self.realm_effects.defending_success = Some(self.defender.realm_id);
        }

        self.defender.stats.total_units_mind_controlled += self.controlled.total();
    }
}
