//! Tunable invasion constants.
//!
//! Every section deserializes with defaults, so a rules file only needs to
//! name the values it changes:
//!
//! ```ron
//! InvasionRules(
//!     casualties: (offensive_base: 9.0),
//!     morale: (minimum_to_invade: 40),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{decimal_serde, Fixed};

/// All invasion constants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvasionRules {
    /// Battle outcome and power rules.
    pub battle: BattleRules,
    /// Casualty percentages.
    pub casualties: CasualtyRules,
    /// Morale thresholds and changes.
    pub morale: MoraleRules,
    /// Prestige tiers and amounts.
    pub prestige: PrestigeRules,
    /// Boat sinking.
    pub boats: BoatRules,
    /// Range and land grab.
    pub land: LandRules,
    /// Queue delays and recency window.
    pub timing: TimingRules,
    /// Research point grants.
    pub research: ResearchRules,
    /// Faction mechanics.
    pub factions: FactionRules,
}

impl InvasionRules {
    /// Parse rules from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: "<rules>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load rules from a RON file.
    pub fn load(path: &Path) -> Result<Self> {
        crate::registry::read_ron(path)
    }

    /// Validate internal consistency.
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.land.range_min >= self.land.range_max {
            errors.push("land.range_min must be below land.range_max".to_string());
        }
        if self.casualties.defensive_base > self.casualties.defensive_max {
            errors.push("casualties.defensive_base exceeds casualties.defensive_max".to_string());
        }
        if self.battle.home_defense_denominator == 0 {
            errors.push("battle.home_defense_denominator must be positive".to_string());
        }
        if self.timing.unit_return_ticks == 0 {
            errors.push("timing.unit_return_ticks must be positive".to_string());
        }
        let mut previous = Fixed::ZERO;
        for band in &self.morale.success_bands {
            if band.below <= previous {
                errors.push("morale.success_bands must be strictly ascending".to_string());
                break;
            }
            previous = band.below;
        }
        if !(self.prestige.loss_zone_below <= self.prestige.full_zone_from
            && self.prestige.full_zone_from < self.prestige.full_zone_below)
        {
            errors.push("prestige zones must be ordered loss < full start < full end".to_string());
        }

        errors
    }
}

/// Battle outcome and power rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleRules {
    /// OP deficit (percent of DP) at which a failure is overwhelmed.
    #[serde(with = "decimal_serde")]
    pub overwhelmed_percentage: Fixed,
    /// Minimum raw DP per acre.
    #[serde(with = "decimal_serde")]
    pub minimum_defense_per_acre: Fixed,
    /// Raw DP per draftee.
    #[serde(with = "decimal_serde")]
    pub draftee_defense: Fixed,
    /// Raw DP contributed by each captured invader.
    #[serde(with = "decimal_serde")]
    pub mind_controlled_defense: Fixed,
    /// DP modifier reduction per temple share (2 = 2% per 1%).
    #[serde(with = "decimal_serde")]
    pub temple_reduction_per_share: Fixed,
    /// Maximum temple reduction as a fraction.
    #[serde(with = "decimal_serde")]
    pub temple_max_reduction: Fixed,
    /// OP bonus per percent of gryphon nests.
    #[serde(with = "decimal_serde")]
    pub gryphon_nest_per_percent: Fixed,
    /// Maximum gryphon nest OP bonus in percent.
    #[serde(with = "decimal_serde")]
    pub gryphon_nest_max: Fixed,
    /// DP bonus per percent of guard towers.
    #[serde(with = "decimal_serde")]
    pub guard_tower_per_percent: Fixed,
    /// Maximum guard tower DP bonus in percent.
    #[serde(with = "decimal_serde")]
    pub guard_tower_max: Fixed,
    /// OP may be at most `numerator / denominator` of the DP left home.
    pub home_defense_numerator: u64,
    /// See `home_defense_numerator`.
    pub home_defense_denominator: u64,
    /// Percentage of captured invaders released after battle.
    #[serde(with = "decimal_serde")]
    pub mind_control_release_percentage: Fixed,
    /// Stun percentage per OP/DP ratio.
    #[serde(with = "decimal_serde")]
    pub stun_ratio: Fixed,
    /// Maximum stun percentage.
    #[serde(with = "decimal_serde")]
    pub stun_max_percentage: Fixed,
    /// Units with at least this raw DP cannot be stunned.
    #[serde(with = "decimal_serde")]
    pub stun_max_defense: Fixed,
}

impl Default for BattleRules {
    fn default() -> Self {
        Self {
            overwhelmed_percentage: Fixed::from_num(15),
            minimum_defense_per_acre: Fixed::from_num(1.5),
            draftee_defense: Fixed::ONE,
            mind_controlled_defense: Fixed::from_num(2),
            temple_reduction_per_share: Fixed::from_num(2),
            temple_max_reduction: Fixed::from_num(0.4),
            gryphon_nest_per_percent: Fixed::from_num(1.6),
            gryphon_nest_max: Fixed::from_num(32),
            guard_tower_per_percent: Fixed::from_num(1.6),
            guard_tower_max: Fixed::from_num(32),
            home_defense_numerator: 4,
            home_defense_denominator: 3,
            mind_control_release_percentage: Fixed::from_num(90),
            stun_ratio: Fixed::ONE,
            stun_max_percentage: Fixed::from_num(2.5),
            stun_max_defense: Fixed::from_num(10),
        }
    }
}

/// Casualty percentages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasualtyRules {
    /// Base offensive casualties in percent.
    #[serde(with = "decimal_serde")]
    pub offensive_base: Fixed,
    /// Multiplier on offensive casualties when overwhelmed.
    #[serde(with = "decimal_serde")]
    pub overwhelmed_multiplier: Fixed,
    /// Base defensive casualties in percent.
    #[serde(with = "decimal_serde")]
    pub defensive_base: Fixed,
    /// Cap on defensive casualties in percent.
    #[serde(with = "decimal_serde")]
    pub defensive_max: Fixed,
    /// Floor of the recent-invasion reduction on defensive casualties.
    #[serde(with = "decimal_serde")]
    pub recent_invasion_floor: Fixed,
    /// Recent invasions that reduce defensive casualties to the floor.
    pub recent_invasion_divisor: u64,
    /// Cap on combined casualty reductions in percent.
    #[serde(with = "decimal_serde")]
    pub maximum_reduction: Fixed,
}

impl Default for CasualtyRules {
    fn default() -> Self {
        Self {
            offensive_base: Fixed::from_num(8.5),
            overwhelmed_multiplier: Fixed::from_num(2),
            defensive_base: Fixed::from_num(4.5),
            defensive_max: Fixed::from_num(6),
            recent_invasion_floor: Fixed::from_num(0.1),
            recent_invasion_divisor: 10,
            maximum_reduction: Fixed::from_num(90),
        }
    }
}

/// One success band of the attacker morale table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoraleBand {
    /// Applies when the land ratio is below this value.
    #[serde(with = "decimal_serde")]
    pub below: Fixed,
    /// Morale change for the attacker.
    pub change: i64,
}

/// Morale thresholds and changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoraleRules {
    /// Minimum morale required to invade.
    pub minimum_to_invade: u32,
    /// Morale cap used by power multipliers.
    pub maximum: u32,
    /// Attacker change on success, by ascending land ratio band.
    pub success_bands: Vec<MoraleBand>,
    /// Attacker change on success above every band.
    pub success_top: i64,
    /// Attacker change when overwhelmed.
    pub overwhelmed_attacker: i64,
    /// Attacker change on a failure that is not overwhelmed.
    pub failure_attacker: i64,
    /// Defender change on a failure that is not overwhelmed.
    pub failure_defender: i64,
}

impl Default for MoraleRules {
    fn default() -> Self {
        let band = |below: f64, change| MoraleBand {
            below: Fixed::from_num(below),
            change,
        };
        Self {
            minimum_to_invade: 50,
            maximum: 100,
            success_bands: vec![
                band(0.60, -15),
                band(0.75, 0),
                band(0.85, 15),
                band(1.00, 20),
            ],
            success_top: 25,
            overwhelmed_attacker: -20,
            failure_attacker: -10,
            failure_defender: 10,
        }
    }
}

/// Prestige tiers and amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrestigeRules {
    /// Below this land ratio a success only costs prestige.
    #[serde(with = "decimal_serde")]
    pub loss_zone_below: Fixed,
    /// Start of the full-effect zone.
    #[serde(with = "decimal_serde")]
    pub full_zone_from: Fixed,
    /// End (exclusive) of the full-effect zone.
    #[serde(with = "decimal_serde")]
    pub full_zone_below: Fixed,
    /// Attacker gain per unit of land ratio on victory.
    #[serde(with = "decimal_serde")]
    pub victory_gain: Fixed,
    /// Defender loss per unit of land ratio on victory.
    #[serde(with = "decimal_serde")]
    pub victory_defender_loss: Fixed,
    /// Attacker loss for a success in the loss zone.
    pub bottomfeed_penalty: i64,
    /// Attacker loss when overwhelmed.
    pub failure_penalty: i64,
    /// Defender gain when repelling a raze above the full-zone start.
    pub raze_defender_gain: i64,
    /// Lifetime successes below which gains are scaled down.
    pub low_numbers_threshold: u64,
    /// Floor of the recently-invaded multiplier.
    #[serde(with = "decimal_serde")]
    pub recent_invasion_floor: Fixed,
    /// Recent invasions that take the multiplier to its floor.
    pub recent_invasion_divisor: u64,
    /// Divisor applied to attacker prestige against non-player targets.
    pub non_player_divisor: u64,
}

impl Default for PrestigeRules {
    fn default() -> Self {
        Self {
            loss_zone_below: Fixed::from_num(0.66),
            full_zone_from: Fixed::from_num(0.75),
            full_zone_below: Fixed::from_num(1.20),
            victory_gain: Fixed::from_num(60),
            victory_defender_loss: Fixed::from_num(20),
            bottomfeed_penalty: 20,
            failure_penalty: 20,
            raze_defender_gain: 10,
            low_numbers_threshold: 10,
            recent_invasion_floor: Fixed::ONE,
            recent_invasion_divisor: 10,
            non_player_divisor: 3,
        }
    }
}

/// Boat sinking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoatRules {
    /// Base percentage of boats sunk by a force made entirely of sinkers.
    #[serde(with = "decimal_serde")]
    pub sunk_base_percentage: Fixed,
    /// Boats protected per dock.
    #[serde(with = "decimal_serde")]
    pub protected_per_dock: Fixed,
}

impl Default for BoatRules {
    fn default() -> Self {
        Self {
            sunk_base_percentage: Fixed::from_num(5),
            protected_per_dock: Fixed::from_num(2.5),
        }
    }
}

/// Range and land grab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandRules {
    /// Smallest land ratio in range.
    #[serde(with = "decimal_serde")]
    pub range_min: Fixed,
    /// Largest land ratio in range.
    #[serde(with = "decimal_serde")]
    pub range_max: Fixed,
    /// Land ratio separating victories from bottomfeeds.
    #[serde(with = "decimal_serde")]
    pub victory_ratio: Fixed,
    /// Multiplier on the acres-conquered curve.
    #[serde(with = "decimal_serde")]
    pub conquest_multiplier: Fixed,
    /// Minimum acres conquered on a success.
    pub minimum_conquered: u64,
    /// Land ratio from which conquests also discover land.
    #[serde(with = "decimal_serde")]
    pub discovery_ratio: Fixed,
    /// Divisor of discovered land against non-player targets.
    pub non_player_discovery_divisor: u64,
}

impl Default for LandRules {
    fn default() -> Self {
        Self {
            range_min: Fixed::from_num(0.4),
            range_max: Fixed::from_num(2.5),
            victory_ratio: Fixed::from_num(0.75),
            conquest_multiplier: Fixed::from_num(0.75),
            minimum_conquered: 10,
            discovery_ratio: Fixed::from_num(0.75),
            non_player_discovery_divisor: 3,
        }
    }
}

/// Queue delays and recency window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingRules {
    /// Base ticks for units to return home.
    pub unit_return_ticks: u32,
    /// Ticks for conquered land to arrive.
    pub land_return_ticks: u32,
    /// Ticks before `dies_into` units appear.
    pub dies_into_ticks: u32,
    /// Ticks before defensive conversions appear.
    pub defensive_conversion_ticks: u32,
    /// Ticks stunned units are away.
    pub stun_ticks: u32,
    /// Window in which an invasion counts as recent.
    pub recent_invasion_window: u64,
}

impl Default for TimingRules {
    fn default() -> Self {
        Self {
            unit_return_ticks: 12,
            land_return_ticks: 12,
            dies_into_ticks: 1,
            defensive_conversion_ticks: 6,
            stun_ticks: 2,
            recent_invasion_window: 24,
        }
    }
}

/// Research point grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchRules {
    /// Points per acre conquered.
    pub points_per_acre: u64,
    /// Multiplier when the attacker has not recently hit this target.
    pub first_hit_multiplier: u64,
}

impl Default for ResearchRules {
    fn default() -> Self {
        Self {
            points_per_acre: 25,
            first_hit_multiplier: 2,
        }
    }
}

/// Faction mechanics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactionRules {
    /// Peasants that can never be killed or eaten.
    pub peasant_floor: u64,
    /// Immortals slain per zealot.
    pub immortals_per_zealot: u64,
    /// Share of opposing immortals zealots can slay.
    #[serde(with = "decimal_serde")]
    pub immortal_kill_ratio: Fixed,
    /// Souls destroyed per zealot.
    pub souls_per_zealot: u64,
    /// Share of souls an attacking zealot force can destroy.
    #[serde(with = "decimal_serde")]
    pub soul_destruction_offense: Fixed,
    /// Share of souls a defending zealot force can destroy.
    #[serde(with = "decimal_serde")]
    pub soul_destruction_defense: Fixed,
    /// Blood per raw power of slain enemies.
    #[serde(with = "decimal_serde")]
    pub blood_per_power: Fixed,
    /// Food per raw DP slain when attacking.
    #[serde(with = "decimal_serde")]
    pub food_per_defense_slain: Fixed,
    /// Food per own casualty when defending.
    #[serde(with = "decimal_serde")]
    pub food_per_casualty: Fixed,
    /// Minimum land ratio for champion creation.
    #[serde(with = "decimal_serde")]
    pub champion_min_ratio: Fixed,
    /// Food per raw DP eaten by an attacking metabolism.
    #[serde(with = "decimal_serde")]
    pub metabolism_offense_food: Fixed,
    /// Food per raw OP eaten by a defending metabolism.
    #[serde(with = "decimal_serde")]
    pub metabolism_defense_food: Fixed,
    /// Improvement damage shielded per share of masonries.
    #[serde(with = "decimal_serde")]
    pub masonry_damage_shield: Fixed,
}

impl Default for FactionRules {
    fn default() -> Self {
        Self {
            peasant_floor: 1000,
            immortals_per_zealot: 2,
            immortal_kill_ratio: Fixed::from_num(0.04),
            souls_per_zealot: 2,
            soul_destruction_offense: Fixed::from_num(0.04),
            soul_destruction_defense: Fixed::from_num(0.08),
            blood_per_power: Fixed::ONE / Fixed::from_num(3),
            food_per_defense_slain: Fixed::from_num(4),
            food_per_casualty: Fixed::from_num(2),
            champion_min_ratio: Fixed::from_num(0.75),
            metabolism_offense_food: Fixed::from_num(8),
            metabolism_defense_food: Fixed::from_num(4),
            masonry_damage_shield: Fixed::from_num(0.75),
        }
    }
}
