//! Named perk values for races, units and spells.
//!
//! Perks are written in data files as short strings:
//!
//! | Text                   | Value                                  |
//! |------------------------|----------------------------------------|
//! | `"50"`                 | `Scalar(50)`                           |
//! | `"forest,5,10"`        | `List([forest, 5, 10])`                |
//! | `"platinum,20;gems,5"` | `Nested([[platinum, 20], [gems, 5]])`  |
//!
//! A perk that is absent has no effect. Each perk table only accepts the
//! keys of its own enum ([`UnitPerk`], [`RacePerk`], [`SpellPerk`]) through
//! the typed accessors, so a handler can never look up a misspelled key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{percent, Fixed};
use crate::units::UnitSlot;

/// One item of a list perk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PerkAtom {
    /// Numeric item.
    Number(Fixed),
    /// Identifier item (land type, building, resource, spell key).
    Key(String),
}

impl PerkAtom {
    fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.parse::<f64>() {
            Ok(value) => Fixed::checked_from_num(value)
                .map_or_else(|| Self::Key(token.to_string()), Self::Number),
            Err(_) => Self::Key(token.to_string()),
        }
    }

    /// Numeric value, if this atom is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<Fixed> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Key(_) => None,
        }
    }

    /// Identifier text; numbers are rendered back to text.
    #[must_use]
    pub fn as_key(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Key(key) => key.clone(),
        }
    }
}

impl fmt::Display for PerkAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

/// A perk value: scalar, flat list, or list of lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PerkValue {
    /// A single number.
    Scalar(Fixed),
    /// Comma separated items.
    List(Vec<PerkAtom>),
    /// Semicolon separated groups of comma separated items.
    Nested(Vec<Vec<PerkAtom>>),
}

impl PerkValue {
    /// Parse the data-file text form.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::MalformedPerk {
                key: String::new(),
                message: "empty perk value".to_string(),
            });
        }

        if text.contains(';') {
            let groups = text
                .split(';')
                .filter(|group| !group.trim().is_empty())
                .map(|group| group.split(',').map(PerkAtom::parse).collect())
                .collect();
            return Ok(Self::Nested(groups));
        }

        if text.contains(',') {
            return Ok(Self::List(text.split(',').map(PerkAtom::parse).collect()));
        }

        Ok(match PerkAtom::parse(text) {
            PerkAtom::Number(value) => Self::Scalar(value),
            key @ PerkAtom::Key(_) => Self::List(vec![key]),
        })
    }

    /// Scalar value, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<Fixed> {
        match self {
            Self::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    /// Flat list view. A scalar is a one-item list.
    #[must_use]
    pub fn as_list(&self) -> Vec<PerkAtom> {
        match self {
            Self::Scalar(value) => vec![PerkAtom::Number(*value)],
            Self::List(items) => items.clone(),
            Self::Nested(groups) => groups.first().cloned().unwrap_or_default(),
        }
    }

    /// Grouped view. A flat list is a single group.
    #[must_use]
    pub fn as_groups(&self) -> Vec<Vec<PerkAtom>> {
        match self {
            Self::Scalar(value) => vec![vec![PerkAtom::Number(*value)]],
            Self::List(items) => vec![items.clone()],
            Self::Nested(groups) => groups.clone(),
        }
    }
}

impl TryFrom<String> for PerkValue {
    type Error = GameError;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

impl From<PerkValue> for String {
    fn from(value: PerkValue) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PerkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: &[PerkAtom]| {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        match self {
            Self::Scalar(value) => write!(f, "{value}"),
            Self::List(items) => f.write_str(&join(items)),
            Self::Nested(groups) => f.write_str(
                &groups
                    .iter()
                    .map(|group| join(group))
                    .collect::<Vec<_>>()
                    .join(";"),
            ),
        }
    }
}

/// A perk key enum: every perk table is indexed by one of these.
pub trait PerkKey: Copy {
    /// Data-file key.
    fn as_str(self) -> &'static str;

    /// All known keys, used to warn about unknown entries in data files.
    fn all() -> &'static [Self];
}

macro_rules! perk_keys {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $key:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl PerkKey for $name {
            fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            fn all() -> &'static [Self] {
                &[$(Self::$variant,)+]
            }
        }
    };
}

perk_keys! {
    /// Perks attached to a single unit.
    UnitPerk {
        /// Loses exactly this percentage on offense.
        FixedCasualties => "fixed_casualties",
        /// Fewer casualties on offense and defense (percent).
        FewerCasualties => "fewer_casualties",
        /// Fewer casualties on offense (percent).
        FewerCasualtiesOffense => "fewer_casualties_offense",
        /// Fewer casualties on defense (percent).
        FewerCasualtiesDefense => "fewer_casualties_defense",
        /// Never dies unless the opponent brings immortal slayers.
        Immortal => "immortal",
        /// Never dies.
        TrueImmortal => "true_immortal",
        /// Immortal on offense when the invasion succeeds.
        ImmortalOnVictory => "immortal_on_victory",
        /// Immortal on offense at or above this land ratio (percent).
        ImmortalVsLandRange => "immortal_vs_land_range",
        /// Cancels immortality of opposing units.
        KillsImmortal => "kills_immortal",
        /// Destroys stored souls of the opponent.
        DestroysSouls => "destroys_souls",
        /// Dead units return as another slot.
        DiesInto => "dies_into",
        /// Dead units return as several units of another slot (`slot,count`).
        DiesIntoMultiple => "dies_into_multiple",
        /// Surviving units return as another slot after a success.
        WinsInto => "wins_into",
        /// Plunders several resources (`resource,per unit;...`).
        Plunders => "plunders",
        /// Plunders a single resource (`resource,per unit`).
        Plunder => "plunder",
        /// Units sent are capped by buildings owned (`building,per building,improvement`).
        BuildingLimit => "building_limit",
        /// Returns this many ticks sooner.
        FasterReturn => "faster_return",
        /// Returns sooner when paired with another slot (`slot,ticks`).
        FasterReturnIfPaired => "faster_return_if_paired",
        /// Sinks enemy boats when attacking.
        SinkBoatsOffense => "sink_boats_offense",
        /// Sinks enemy boats when defending.
        SinkBoatsDefense => "sink_boats_defense",
        /// Kills peasants on attack (per unit).
        BurnsPeasantsOnAttack => "burns_peasants_on_attack",
        /// Eats peasants on attack (per unit).
        EatsPeasantsOnAttack => "eats_peasants_on_attack",
        /// Eats draftees on attack (per unit).
        EatsDrafteesOnAttack => "eats_draftees_on_attack",
        /// Destroys improvement points on attack (per unit).
        DamagesImprovementsOnAttack => "damages_improvements_on_attack",
        /// Stuns defending units on a successful invasion.
        StunsUnits => "stuns_units",
        /// Converts enemy bodies into the listed slots.
        Conversion => "conversion",
        /// Converts into a slot chosen by land ratio (`ratio,slot;...`).
        StaggeredConversion => "staggered_conversion",
        /// Converts by strength of the killed unit (`limit,weak slot,strong slot`).
        StrengthConversion => "strength_conversion",
        /// Converts by power killed (`multiplier,slot`).
        ValueConversion => "value_conversion",
        /// Can be sent even though it has no offense.
        SendableWithZeroOp => "sendable_with_zero_op",
        /// Offense from land share (`land,percent per point,max`).
        OffenseFromLand => "offense_from_land",
        /// Defense from land share (`land,percent per point,max`).
        DefenseFromLand => "defense_from_land",
        /// Offense from building share (`building,percent per point,max`).
        OffenseFromBuilding => "offense_from_building",
        /// Defense from building share (`building,percent per point,max`).
        DefenseFromBuilding => "defense_from_building",
        /// Offense by land ratio band (`ratio,power;...`).
        OffenseStaggeredLandRange => "offense_staggered_land_range",
        /// Offense from wizard ratio (`per ratio,max`).
        OffenseFromWizardRatio => "offense_from_wizard_ratio",
        /// Offense when paired with another slot (`slot,power`).
        OffenseFromPairing => "offense_from_pairing",
        /// Defense when paired with another slot (`slot,power`).
        DefenseFromPairing => "defense_from_pairing",
        /// Offense while a spell is active (`spell,power`).
        OffenseFromSpell => "offense_from_spell",
        /// Defense while a spell is active (`spell,power`).
        DefenseFromSpell => "defense_from_spell",
        /// Offense when retaliating.
        OffenseOnRetaliation => "offense_on_retaliation",
        /// Extra prestige on successful invasions (percent).
        PrestigeGains => "prestige_gains",
        /// Raises enemy casualties when attacking (percent).
        IncreasesCasualtiesOnOffense => "increases_casualties_on_offense",
        /// Raises enemy casualties when defending (percent).
        IncreasesCasualtiesOnDefense => "increases_casualties_on_defense",
    }
}

perk_keys! {
    /// Perks attached to a race.
    RacePerk {
        /// Offensive power bonus (percent).
        Offense => "offense",
        /// Defensive power bonus (percent).
        Defense => "defense",
        /// Casualties modifier (percent, negative is fewer).
        Casualties => "casualties",
        /// Offensive casualties modifier (percent).
        OffensiveCasualties => "offensive_casualties",
        /// Defensive casualties modifier (percent).
        DefensiveCasualties => "defensive_casualties",
        /// Prestige gains (percent).
        PrestigeGains => "prestige_gains",
        /// Research points per acre (percent).
        ResearchPointsPerAcre => "research_points_per_acre",
        /// Reduces conversions of this race's dead (percent).
        ReducedConversions => "reduced_conversions",
        /// Recovers part of the cost of lost units (percent).
        Salvaging => "salvaging",
        /// The race cannot invade.
        CannotInvade => "cannot_invade",
        /// Conversion bonus (percent).
        Conversions => "conversions",
        /// Extra land discovered on invasion (percent).
        ExtraLandDiscovered => "extra_land_discovered",
        /// Morale gained per percent of gryphon nests on success.
        MoraleFromGryphonNests => "morale_on_successful_invasion_from_gryphon_nests",
    }
}

perk_keys! {
    /// Perks attached to a spell.
    SpellPerk {
        /// Offensive power modifier (percent).
        OffensivePower => "offensive_power",
        /// Defensive power modifier (percent).
        DefensivePower => "defensive_power",
        /// Casualties modifier (percent).
        Casualties => "casualties",
        /// Offensive casualties modifier (percent).
        OffensiveCasualties => "offensive_casualties",
        /// Defensive casualties modifier (percent).
        DefensiveCasualties => "defensive_casualties",
        /// Raises the attacker's casualties when this dominion defends (percent).
        IncreasesCasualtiesOnOffense => "increases_casualties_on_offense",
        /// Raises the defender's casualties when this dominion attacks (percent).
        IncreasesCasualtiesOnDefense => "increases_casualties_on_defense",
        /// Raises defender casualties from wizard ratio (`per ratio,max`).
        IncreasesCasualtiesFromWizardRatio => "increases_casualties_on_offense_from_wizard_ratio",
        /// Raises enemy draftee casualties (percent).
        IncreasesEnemyDrafteeCasualties => "increases_enemy_draftee_casualties",
        /// Units return this many ticks sooner.
        FasterReturn => "faster_return",
        /// Offensive power when retaliating (percent).
        OffensivePowerOnRetaliation => "offensive_power_on_retaliation",
        /// Reduces target raw defense from land (`percent,per percent,land,max`).
        ReducesTargetRawDefenseFromLand => "reduces_target_raw_defense_from_land",
        /// Ignores enemy temples.
        ImmuneToTemples => "immune_to_temples",
        /// Forbids invading.
        CannotInvade => "cannot_invade",
        /// Dominion is in stasis.
        Stasis => "stasis",
        /// Opens a portal for races that need one.
        OpensPortal => "opens_portal",
        /// Captures invading units; value is the controlling slot.
        MindControl => "mind_control",
        /// Keeps captured units as thralls in this slot.
        Menticide => "menticide",
        /// Eats casualties for food.
        Metabolism => "metabolism",
        /// Burns extra buildings (`slot,min op share,extra percent`).
        BurnsExtraBuildings => "burns_extra_buildings",
        /// Extra land discovered (percent).
        LandDiscovered => "land_discovered",
        /// Conversion bonus (percent).
        Conversions => "conversions",
        /// No conversions for the caster.
        NoConversions => "no_conversions",
    }
}

perk_keys! {
    /// Perks granted by unlocked technologies, summed per dominion.
    TechPerk {
        /// Offensive power (percent).
        Offense => "offense",
        /// Defensive power (percent).
        Defense => "defense",
        /// Casualties modifier (percent).
        Casualties => "casualties",
        /// Offensive casualties modifier (percent).
        OffensiveCasualties => "offensive_casualties",
        /// Defensive casualties modifier (percent).
        DefensiveCasualties => "defensive_casualties",
        /// Prestige gains (percent).
        PrestigeGains => "prestige_gains",
        /// Conversions (percent).
        Conversions => "conversions",
    }
}

/// Perk table keyed by one of the perk key enums.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerkSet {
    values: BTreeMap<String, PerkValue>,
}

impl PerkSet {
    /// Create an empty perk set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a perk parsed from its text form.
    pub fn with(mut self, key: impl PerkKey, text: &str) -> Result<Self> {
        let value = PerkValue::parse(text).map_err(|err| match err {
            GameError::MalformedPerk { message, .. } => GameError::MalformedPerk {
                key: key.as_str().to_string(),
                message,
            },
            other => other,
        })?;
        self.values.insert(key.as_str().to_string(), value);
        Ok(self)
    }

    /// Insert a parsed value.
    pub fn insert(&mut self, key: impl PerkKey, value: PerkValue) {
        self.values.insert(key.as_str().to_string(), value);
    }

    /// Raw value lookup.
    #[must_use]
    pub fn get<K: PerkKey>(&self, key: K) -> Option<&PerkValue> {
        self.values.get(key.as_str())
    }

    /// Whether the perk is present.
    #[must_use]
    pub fn has<K: PerkKey>(&self, key: K) -> bool {
        self.values.contains_key(key.as_str())
    }

    /// Scalar value, zero when absent or not a scalar.
    #[must_use]
    pub fn value<K: PerkKey>(&self, key: K) -> Fixed {
        self.get(key)
            .and_then(PerkValue::as_scalar)
            .unwrap_or(Fixed::ZERO)
    }

    /// Scalar percentage as a fraction, zero when absent.
    #[must_use]
    pub fn multiplier<K: PerkKey>(&self, key: K) -> Fixed {
        percent(self.value(key))
    }

    /// Flat list, empty when absent.
    #[must_use]
    pub fn list<K: PerkKey>(&self, key: K) -> Vec<PerkAtom> {
        self.get(key).map(PerkValue::as_list).unwrap_or_default()
    }

    /// Grouped list, empty when absent.
    #[must_use]
    pub fn groups<K: PerkKey>(&self, key: K) -> Vec<Vec<PerkAtom>> {
        self.get(key).map(PerkValue::as_groups).unwrap_or_default()
    }

    /// Slot referenced by a scalar perk. A slot outside 1-4 is an error.
    pub fn slot<K: PerkKey>(&self, key: K) -> Result<Option<UnitSlot>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => {
                let number = value.as_list().first().and_then(PerkAtom::as_number);
                let number = number.ok_or_else(|| GameError::MalformedPerk {
                    key: key.as_str().to_string(),
                    message: format!("expected a slot number, found '{value}'"),
                })?;
                slot_from_number(key, number).map(Some)
            }
        }
    }

    /// Numeric item at `index` of a list perk.
    pub fn number_at<K: PerkKey>(&self, key: K, index: usize) -> Result<Option<Fixed>> {
        let items = self.list(key);
        if items.is_empty() {
            return Ok(None);
        }
        items
            .get(index)
            .and_then(PerkAtom::as_number)
            .map(Some)
            .ok_or_else(|| GameError::MalformedPerk {
                key: key.as_str().to_string(),
                message: format!("expected a number at position {index}"),
            })
    }

    /// Keys present in the table, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys not belonging to the perk enum `K`.
    #[must_use]
    pub fn unknown_keys<K: PerkKey + 'static>(&self) -> Vec<String> {
        self.keys()
            .filter(|key| !K::all().iter().any(|known| known.as_str() == *key))
            .map(str::to_string)
            .collect()
    }
}

/// Convert a perk number into a unit slot.
pub fn slot_from_number(key: impl PerkKey, number: Fixed) -> Result<UnitSlot> {
    let raw = number.to_num::<i64>();
    UnitSlot::from_number(raw).ok_or_else(|| GameError::InvalidSlotReference {
        key: key.as_str().to_string(),
        slot: raw,
    })
}
