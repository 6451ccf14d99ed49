//! Castle improvements and their bonus curve.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{fx, percent, ratio, Fixed};

/// An improvement points can be invested into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Improvement {
    /// Offensive power.
    Forges,
    /// Defensive power.
    Walls,
    /// Boat protection.
    Harbor,
    /// Research points.
    Observatory,
    /// Fewer casualties.
    Infirmary,
    /// Raises unit caps tied to buildings.
    Spires,
}

impl Improvement {
    /// All improvements in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Forges,
        Self::Walls,
        Self::Harbor,
        Self::Observatory,
        Self::Infirmary,
        Self::Spires,
    ];

    /// Maximum bonus in percent.
    #[must_use]
    pub fn maximum(self) -> Fixed {
        Fixed::from_num(match self {
            Self::Forges | Self::Walls => 20,
            Self::Harbor => 60,
            Self::Observatory => 30,
            Self::Infirmary => 25,
            Self::Spires => 40,
        })
    }

    /// Data-file key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Forges => "forges",
            Self::Walls => "walls",
            Self::Harbor => "harbor",
            Self::Observatory => "observatory",
            Self::Infirmary => "infirmary",
            Self::Spires => "spires",
        }
    }

    /// Parse a data-file key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.key() == key)
    }
}

/// Points invested per improvement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Improvements(BTreeMap<Improvement, u64>);

impl Improvements {
    /// No investments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, improvement: Improvement, points: u64) -> Self {
        self.0.insert(improvement, points);
        self
    }

    /// Points invested.
    #[must_use]
    pub fn points(&self, improvement: Improvement) -> u64 {
        self.0.get(&improvement).copied().unwrap_or(0)
    }

    /// Remove up to `points`, returning how many were removed.
    pub fn damage(&mut self, improvement: Improvement, points: u64) -> u64 {
        let current = self.points(improvement);
        let removed = points.min(current);
        self.0.insert(improvement, current - removed);
        removed
    }

    /// Total points over every improvement.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterate `(improvement, points)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Improvement, u64)> + '_ {
        self.0.iter().map(|(&i, &p)| (i, p))
    }

    /// Bonus as a fraction: `max × points / (points + 4000 + 5 × land)`.
    ///
    /// Masonries raise the maximum by 2.75% per percent owned.
    #[must_use]
    pub fn multiplier(&self, improvement: Improvement, total_land: u64, masonries: u64) -> Fixed {
        let points = fx(self.points(improvement));
        if points == Fixed::ZERO || total_land == 0 {
            return Fixed::ZERO;
        }
        let masonry_bonus = ratio(fx(masonries), fx(total_land)) * Fixed::from_num(2.75);
        let maximum = percent(improvement.maximum()) * (Fixed::ONE + masonry_bonus);
        let denominator = points + Fixed::from_num(4000) + fx(total_land) * Fixed::from_num(5);
        maximum * ratio(points, denominator)
    }
}
