//! Error types for the invasion engine.
//!
//! [`GameError`] covers data loading and lookups. [`InvasionError`] is the
//! taxonomy surfaced by [`crate::store::DominionStore::invade`]: the first
//! three categories are rule rejections shown to the player, the last one is
//! a data-consistency bug.

use thiserror::Error;

use crate::units::UnitSlot;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for data and lookup failures.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Data file could not be read.
    #[error("Failed to read '{path}': {message}")]
    IoError {
        /// Path that failed.
        path: String,
        /// Error message.
        message: String,
    },

    /// Race key not present in the registry.
    #[error("Unknown race: {0}")]
    UnknownRace(String),

    /// Spell key not present in the spell book.
    #[error("Unknown spell: {0}")]
    UnknownSpell(String),

    /// Dominion id not present in the store.
    #[error("Dominion not found: {0}")]
    DominionNotFound(u64),

    /// Realm id not present in the store.
    #[error("Realm not found: {0}")]
    RealmNotFound(u64),

    /// A perk value had the wrong shape for its key.
    #[error("Perk '{key}' has malformed value: {message}")]
    MalformedPerk {
        /// Perk key.
        key: String,
        /// What was wrong.
        message: String,
    },

    /// A perk referenced a unit slot outside 1-4.
    #[error("Perk '{key}' references invalid unit slot {slot}")]
    InvalidSlotReference {
        /// Perk key.
        key: String,
        /// Referenced slot number.
        slot: i64,
    },

    /// A power or count left the fixed-point range.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

/// Errors raised while resolving an invasion.
#[derive(Debug, Error)]
pub enum InvasionError {
    /// Round, lock, range, realm or identity checks failed.
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),

    /// Not enough units, boats or morale.
    #[error(transparent)]
    Insufficient(#[from] InsufficientResource),

    /// A game rule forbids this invasion.
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    /// Internal data-consistency failure. Never shown as a game message.
    #[error("Invariant failure: {0}")]
    Invariant(String),
}

impl InvasionError {
    /// Whether this error is a normal rejection that may be shown to the player.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Invariant(_))
    }

    /// Build an invariant failure.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }
}

impl From<GameError> for InvasionError {
    fn from(err: GameError) -> Self {
        Self::Invariant(err.to_string())
    }
}

/// Checks rejected before any power calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    /// Invasions are locked for this round.
    #[error("Invasions are currently disabled.")]
    OffensiveActionsDisabled,

    /// The attacker is still under protection.
    #[error("You cannot invade while under protection.")]
    AttackerUnderProtection,

    /// The defender is still under protection.
    #[error("You cannot invade dominions which are under protection.")]
    TargetUnderProtection,

    /// Land ratio outside the allowed band.
    #[error("You cannot invade dominions outside of your range.")]
    OutOfRange,

    /// Dominions belong to different rounds.
    #[error("Nice try, but you cannot invade cross-round.")]
    DifferentRound,

    /// Dominions share a realm.
    #[error("Nice try, but you cannot invade your realmies.")]
    SameRealm,

    /// Attacker targeted itself.
    #[error("Nice try, but you cannot invade yourself.")]
    SelfInvasion,

    /// The round has not started yet.
    #[error("You cannot invade until the round has started.")]
    RoundNotStarted,

    /// A deployment quantity was negative.
    #[error("Invasion was canceled due to bad input.")]
    NegativeDeployment,

    /// The deployment carries no offensive power.
    #[error("You need to send at least some units.")]
    NoOffensivePower,

    /// A deployed unit has no offensive power and is not sendable with zero OP.
    #[error("You cannot send units that have no offensive power.")]
    ZeroPowerUnit(UnitSlot),
}

/// Checks rejected because the attacker lacks something.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsufficientResource {
    /// Not enough units of a slot at home.
    #[error("You don't have enough units at home to send this many units.")]
    Units {
        /// Slot that fell short.
        slot: UnitSlot,
        /// Units requested.
        requested: u64,
        /// Units at home.
        available: u64,
    },

    /// Not enough boats to carry the units that need them.
    #[error("You do not have enough boats to send this many units.")]
    Boats {
        /// Boats required.
        required: u64,
        /// Boats at home.
        available: u64,
    },

    /// Morale below the invasion threshold.
    #[error("You do not have enough morale to invade others.")]
    Morale {
        /// Current morale.
        morale: u32,
        /// Required minimum.
        minimum: u32,
    },
}

/// Game rules forbidding the invasion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    /// Offense would exceed 4:3 of the defense left at home.
    #[error("You need to leave more DP units at home, 40% rule")]
    FourThreeRule,

    /// The race cannot invade at all.
    #[error("Your race is not able to invade other dominions.")]
    RaceCannotInvade,

    /// An active spell forbids invading.
    #[error("You cannot invade while '{0}' is active.")]
    SpellForbidsInvasion(String),

    /// A building-based deployment cap was exceeded.
    #[error("You can at most control {limit} of unit {slot}. To control more, you need to first have more {building}.")]
    BuildingLimit {
        /// Slot that is capped.
        slot: UnitSlot,
        /// Maximum units allowed.
        limit: u64,
        /// Building type the cap depends on.
        building: String,
    },

    /// The race requires an open portal to invade.
    #[error("You cannot attack unless a portal is open.")]
    PortalRequired,

    /// The target is in stasis.
    #[error("A magical stasis surrounds the target, making it impossible for you to invade.")]
    TargetInStasis,

    /// The attacker is in stasis.
    #[error("You cannot invade while you are in stasis.")]
    AttackerInStasis,
}
