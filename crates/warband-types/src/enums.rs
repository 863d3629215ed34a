//! Enumeration types shared across the workspace.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// The kind tag carried by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// The player's avatar; holds mana.
    Lord,
    /// A commander with three bounded stats and an owned troop pool.
    Champion,
    /// A capturable NPC.
    Ward,
    /// A raidable location.
    Location,
    /// A tally of rank-and-file troops.
    TroopPool,
}

impl EntityKind {
    /// Lowercase label used in log lines and identifiers.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lord => "lord",
            Self::Champion => "champion",
            Self::Ward => "ward",
            Self::Location => "location",
            Self::TroopPool => "pool",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Armament tiers
// ---------------------------------------------------------------------------

/// One of the five fixed troop quality levels.
///
/// Variants are declared weakest first, so the derived ordering ranks tiers
/// by combat value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmamentTier {
    /// No weapons at all.
    Unarmed,
    /// Crude weapons.
    Light,
    /// Standard issue.
    Medium,
    /// Heavy arms and armour.
    Heavy,
    /// Picked veterans.
    Elite,
}

/// The tier name did not match any armament tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown armament tier: {0}")]
pub struct UnknownTier(pub String);

impl ArmamentTier {
    /// All tiers, weakest first.
    pub const ALL: [Self; 5] = [
        Self::Unarmed,
        Self::Light,
        Self::Medium,
        Self::Heavy,
        Self::Elite,
    ];

    /// All tiers, strongest first. Used when filling a champion's pool.
    pub const BY_STRENGTH: [Self; 5] = [
        Self::Elite,
        Self::Heavy,
        Self::Medium,
        Self::Light,
        Self::Unarmed,
    ];

    /// The lowest tier, where troops of unknown armament land.
    pub const LOWEST: Self = Self::Unarmed;

    /// Combat-power multiplier for one troop of this tier.
    pub const fn power_multiplier(self) -> f64 {
        match self {
            Self::Unarmed => 1.0,
            Self::Light => 1.1,
            Self::Medium => 1.2,
            Self::Heavy => 1.6,
            Self::Elite => 3.0,
        }
    }

    /// Short human description.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Unarmed => "unarmed troops",
            Self::Light => "lightly armed troops",
            Self::Medium => "medium armed troops",
            Self::Heavy => "heavily armed troops",
            Self::Elite => "elite troops",
        }
    }

    /// The tier directly below this one, if any.
    pub const fn lower(self) -> Option<Self> {
        match self {
            Self::Unarmed => None,
            Self::Light => Some(Self::Unarmed),
            Self::Medium => Some(Self::Light),
            Self::Heavy => Some(Self::Medium),
            Self::Elite => Some(Self::Heavy),
        }
    }

    /// Lowercase name, accepted back by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unarmed => "unarmed",
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Heavy => "heavy",
            Self::Elite => "elite",
        }
    }
}

impl fmt::Display for ArmamentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArmamentTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unarmed" => Ok(Self::Unarmed),
            "light" => Ok(Self::Light),
            "medium" => Ok(Self::Medium),
            "heavy" => Ok(Self::Heavy),
            "elite" => Ok(Self::Elite),
            other => Err(UnknownTier(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// The class of a recoverable failure.
///
/// Every error returned from a public operation maps onto exactly one of
/// these. None of them is fatal; callers decide how to present them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Unknown kind, id, or entity.
    NotFound,
    /// The actor or target is already claimed this turn.
    Occupied,
    /// Mana, currency, capacity, or a purchase cap was exceeded.
    InsufficientResource,
    /// A domain rule rejected the request.
    PreconditionFailed,
    /// The request is not valid in the current state.
    InvalidState,
}
