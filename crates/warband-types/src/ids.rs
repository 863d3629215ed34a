//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity has a strongly-typed ID so identifiers of different kinds
//! cannot be mixed at compile time. All IDs use UUID v7 (time-ordered) and
//! render with a kind prefix, e.g. `champion_0190b6c2-...`, which keeps them
//! unique across kinds even when printed side by side in a settlement log.
//!
//! The scheduler and combat subsystems address entities through the tagged
//! variants [`EntityRef`], [`ActorRef`] and [`TargetRef`] and dispatch on
//! them by pattern match.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::EntityKind;

/// Failure to parse a prefixed identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    /// The text did not start with the expected `<prefix>_` marker.
    #[error("identifier {text:?} does not carry the {expected:?} prefix")]
    WrongPrefix {
        /// The rejected input.
        text: String,
        /// The prefix the caller expected.
        expected: &'static str,
    },

    /// The UUID portion was malformed.
    #[error("identifier {text:?} has a malformed uuid")]
    MalformedUuid {
        /// The rejected input.
        text: String,
    },
}

/// Generates a newtype wrapper around [`Uuid`] with a display prefix.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident => $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Text prefix used when the identifier is rendered.
            pub const PREFIX: &'static str = $prefix;

            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                let rest = text
                    .strip_prefix(Self::PREFIX)
                    .and_then(|r| r.strip_prefix('_'))
                    .ok_or_else(|| IdParseError::WrongPrefix {
                        text: text.to_owned(),
                        expected: Self::PREFIX,
                    })?;
                Uuid::parse_str(rest)
                    .map(Self)
                    .map_err(|_err| IdParseError::MalformedUuid {
                        text: text.to_owned(),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for the lord (one per game).
    LordId => "lord"
}

define_id! {
    /// Unique identifier for a champion.
    ChampionId => "champion"
}

define_id! {
    /// Unique identifier for a ward, captive or not.
    WardId => "ward"
}

define_id! {
    /// Unique identifier for a raidable location.
    LocationId => "location"
}

define_id! {
    /// Unique identifier for a troop pool (champion-owned or common).
    PoolId => "pool"
}

define_id! {
    /// Unique identifier for a published task.
    TaskId => "task"
}

define_id! {
    /// Unique identifier for a ward listed on the marketplace shelf.
    ListingId => "listing"
}

/// A reference to any live entity, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// The lord.
    Lord(LordId),
    /// A champion.
    Champion(ChampionId),
    /// A ward.
    Ward(WardId),
    /// A raidable location.
    Location(LocationId),
    /// A troop pool.
    TroopPool(PoolId),
}

impl EntityRef {
    /// The kind of entity referenced.
    pub const fn kind(self) -> EntityKind {
        match self {
            Self::Lord(_) => EntityKind::Lord,
            Self::Champion(_) => EntityKind::Champion,
            Self::Ward(_) => EntityKind::Ward,
            Self::Location(_) => EntityKind::Location,
            Self::TroopPool(_) => EntityKind::TroopPool,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lord(id) => id.fmt(f),
            Self::Champion(id) => id.fmt(f),
            Self::Ward(id) => id.fmt(f),
            Self::Location(id) => id.fmt(f),
            Self::TroopPool(id) => id.fmt(f),
        }
    }
}

/// An entity that can perform a task: a champion or a ward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActorRef {
    /// A champion acting.
    Champion(ChampionId),
    /// A ward acting.
    Ward(WardId),
}

impl From<ActorRef> for EntityRef {
    fn from(actor: ActorRef) -> Self {
        match actor {
            ActorRef::Champion(id) => Self::Champion(id),
            ActorRef::Ward(id) => Self::Ward(id),
        }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        EntityRef::from(*self).fmt(f)
    }
}

/// An entity a task or spell can be aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    /// A ward.
    Ward(WardId),
    /// A raidable location.
    Location(LocationId),
    /// A troop pool.
    TroopPool(PoolId),
    /// A champion.
    Champion(ChampionId),
}

impl TargetRef {
    /// Whether claiming this target excludes every other task from it.
    ///
    /// Raidable locations can be worked by several tasks in the same turn
    /// (for example two scouts), so they are never held exclusively.
    pub const fn is_exclusive(self) -> bool {
        !matches!(self, Self::Location(_))
    }
}

impl From<TargetRef> for EntityRef {
    fn from(target: TargetRef) -> Self {
        match target {
            TargetRef::Ward(id) => Self::Ward(id),
            TargetRef::Location(id) => Self::Location(id),
            TargetRef::TroopPool(id) => Self::TroopPool(id),
            TargetRef::Champion(id) => Self::Champion(id),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        EntityRef::from(*self).fmt(f)
    }
}
