//! Shared type definitions for the Warband turn simulation.
//!
//! This crate is the vocabulary every other crate in the workspace speaks:
//! strongly-typed identifiers, the tagged actor/target references used by the
//! scheduler and combat, troop armament tiers, and the failure taxonomy that
//! every recoverable error maps onto.
//!
//! # Modules
//!
//! - [`ids`] -- Type-prefixed UUID wrappers and the [`EntityRef`] family
//! - [`enums`] -- Entity kinds, armament tiers, failure kinds

pub mod enums;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{ArmamentTier, EntityKind, FailureKind, UnknownTier};
pub use ids::{
    ActorRef, ChampionId, EntityRef, IdParseError, ListingId, LocationId, LordId, PoolId,
    TargetRef, TaskId, WardId,
};
