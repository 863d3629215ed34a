//! Entity model for the Warband simulation.
//!
//! Every concrete entity stores its numeric attributes as [`Bounded`] fields
//! behind a closed key enum, and shares an [`EntityCore`] carrying identity,
//! creation time, change listeners, and lifecycle state.
//!
//! # Modules
//!
//! - [`attributes`] -- Bounded values, change events, the [`Attributed`] contract.
//! - [`lord`] -- The player's avatar and mana pool.
//! - [`champion`] -- Commanders with three stats and an owned troop pool.
//! - [`ward`] -- Capturable NPCs and their breeding economy.
//! - [`troops`] -- Per-tier troop tallies and combat power.
//! - [`location`] -- Raidable locations, reconnaissance, held wards.
//! - [`registry`] -- Lookup of every live entity by tagged id.
//! - [`allocator`] -- Capacity-checked troop moves between pools.
//! - [`error`] -- Error types for entity and allocator operations.

pub mod allocator;
pub mod attributes;
pub mod champion;
pub mod error;
pub mod location;
pub mod lord;
pub mod registry;
pub mod troops;
pub mod ward;

pub use allocator::{AllocationReport, ArmamentUpgrade, TroopRequest};
pub use attributes::{
    AttrValue, AttributeKey, Attributed, Bounded, EntityCore, EntityEvent, Listener,
    ListenerError, ListenerId,
};
pub use champion::{Champion, ChampionAttr, ChampionStats};
pub use error::{AllocationError, EntityError};
pub use location::{Location, LocationAttr};
pub use lord::{Lord, LordAttr, ManaGain};
pub use registry::{Entity, Registry, RegistryStats};
pub use troops::{CommandStats, PoolCapacity, TroopPool, TroopRemoval};
pub use ward::{Sire, Ward, WardAttr, WardProfile};
