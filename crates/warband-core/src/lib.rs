//! Turn orchestration for the Warband simulation.
//!
//! This crate owns everything that happens between two turn boundaries:
//! tasks claimed and settled, the once-per-turn spell, marketplace
//! purchases, and the battle plan, all tied together by a single
//! [`GameContext`] whose [`end_turn`](GameContext::end_turn) is the only
//! thing that advances time.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `warband-config.yaml` into
//!   strongly-typed structs.
//! - [`world`] -- The entity registry and resource ledger effects operate on.
//! - [`scheduler`] -- Task kinds, exclusive claims, FCFS settlement.
//! - [`spells`] -- Once-per-turn spells paid in mana.
//! - [`market`] -- Capped standing goods and the ward shelf.
//! - [`combat`] -- Battle planning, preview, and settlement.
//! - [`factory`] -- [`WardFactory`] trait and [`StubWardFactory`].
//! - [`turn`] -- [`GameContext`], its builder, and the end-of-turn cycle.

pub mod combat;
pub mod config;
pub mod factory;
pub mod market;
pub mod scheduler;
pub mod spells;
pub mod turn;
pub mod world;

pub use combat::{
    BattleReport, CapturedWard, Combat, CombatError, CombatPhase, CombatPreview, Deployment,
};
pub use config::{ConfigError, GameConfig};
pub use factory::{StubWardFactory, WardFactory, WardRequest};
pub use market::{Goods, Market, MarketError, Purchase, WardListing};
pub use scheduler::{
    Scheduler, Task, TaskContext, TaskError, TaskKind, TaskOutcome, TaskRequest, TaskResult,
};
pub use spells::{Spell, SpellBook, SpellCast, SpellError, SpellInvocation};
pub use turn::{GameContext, GameContextBuilder, Rules, TurnError, TurnSummary, WiringError};
pub use world::World;
