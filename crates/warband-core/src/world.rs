//! The mutable game state every rule effect operates on.

use warband_entities::{Lord, Registry};
use warband_ledger::Ledger;

use crate::config::GameConfig;

/// Entities plus resources, and the current turn number.
///
/// Task, spell, and purchase effects receive `&mut World`; they never see
/// the subsystems that invoked them.
#[derive(Debug)]
pub struct World {
    /// Every live entity.
    pub registry: Registry,
    /// Currency and morale.
    pub ledger: Ledger,
    turn: u64,
}

impl World {
    /// Build the starting world from configuration.
    pub fn from_config(config: &GameConfig) -> Self {
        let lord = Lord::new(
            config.lord.name.clone(),
            config.lord.mana,
            config.lord.max_mana,
        );
        let mut registry = Registry::new(lord);
        for (&tier, &count) in &config.troops.starting {
            registry.common_pool_mut().add_troops(count, tier);
        }
        Self {
            registry,
            ledger: Ledger::new(&config.resources),
            turn: 0,
        }
    }

    /// The current turn number.
    pub const fn turn(&self) -> u64 {
        self.turn
    }

    pub(crate) const fn set_turn(&mut self, turn: u64) {
        self.turn = turn;
    }
}
