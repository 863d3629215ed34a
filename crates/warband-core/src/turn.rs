//! The game context and the end-of-turn cycle.
//!
//! [`GameContext`] owns every subsystem for one game and is built once by
//! [`GameContextBuilder`], which refuses to produce a context without
//! rules data and a ward factory. Player actions go through the context's
//! convenience methods (or the public subsystem fields directly); nothing
//! advances the turn except [`GameContext::end_turn`], which settles in a
//! fixed order:
//!
//! 1. Snapshot the spell cast
//! 2. Settle tasks
//! 3. Collect the market log
//! 4. Fight the confirmed battle, if any
//! 5. Apply morale decay
//! 6. Advance the turn counter
//! 7. Reset spells, the market, then combat

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use warband_ledger::MoraleDecay;
use warband_types::{
    ActorRef, ChampionId, FailureKind, ListingId, LocationId, TargetRef, TaskId, WardId,
};

use crate::combat::{BattleReport, Combat, CombatError, CombatPreview, Deployment};
use crate::config::{ConfigError, GameConfig};
use crate::factory::WardFactory;
use crate::market::{Goods, Market, MarketError, Purchase, WardPricing};
use crate::scheduler::{Scheduler, TaskError, TaskKind, TaskOutcome, TaskResult};
use crate::spells::{Spell, SpellBook, SpellCast, SpellError};
use crate::world::World;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while assembling a [`GameContext`].
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    /// A required collaborator was never supplied.
    #[error("missing dependency: {0}")]
    MissingDependency(&'static str),

    /// The configuration failed validation.
    #[error("invalid configuration: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// A task kind could not be registered.
    #[error("task rules: {source}")]
    Task {
        /// The underlying scheduler error.
        #[from]
        source: TaskError,
    },

    /// A spell could not be registered.
    #[error("spell rules: {source}")]
    Spell {
        /// The underlying spell error.
        #[from]
        source: SpellError,
    },

    /// Goods could not be registered.
    #[error("market rules: {source}")]
    Market {
        /// The underlying market error.
        #[from]
        source: MarketError,
    },
}

/// Errors raised by [`GameContext::end_turn`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// The turn counter cannot advance further.
    #[error("turn counter overflow: cannot advance beyond turn {turn}")]
    TurnOverflow {
        /// The turn that could not be ended.
        turn: u64,
    },
}

impl TurnError {
    /// The failure class this error belongs to.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::TurnOverflow { .. } => FailureKind::InvalidState,
        }
    }
}

// ---------------------------------------------------------------------------
// Rules and wiring
// ---------------------------------------------------------------------------

/// Externally supplied rules data.
#[derive(Default)]
pub struct Rules {
    /// Task kinds.
    pub tasks: Vec<TaskKind>,
    /// Spells.
    pub spells: Vec<Spell>,
    /// Standing goods.
    pub goods: Vec<Goods>,
    /// Shelf pricing; the market default when `None`.
    pub ward_pricing: Option<WardPricing>,
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rules")
            .field("tasks", &self.tasks)
            .field("spells", &self.spells)
            .field("goods", &self.goods)
            .field("custom_pricing", &self.ward_pricing.is_some())
            .finish()
    }
}

/// Assembles a [`GameContext`] from configuration, rules, and collaborators.
pub struct GameContextBuilder {
    config: GameConfig,
    rules: Option<Rules>,
    factory: Option<Box<dyn WardFactory>>,
}

impl GameContextBuilder {
    /// Start from a configuration.
    pub const fn new(config: GameConfig) -> Self {
        Self {
            config,
            rules: None,
            factory: None,
        }
    }

    /// Supply the rules data.
    #[must_use]
    pub fn rules(mut self, rules: Rules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Supply the ward factory used to stock the market shelf.
    #[must_use]
    pub fn factory(mut self, factory: impl WardFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Validate, register the rules, and stock the first ward shelf.
    pub fn build(self) -> Result<GameContext, WiringError> {
        let Self {
            config,
            rules,
            factory,
        } = self;
        config.validate()?;
        let rules = rules.ok_or(WiringError::MissingDependency("rules"))?;
        let mut factory = factory.ok_or(WiringError::MissingDependency("ward factory"))?;

        let mut scheduler = Scheduler::new(config.turn.action_points_per_turn);
        for kind in rules.tasks {
            scheduler.register(kind)?;
        }
        let mut spells = SpellBook::new();
        for spell in rules.spells {
            spells.register(spell)?;
        }
        let mut market = Market::new(config.market.clone());
        for goods in rules.goods {
            market.register(goods)?;
        }
        if let Some(pricing) = rules.ward_pricing {
            market.set_ward_pricing(pricing);
        }

        let mut rng = StdRng::seed_from_u64(config.world.seed);
        market.refresh_shelf(factory.as_mut(), &mut rng);
        let world = World::from_config(&config);
        let combat = Combat::new(config.combat.clone());
        info!(
            world = %config.world.name,
            seed = config.world.seed,
            task_kinds = scheduler.task_kinds().count(),
            "game context ready"
        );
        Ok(GameContext {
            config,
            world,
            scheduler,
            spells,
            market,
            combat,
            factory,
            rng,
        })
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// What happened during one [`GameContext::end_turn`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    /// The turn number after settlement.
    pub turn: u64,
    /// One line per settled task.
    pub task_log: Vec<String>,
    /// The spell cast, if any.
    pub spell_log: Vec<String>,
    /// One line per purchase.
    pub market_log: Vec<String>,
    /// Battle outcome or failure.
    pub combat_log: Vec<String>,
    /// Full task results in settlement order.
    pub task_results: Vec<TaskResult>,
    /// The battle report, if a battle was fought.
    pub battle: Option<BattleReport>,
    /// Morale lost at the end of the turn.
    pub morale_decay: MoraleDecay,
}

impl TurnSummary {
    /// Every log line, subsystem by subsystem.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.spell_log
            .iter()
            .chain(&self.task_log)
            .chain(&self.market_log)
            .chain(&self.combat_log)
            .map(String::as_str)
    }
}

/// One game's state and subsystems.
pub struct GameContext {
    /// The validated configuration.
    pub config: GameConfig,
    /// Entities and resources.
    pub world: World,
    /// This turn's tasks.
    pub scheduler: Scheduler,
    /// Spells and this turn's cast.
    pub spells: SpellBook,
    /// Goods and the ward shelf.
    pub market: Market,
    /// This turn's battle plan.
    pub combat: Combat,
    factory: Box<dyn WardFactory>,
    rng: StdRng,
}

impl GameContext {
    /// Start building a context.
    pub const fn builder(config: GameConfig) -> GameContextBuilder {
        GameContextBuilder::new(config)
    }

    /// The current turn number.
    pub const fn current_turn(&self) -> u64 {
        self.world.turn()
    }

    /// Restore the turn counter; negative values floor to zero.
    pub fn set_current_turn(&mut self, turn: i64) {
        let turn = u64::try_from(turn).unwrap_or(0);
        self.world.set_turn(turn);
        info!(turn, "turn counter restored");
    }

    // -- tasks -------------------------------------------------------------

    /// Publish a task.
    pub fn publish_task(
        &mut self,
        kind: &str,
        actor: ActorRef,
        target: Option<TargetRef>,
    ) -> Result<TaskId, TaskError> {
        self.scheduler.publish(&self.world, kind, actor, target)
    }

    /// Cancel a pending task.
    pub fn cancel_task(&mut self, task: TaskId) -> Result<(), TaskError> {
        self.scheduler.cancel(task).map(|_| ())
    }

    /// Move a pending task to a new actor and/or target.
    pub fn reassign_task(
        &mut self,
        task: TaskId,
        actor: Option<ActorRef>,
        target: Option<TargetRef>,
    ) -> Result<(), TaskError> {
        self.scheduler.reassign(&self.world, task, actor, target)
    }

    // -- spells and market -------------------------------------------------

    /// Cast this turn's spell.
    pub fn cast_spell(
        &mut self,
        name: &str,
        multiplier: u32,
        target: Option<TargetRef>,
    ) -> Result<SpellCast, SpellError> {
        self.spells
            .cast(&mut self.world, name, multiplier, target)
            .cloned()
    }

    /// Buy standing goods.
    pub fn purchase(
        &mut self,
        name: &str,
        quantity: u32,
        target: Option<TargetRef>,
    ) -> Result<Purchase, MarketError> {
        self.market.purchase(&mut self.world, name, quantity, target)
    }

    /// Buy a ward off the shelf.
    pub fn purchase_ward(&mut self, listing: ListingId) -> Result<WardId, MarketError> {
        self.market.purchase_ward(&mut self.world, listing)
    }

    /// Restock the ward shelf immediately.
    pub fn refresh_ward_shelf(&mut self) {
        self.market
            .refresh_shelf(self.factory.as_mut(), &mut self.rng);
    }

    // -- combat ------------------------------------------------------------

    /// Select the battle target.
    pub fn select_combat_target(&mut self, location: LocationId) -> Result<(), CombatError> {
        self.combat.select_target(&self.world, location)
    }

    /// Switch raid mode.
    pub fn set_raid_mode(&mut self, raid: bool) -> Result<(), CombatError> {
        self.combat.set_raid_mode(&self.world, raid)
    }

    /// Deploy a champion.
    pub fn deploy_champion(&mut self, champion: ChampionId) -> Result<Deployment, CombatError> {
        self.combat
            .add_deployed_champion(&self.world, &mut self.scheduler, champion)
            .cloned()
    }

    /// Withdraw a deployed champion.
    pub fn withdraw_champion(&mut self, champion: ChampionId) -> Result<Deployment, CombatError> {
        self.combat
            .remove_deployed_champion(&mut self.scheduler, champion)
    }

    /// Preview the battle plan.
    pub fn preview_combat(&mut self) -> CombatPreview {
        self.combat.preview(&self.world)
    }

    /// Confirm the battle plan.
    pub fn confirm_combat(&mut self) -> Result<(), CombatError> {
        self.combat.confirm(&self.world)
    }

    // -- settlement --------------------------------------------------------

    /// Settle the turn and advance the counter.
    ///
    /// Fails only when the counter cannot advance, in which case nothing
    /// is settled.
    pub fn end_turn(&mut self) -> Result<TurnSummary, TurnError> {
        let settling = self.world.turn();
        let next = settling
            .checked_add(1)
            .ok_or(TurnError::TurnOverflow { turn: settling })?;

        let spell_log: Vec<String> = self
            .spells
            .cast_record()
            .map(SpellCast::log_line)
            .into_iter()
            .collect();

        let task_results = self.scheduler.settle_all(&mut self.world, &mut self.rng);
        let task_log = task_results
            .iter()
            .map(|r| match &r.outcome {
                TaskOutcome::Completed { message: Some(message) } => {
                    format!("{}: {message}", r.kind)
                }
                TaskOutcome::Completed { message: None } => {
                    format!("{}: done", r.kind)
                }
                TaskOutcome::Failed { reason } => {
                    format!("{} failed: {reason}", r.kind)
                }
            })
            .collect();

        let market_log = self.market.log_lines();

        let mut combat_log = Vec::new();
        let battle = if self.combat.is_confirmed() {
            match self
                .combat
                .execute(&mut self.world, &mut self.scheduler, &mut self.rng)
            {
                Ok(report) => {
                    combat_log.push(report.summary());
                    Some(report)
                }
                Err(e) => {
                    warn!(error = %e, "confirmed battle could not be fought");
                    combat_log.push(format!("battle cancelled: {e}"));
                    None
                }
            }
        } else {
            None
        };

        let morale_decay = self.world.ledger.apply_morale_decay(settling);

        self.world.set_turn(next);
        self.spells.reset_turn();
        self.market.reset_turn(self.factory.as_mut(), &mut self.rng);
        self.combat.reset_turn(&mut self.scheduler);

        info!(
            turn = next,
            tasks = task_results.len(),
            purchases = market_log.len(),
            battle = battle.is_some(),
            morale = morale_decay.after,
            "turn ended"
        );
        Ok(TurnSummary {
            turn: next,
            task_log,
            spell_log,
            market_log,
            combat_log,
            task_results,
            battle,
            morale_decay,
        })
    }
}

impl fmt::Debug for GameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameContext")
            .field("turn", &self.world.turn())
            .field("world", &self.world)
            .field("scheduler", &self.scheduler)
            .field("spells", &self.spells)
            .field("market", &self.market)
            .field("combat", &self.combat)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::factory::StubWardFactory;

    fn context() -> GameContext {
        GameContext::builder(GameConfig::default())
            .rules(Rules::default())
            .factory(StubWardFactory::new())
            .build()
            .unwrap()
    }

    #[test]
    fn build_without_collaborators_is_a_wiring_error() {
        let err = GameContext::builder(GameConfig::default())
            .rules(Rules::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, WiringError::MissingDependency("ward factory")));

        let err = GameContext::builder(GameConfig::default())
            .factory(StubWardFactory::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, WiringError::MissingDependency("rules")));
    }

    #[test]
    fn duplicate_rules_fail_the_build() {
        let rules = Rules {
            spells: vec![
                Spell::new("ward", 1, 1, |_, _| String::new()),
                Spell::new("ward", 2, 1, |_, _| String::new()),
            ],
            ..Rules::default()
        };
        let err = GameContext::builder(GameConfig::default())
            .rules(rules)
            .factory(StubWardFactory::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, WiringError::Spell { .. }));
    }

    #[test]
    fn build_stocks_the_shelf() {
        let ctx = context();
        assert!(ctx.market.ward_shelf().count() >= 1);
        assert_eq!(ctx.current_turn(), 0);
    }

    #[test]
    fn end_turn_advances_exactly_once() {
        let mut ctx = context();
        let summary = ctx.end_turn().unwrap();
        assert_eq!(summary.turn, 1);
        assert_eq!(ctx.current_turn(), 1);
        assert!(summary.task_results.is_empty());
        assert!(summary.battle.is_none());
    }

    #[test]
    fn set_current_turn_floors_at_zero() {
        let mut ctx = context();
        ctx.set_current_turn(-4);
        assert_eq!(ctx.current_turn(), 0);
        ctx.set_current_turn(12);
        assert_eq!(ctx.current_turn(), 12);
    }

    #[test]
    fn overflow_is_reported_without_settling() {
        let mut ctx = context();
        ctx.world.set_turn(u64::MAX);
        let err = ctx.end_turn().unwrap_err();
        assert_eq!(err, TurnError::TurnOverflow { turn: u64::MAX });
        assert_eq!(ctx.current_turn(), u64::MAX);
    }

    #[test]
    fn morale_decays_each_turn() {
        let mut ctx = context();
        let summary = ctx.end_turn().unwrap();
        // 50 / 8 = 6
        assert_eq!(summary.morale_decay.lost, 6);
        assert_eq!(ctx.world.ledger.morale(), 44);
    }
}
