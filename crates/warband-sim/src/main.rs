//! Headless runner for the Warband simulation.
//!
//! Wires a [`GameContext`] from `warband-config.yaml`, seeds a small
//! scenario, and lets a scripted player drive a fixed number of turns.
//! Every turn summary is written through `tracing`.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration (defaults when the file is absent)
//! 3. Initialize structured logging at the configured level
//! 4. Build the context with the sample rules and the stub ward factory
//! 5. Seed champions and locations
//! 6. Plan and end each turn, logging the summary

mod player;
mod rules;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use warband_core::{GameConfig, GameContext, StubWardFactory};

/// Play scripted Warband turns and log what happens.
#[derive(Parser, Debug)]
#[command(name = "warband-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file; built-in defaults are used if it does not exist
    #[arg(short, long, default_value = "warband-config.yaml")]
    config: PathBuf,

    /// Number of turns to play
    #[arg(short, long, default_value = "5")]
    turns: u32,

    /// Override the configured RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.world.seed = seed;
    }

    init_logging(&config.logging.level, args.json);
    info!(
        world = %config.world.name,
        seed = config.world.seed,
        action_points = config.turn.action_points_per_turn,
        "configuration loaded"
    );

    let mut ctx = GameContext::builder(config)
        .rules(rules::sample_rules())
        .factory(StubWardFactory::new())
        .build()
        .context("failed to wire the game context")?;
    rules::seed_scenario(&mut ctx).context("failed to seed the scenario")?;
    info!(
        stats = %serde_json::to_string(&ctx.world.registry.stats())?,
        "scenario seeded"
    );

    for _ in 0..args.turns {
        player::plan_turn(&mut ctx);
        let summary = match ctx.end_turn() {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "turn could not end");
                break;
            }
        };
        for line in summary.lines() {
            info!(turn = summary.turn, "{line}");
        }
        if let Some(battle) = &summary.battle {
            info!(
                turn = summary.turn,
                victory = battle.victory,
                odds = battle.win_probability,
                roll = battle.roll,
                "battle settled"
            );
        }
        let resources = ctx.world.ledger.snapshot();
        info!(
            turn = summary.turn,
            currency = resources.currency,
            morale = resources.morale,
            mana = ctx.world.registry.lord().mana(),
            "turn ended"
        );
    }

    info!(
        stats = %serde_json::to_string(&ctx.world.registry.stats())?,
        turns = ctx.current_turn(),
        "simulation finished"
    );
    Ok(())
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration from `path`, falling back to defaults when the file is
/// missing. Logging is not up yet, so the fallback is reported later.
fn load_config(path: &Path) -> anyhow::Result<GameConfig> {
    if path.exists() {
        GameConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))
    } else {
        Ok(GameConfig::default())
    }
}
