//! A scripted player that plans each turn through the public game API.
//!
//! The script is deliberately simple: keep morale up, raid when the odds
//! look good, scout or muster with everyone else, and buy a ward when the
//! treasury allows. Rejected actions are logged and skipped.

use std::fmt::Display;

use tracing::{debug, info};

use warband_core::GameContext;
use warband_entities::{Champion, Location, Ward};
use warband_types::{ActorRef, ChampionId, FailureKind, LocationId, TargetRef};

/// Morale below which the player casts a rally.
const RALLY_THRESHOLD: u32 = 45;
/// Morale below which the player buys provisions.
const PROVISION_THRESHOLD: u32 = 60;
/// Odds the player needs before committing to a battle.
const ATTACK_THRESHOLD: f64 = 0.6;
/// Currency kept back after buying a ward.
const WARD_RESERVE: u64 = 100;

/// Plan one turn.
pub fn plan_turn(ctx: &mut GameContext) {
    keep_morale(ctx);
    plan_battle(ctx);
    assign_tasks(ctx);
    shop(ctx);
}

fn report<T, E: Display>(action: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(action, reason = %e, "action rejected");
            None
        }
    }
}

fn keep_morale(ctx: &mut GameContext) {
    if ctx.world.ledger.morale() < RALLY_THRESHOLD {
        report("rally", ctx.cast_spell("rally", 2, None));
    } else if ctx.spells.can_cast(&ctx.world, "temper steel", 1) {
        report("temper steel", ctx.cast_spell("temper steel", 1, None));
    }
}

/// Deploy every champion against the first scouted location with good
/// odds; withdraw again if the preview disappoints.
fn plan_battle(ctx: &mut GameContext) {
    let scouted: Vec<LocationId> = ctx
        .world
        .registry
        .locations()
        .filter(|l| l.estimated_power().is_some())
        .map(Location::id)
        .collect();
    let champions: Vec<ChampionId> = ctx.world.registry.champions().map(Champion::id).collect();

    for location in scouted {
        if report("select target", ctx.select_combat_target(location)).is_none() {
            continue;
        }
        for champion in &champions {
            report("deploy", ctx.deploy_champion(*champion));
        }
        let preview = ctx.preview_combat();
        let odds = preview.win_probability.unwrap_or(0.0);
        if preview.executable
            && odds >= ATTACK_THRESHOLD
            && report("confirm", ctx.confirm_combat()).is_some()
        {
            info!(location = %location, odds, power = preview.friendly_power, "raid planned");
            return;
        }
        debug!(location = %location, odds, "odds too long, standing down");
        ctx.combat.reset_turn(&mut ctx.scheduler);
    }
}

fn assign_tasks(ctx: &mut GameContext) {
    let open_location = ctx
        .world
        .registry
        .locations()
        .find(|l| !l.is_fully_scouted() || l.has_undiscovered_wards())
        .map(Location::id);
    let first_ward = ctx.world.registry.wards().next().map(Ward::id);

    for actor in ctx.scheduler.available_actors(&ctx.world) {
        let attempt = match actor {
            ActorRef::Champion(_) => {
                let scout = open_location.map(|l| {
                    ctx.publish_task("scout", actor, Some(TargetRef::Location(l)))
                });
                match scout {
                    Some(Ok(task)) => Ok(task),
                    _ => ctx
                        .publish_task("muster", actor, None)
                        .or_else(|e| match (first_ward, e.kind()) {
                            (Some(ward), FailureKind::PreconditionFailed) => ctx.publish_task(
                                "discipline",
                                actor,
                                Some(TargetRef::Ward(ward)),
                            ),
                            _ => Err(e),
                        }),
                }
            }
            ActorRef::Ward(_) => ctx.publish_task("breed", actor, None),
        };
        report("publish task", attempt);
    }
}

fn shop(ctx: &mut GameContext) {
    if ctx.world.ledger.morale() < PROVISION_THRESHOLD {
        report("provisions", ctx.purchase("provisions", 1, None));
    }
    let budget = ctx.world.ledger.currency().saturating_sub(WARD_RESERVE);
    let listing = ctx
        .market
        .ward_shelf()
        .filter(|l| l.price <= budget)
        .min_by_key(|l| l.price)
        .map(|l| l.id);
    if let Some(listing) = listing {
        report("buy ward", ctx.purchase_ward(listing));
    } else if ctx.world.registry.common_pool().is_empty() {
        report("recruits", ctx.purchase("recruits", 1, None));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use warband_core::{GameConfig, StubWardFactory};

    use super::*;
    use crate::rules::{sample_rules, seed_scenario};

    #[test]
    fn scripted_turns_keep_the_game_consistent() {
        let config = GameConfig::parse(
            r"
lord:
  mana: 80
resources:
  starting_currency: 300
troops:
  starting:
    unarmed: 120
",
        )
        .unwrap();
        let mut ctx = GameContext::builder(config)
            .rules(sample_rules())
            .factory(StubWardFactory::new())
            .build()
            .unwrap();
        seed_scenario(&mut ctx).unwrap();

        for turn in 1..=6 {
            plan_turn(&mut ctx);
            let summary = ctx.end_turn().unwrap();
            assert_eq!(summary.turn, turn);
            assert!(summary.spell_log.len() <= 1);
            assert_eq!(ctx.scheduler.pending_count(), 0);
            assert!(!ctx.combat.is_confirmed());
        }
        assert!(ctx.world.registry.stats().troops > 0);
        assert!(ctx.world.registry.locations().any(|l| l.reconnaissance() > 0));
    }
}
