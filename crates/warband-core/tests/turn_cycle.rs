//! End-to-end turn cycles through [`GameContext`].
//!
//! Each test wires a context from YAML plus a small rules set, plays one or
//! more turns through the public API, and checks the summary and the world.

#![allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    clippy::too_many_lines,
    clippy::missing_panics_doc
)]

use std::cell::RefCell;
use std::rc::Rc;

use warband_core::{
    GameConfig, GameContext, Goods, Rules, Spell, StubWardFactory, TaskError, TaskKind,
    TaskOutcome,
};
use warband_entities::{Champion, ChampionStats, Location, Ward, WardProfile};
use warband_types::{ActorRef, ArmamentTier, FailureKind, TargetRef};

const CONFIG: &str = r"
world:
  name: Test March
  seed: 7
lord:
  name: Vaelith
  mana: 60
  max_mana: 100
resources:
  starting_currency: 500
troops:
  starting:
    unarmed: 40
    light: 10
market:
  ward_shelf_min: 2
  ward_shelf_max: 2
";

fn scout_task() -> TaskKind {
    TaskKind::new("scout", |world, ctx, rng| {
        let Some(TargetRef::Location(id)) = ctx.target else {
            return TaskOutcome::failed("scouting needs a location");
        };
        let Some(location) = world.registry.location_mut(id) else {
            return TaskOutcome::failed("location vanished");
        };
        let progress = location.advance_reconnaissance(100, rng);
        let found = location
            .random_potential_ward(rng)
            .and_then(|ward| location.promote_to_discovered(ward))
            .map(|ward| ward.name().to_owned());
        match found {
            Some(name) => TaskOutcome::completed(format!("scouted to {progress}, found {name}")),
            None => TaskOutcome::completed(format!("scouted to {progress}")),
        }
    })
    .precondition("actor is a champion", |_, req| {
        matches!(req.actor, ActorRef::Champion(_))
    })
    .precondition("target is a location", |_, req| {
        matches!(req.target, Some(TargetRef::Location(_)))
    })
}

fn rules(order: Option<Rc<RefCell<Vec<String>>>>) -> Rules {
    let mut tasks = vec![scout_task()];
    if let Some(sink) = order {
        tasks.push(TaskKind::new("report", move |world, ctx, _| {
            let name = match ctx.actor {
                ActorRef::Champion(id) => world
                    .registry
                    .champion(id)
                    .map(|c| c.name().to_owned())
                    .unwrap_or_default(),
                ActorRef::Ward(id) => world
                    .registry
                    .ward(id)
                    .map(|w| w.name().to_owned())
                    .unwrap_or_default(),
            };
            sink.borrow_mut().push(name);
            TaskOutcome::Completed { message: None }
        }));
    }
    Rules {
        tasks,
        spells: vec![Spell::new("rally", 20, 3, |world, cast| {
            let morale = world.ledger.adjust_morale(
                cast.turn,
                i64::from(cast.multiplier).saturating_mul(10),
                "rally",
            );
            format!("morale rises to {morale}")
        })],
        goods: vec![Goods::new("recruits", 25, 2, |world, qty, _| {
            let pool = world.registry.common_pool_mut();
            pool.add_troops(qty.saturating_mul(5), ArmamentTier::Unarmed);
            format!("{} recruits join the reserve", qty.saturating_mul(5))
        })],
        ward_pricing: Some(Box::new(|_: &Ward| 100_u64)),
    }
}

fn context(order: Option<Rc<RefCell<Vec<String>>>>) -> GameContext {
    GameContext::builder(GameConfig::parse(CONFIG).unwrap())
        .rules(rules(order))
        .factory(StubWardFactory::new())
        .build()
        .unwrap()
}

fn champion(ctx: &mut GameContext, name: &str, troops: u32) -> warband_types::ChampionId {
    let mut champion = Champion::new(
        name,
        "the marches",
        ChampionStats {
            might: 100,
            agility: 0,
            intellect: 0,
        },
    );
    champion.pool_mut().add_troops(troops, ArmamentTier::Unarmed);
    ctx.world.registry.add_champion(champion)
}

#[test]
fn config_seeds_the_world() {
    let ctx = context(None);
    assert_eq!(ctx.world.registry.lord().name(), "Vaelith");
    assert_eq!(ctx.world.registry.lord().mana(), 60);
    assert_eq!(ctx.world.ledger.currency(), 500);
    assert_eq!(ctx.world.registry.common_pool().total_count(), 50);
    assert_eq!(ctx.market.ward_shelf().count(), 2);
}

#[test]
fn full_turn_settles_every_subsystem() {
    let mut ctx = context(None);
    let scout = champion(&mut ctx, "Brakka", 10);
    let raider = champion(&mut ctx, "Sela", 5000);
    let mut village = Location::with_power("Millbrook", "village", 50, 100);
    village.add_potential_ward(Ward::new(WardProfile {
        name: String::from("Ysolde"),
        ..WardProfile::default()
    }));
    let village = ctx.world.registry.add_location(village);

    ctx.publish_task(
        "scout",
        ActorRef::Champion(scout),
        Some(TargetRef::Location(village)),
    )
    .unwrap();
    let cast = ctx.cast_spell("rally", 2, None).unwrap();
    assert_eq!(cast.cost, 40);
    let purchase = ctx.purchase("recruits", 2, None).unwrap();
    assert_eq!(purchase.cost, 50);
    let listing = ctx.market.ward_shelf().next().unwrap().id;
    let bought = ctx.purchase_ward(listing).unwrap();

    // Tasks settle before the battle, so the scouted ward is captured.
    ctx.select_combat_target(village).unwrap();
    ctx.deploy_champion(raider).unwrap();
    assert!(ctx.preview_combat().executable);
    ctx.confirm_combat().unwrap();

    let summary = ctx.end_turn().unwrap();
    assert_eq!(summary.turn, 1);
    assert_eq!(summary.spell_log.len(), 1);
    assert!(summary.spell_log[0].starts_with("cast rally x2 for 40 mana"));
    assert_eq!(summary.task_log.len(), 1);
    assert!(summary.task_log[0].contains("found Ysolde"));
    assert_eq!(summary.market_log.len(), 2);
    assert!(summary.market_log[1].ends_with("from the black market"));
    let battle = summary.battle.as_ref().unwrap();
    assert!(battle.victory);
    assert_eq!(battle.captured.len(), 1);
    assert_eq!(summary.combat_log.len(), 1);

    assert_eq!(ctx.world.ledger.currency(), 500 - 50 - 100);
    assert_eq!(ctx.world.registry.lord().mana(), 20);
    assert_eq!(ctx.world.registry.common_pool().total_count(), 60);
    assert!(ctx.world.registry.ward(bought).is_some());
    assert_eq!(ctx.world.registry.wards().count(), 2);

    // per-turn state is reset
    assert!(ctx.spells.cast_record().is_none());
    assert!(ctx.market.purchase_log().is_empty());
    assert_eq!(ctx.market.remaining_quota("recruits"), Some(2));
    assert_eq!(ctx.market.ward_shelf().count(), 2);
    assert_eq!(ctx.scheduler.pending_count(), 0);
    assert!(ctx.combat.target().is_none());
    assert!(
        ctx.publish_task(
            "scout",
            ActorRef::Champion(raider),
            Some(TargetRef::Location(village))
        )
        .is_ok()
    );

    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"turn\":1"));
}

#[test]
fn tasks_settle_in_publish_order() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut ctx = context(Some(Rc::clone(&order)));
    let names = ["Oren", "Brakka", "Sela", "Ilse"];
    let ids: Vec<_> = names.iter().map(|n| champion(&mut ctx, n, 0)).collect();
    for id in &ids {
        ctx.publish_task("report", ActorRef::Champion(*id), None).unwrap();
    }
    ctx.end_turn().unwrap();
    assert_eq!(*order.borrow(), names);
    assert_eq!(ctx.scheduler.pending_count(), 0);
    assert!(ids
        .iter()
        .all(|id| !ctx.scheduler.is_actor_busy(ActorRef::Champion(*id))));
}

#[test]
fn occupied_actor_is_rejected_as_occupied() {
    let mut ctx = context(Some(Rc::new(RefCell::new(Vec::new()))));
    let brakka = champion(&mut ctx, "Brakka", 0);
    ctx.publish_task("report", ActorRef::Champion(brakka), None)
        .unwrap();
    let err = ctx
        .publish_task("report", ActorRef::Champion(brakka), None)
        .unwrap_err();
    assert!(matches!(err, TaskError::ActorOccupied(_)));
    assert_eq!(err.kind(), FailureKind::Occupied);
    assert_eq!(ctx.scheduler.pending_count(), 1);
}

#[test]
fn spell_is_once_per_turn_until_the_turn_ends() {
    let mut ctx = context(None);
    ctx.cast_spell("rally", 1, None).unwrap();
    let err = ctx.cast_spell("rally", 1, None).unwrap_err();
    assert!(err.to_string().starts_with("a spell was already cast this turn"));
    ctx.end_turn().unwrap();
    assert!(ctx.cast_spell("rally", 1, None).is_ok());
    assert_eq!(ctx.world.registry.lord().mana(), 20);
}

#[test]
fn weekly_cap_resets_with_the_turn() {
    let mut ctx = context(None);
    ctx.purchase("recruits", 2, None).unwrap();
    let err = ctx.purchase("recruits", 1, None).unwrap_err();
    assert_eq!(err.to_string(), "recruits exceeds weekly cap, remaining 0");
    ctx.end_turn().unwrap();
    assert!(ctx.purchase("recruits", 2, None).is_ok());
}

#[test]
fn unscouted_battle_still_previews_and_fights() {
    let mut ctx = context(None);
    let brakka = champion(&mut ctx, "Brakka", 150);
    let keep = ctx
        .world
        .registry
        .add_location(Location::with_power("Keep", "fort", 100, 100));
    ctx.select_combat_target(keep).unwrap();
    ctx.deploy_champion(brakka).unwrap();
    let preview = ctx.preview_combat();
    assert!(preview.executable);
    assert!(preview.win_probability.is_none());
    ctx.confirm_combat().unwrap();

    let summary = ctx.end_turn().unwrap();
    let battle = summary.battle.unwrap();
    // No scouting: correction is ln(e - 1), probability well below the
    // fully scouted 0.896.
    let expected = ((150.0_f64 / 101.0).ln() + 0.5) * (std::f64::consts::E - 1.0).ln();
    assert!((battle.win_probability - expected).abs() < 1e-12);
    if battle.victory {
        assert!(battle.casualty_fraction <= 0.6);
    } else {
        assert!(battle.casualty_fraction <= 0.8);
    }
    let remaining = ctx
        .world
        .registry
        .champion(brakka)
        .unwrap()
        .pool()
        .total_count();
    assert_eq!(remaining, 150 - battle.troops_lost);
}

#[test]
fn unconfirmed_plan_is_dropped_at_turn_end() {
    let mut ctx = context(None);
    let brakka = champion(&mut ctx, "Brakka", 10);
    let keep = ctx
        .world
        .registry
        .add_location(Location::new("Keep", "fort"));
    ctx.select_combat_target(keep).unwrap();
    ctx.deploy_champion(brakka).unwrap();
    let summary = ctx.end_turn().unwrap();
    assert!(summary.battle.is_none());
    assert!(summary.combat_log.is_empty());
    assert_eq!(ctx.combat.roster().count(), 0);
    assert_eq!(
        ctx.world
            .registry
            .champion(brakka)
            .unwrap()
            .pool()
            .total_count(),
        10
    );
}
