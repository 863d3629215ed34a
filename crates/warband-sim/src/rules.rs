//! Sample rules data and the starting scenario for headless runs.
//!
//! Balance numbers live here, not in the core: the core only orchestrates
//! whatever task kinds, spells, and goods it is handed.

use warband_core::{GameContext, Goods, Rules, Spell, TaskKind, TaskOutcome};
use warband_entities::{
    AllocationError, Attributed, Champion, ChampionStats, Location, Sire, Ward, WardAttr,
    WardProfile,
};
use warband_types::{ActorRef, ArmamentTier, TargetRef};

/// Reconnaissance gained per scouting task before the intellect bonus.
const SCOUT_BASE: i64 = 20;

/// Troops born from one troop-sired pairing.
const TROOP_LITTER: u32 = 5;

/// Every rule the sample game uses.
pub fn sample_rules() -> Rules {
    Rules {
        tasks: vec![scout(), muster(), breed(), discipline()],
        spells: spells(),
        goods: goods(),
        ward_pricing: None,
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn is_champion(req: &warband_core::TaskRequest) -> bool {
    matches!(req.actor, ActorRef::Champion(_))
}

fn scout() -> TaskKind {
    TaskKind::new("scout", |world, ctx, rng| {
        let (ActorRef::Champion(champion), Some(TargetRef::Location(location))) =
            (ctx.actor, ctx.target)
        else {
            return TaskOutcome::failed("scouting needs a champion and a location");
        };
        let intellect = world
            .registry
            .champion(champion)
            .map_or(0, Champion::intellect);
        let Some(site) = world.registry.location_mut(location) else {
            return TaskOutcome::failed("location vanished");
        };
        let delta = SCOUT_BASE.saturating_add(intellect.saturating_div(2));
        let progress = site.advance_reconnaissance(delta, rng);
        let found = site
            .random_potential_ward(rng)
            .and_then(|ward| site.promote_to_discovered(ward))
            .map(|ward| ward.name().to_owned());
        let max = site.reconnaissance_max();
        let name = site.name().to_owned();
        TaskOutcome::completed(match found {
            Some(ward) => format!("scouted {name} ({progress}/{max}) and spotted {ward}"),
            None => format!("scouted {name} ({progress}/{max})"),
        })
    })
    .precondition("actor is a champion", |_, req| is_champion(req))
    .precondition("target is a location", |_, req| {
        matches!(req.target, Some(TargetRef::Location(_)))
    })
    .precondition("location still hides something", |world, req| match req.target {
        Some(TargetRef::Location(id)) => world
            .registry
            .location(id)
            .is_some_and(|l| !l.is_fully_scouted() || l.has_undiscovered_wards()),
        _ => false,
    })
}

fn muster() -> TaskKind {
    TaskKind::new("muster", |world, ctx, _| {
        let ActorRef::Champion(champion) = ctx.actor else {
            return TaskOutcome::failed("only champions muster troops");
        };
        match world.registry.fill_to_capacity(champion) {
            Ok(report) => TaskOutcome::completed(format!("mustered {} troops", report.total)),
            Err(AllocationError::NothingAvailable) => {
                TaskOutcome::completed("found nobody to muster")
            }
            Err(e) => TaskOutcome::failed(e.to_string()),
        }
    })
    .precondition("actor is a champion", |_, req| is_champion(req))
    .precondition("champion has room", |world, req| match req.actor {
        ActorRef::Champion(id) => world
            .registry
            .champion(id)
            .is_some_and(|c| c.free_capacity() > 0),
        ActorRef::Ward(_) => false,
    })
    .precondition("reserve has troops", |world, _| {
        !world.registry.common_pool().is_empty()
    })
}

fn breed() -> TaskKind {
    TaskKind::new("breed", |world, ctx, _| {
        let ActorRef::Ward(id) = ctx.actor else {
            return TaskOutcome::failed("only wards breed");
        };
        let Some(ward) = world.registry.ward_mut(id) else {
            return TaskOutcome::failed("ward vanished");
        };
        if let Err(e) = ward.consume_breeding(Sire::Troops) {
            return TaskOutcome::failed(e.to_string());
        }
        ward.record_troop_offspring(i64::from(TROOP_LITTER));
        let name = ward.name().to_owned();
        world
            .registry
            .common_pool_mut()
            .add_troops(TROOP_LITTER, ArmamentTier::Unarmed);
        TaskOutcome::completed(format!("{name} bore {TROOP_LITTER} recruits"))
    })
    .precondition("actor is a ward", |_, req| {
        matches!(req.actor, ActorRef::Ward(_))
    })
    .precondition("ward has breeding value left", |world, req| match req.actor {
        ActorRef::Ward(id) => world
            .registry
            .ward(id)
            .is_some_and(|w| w.remaining_breeding() >= Sire::Troops.breeding_cost()),
        ActorRef::Champion(_) => false,
    })
    .fixed_cost(2)
}

fn discipline() -> TaskKind {
    TaskKind::new("discipline", |world, ctx, _| {
        let Some(TargetRef::Ward(id)) = ctx.target else {
            return TaskOutcome::failed("discipline needs a ward");
        };
        let Some(ward) = world.registry.ward_mut(id) else {
            return TaskOutcome::failed("ward vanished");
        };
        let submission = ward.adjust_attribute(WardAttr::Submission, 10);
        ward.adjust_attribute(WardAttr::Depravity, 5);
        let name = ward.name().to_owned();
        world.ledger.adjust_morale(ctx.turn, 2, "discipline");
        TaskOutcome::completed(format!("{name} submission now {submission}"))
    })
    .precondition("actor is a champion", |_, req| is_champion(req))
    .precondition("target is a roster ward", |world, req| match req.target {
        Some(TargetRef::Ward(id)) => world.registry.ward(id).is_some(),
        _ => false,
    })
}

// ---------------------------------------------------------------------------
// Spells and goods
// ---------------------------------------------------------------------------

fn spells() -> Vec<Spell> {
    vec![
        Spell::new("rally", 15, 3, |world, cast| {
            let boost = i64::from(cast.multiplier).saturating_mul(10);
            let morale = world.ledger.adjust_morale(cast.turn, boost, "rally");
            format!("morale rises to {morale}")
        }),
        Spell::new("temper steel", 25, 2, |world, cast| {
            let count = cast.multiplier.saturating_mul(5);
            match world.registry.upgrade_armament(count, ArmamentTier::Light) {
                Ok(upgrade) => format!("armed {} reserve troops", upgrade.upgraded),
                Err(e) => format!("the forge stays cold: {e}"),
            }
        }),
    ]
}

fn goods() -> Vec<Goods> {
    vec![
        Goods::new("recruits", 30, 3, |world, quantity, _| {
            let count = quantity.saturating_mul(5);
            world
                .registry
                .common_pool_mut()
                .add_troops(count, ArmamentTier::Unarmed);
            format!("hired {count} recruits")
        }),
        Goods::new("provisions", 20, 5, |world, quantity, _| {
            let boost = i64::from(quantity).saturating_mul(4);
            let morale = world.ledger.adjust_morale(world.turn(), boost, "provisions");
            format!("bought {quantity} provisions, morale {morale}")
        }),
    ]
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// Two champions drawn from the reserve and two locations to raid.
pub fn seed_scenario(ctx: &mut GameContext) -> Result<(), AllocationError> {
    let registry = &mut ctx.world.registry;
    for (name, origin, stats) in [
        (
            "Brakka",
            "the northern clans",
            ChampionStats {
                might: 30,
                agility: 12,
                intellect: 8,
            },
        ),
        (
            "Sela",
            "the river towns",
            ChampionStats {
                might: 18,
                agility: 20,
                intellect: 24,
            },
        ),
    ] {
        let id = registry.add_champion(Champion::new(name, origin, stats));
        match registry.fill_to_capacity(id) {
            Ok(_) | Err(AllocationError::NothingAvailable) => {}
            Err(e) => return Err(e),
        }
    }

    let mut village = Location::with_power("Millbrook", "village", 180, 60);
    for name in ["Ysolde", "Marit"] {
        village.add_potential_ward(captive(name, 22));
    }
    registry.add_location(village);

    let mut keep = Location::with_power("Greywatch Keep", "fort", 650, 120);
    for name in ["Anwen", "Liesl", "Corra"] {
        keep.add_potential_ward(captive(name, 35));
    }
    registry.add_location(keep);
    Ok(())
}

fn captive(name: &str, appeal: i64) -> Ward {
    Ward::new(WardProfile {
        name: name.to_owned(),
        appeal,
        ..WardProfile::default()
    })
}
